//! Song queries

use serde::Deserialize;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use suzuani_common::db::Song;
use suzuani_common::{Error, Result};

use super::contains_pattern;

const SONG_COLUMNS: &str = "id, title, artist, cover_url, song_url, music_category_id";

/// Admin listing filters
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SongFilter {
    /// Matches title or artist
    pub q: Option<String>,
    pub music_category_id: Option<i64>,
    pub artist: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewSong {
    pub title: String,
    pub artist: String,
    pub cover_url: String,
    pub song_url: String,
    pub music_category_id: i64,
}

pub async fn find(pool: &SqlitePool, id: i64) -> Result<Option<Song>> {
    let row = sqlx::query_as::<_, Song>(&format!("SELECT {} FROM songs WHERE id = ?", SONG_COLUMNS))
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

pub async fn list_all(pool: &SqlitePool) -> Result<Vec<Song>> {
    let rows = sqlx::query_as::<_, Song>(&format!("SELECT {} FROM songs ORDER BY id", SONG_COLUMNS))
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

pub async fn list_by_category(pool: &SqlitePool, music_category_id: i64, limit: i64) -> Result<Vec<Song>> {
    let rows = sqlx::query_as::<_, Song>(&format!(
        "SELECT {} FROM songs WHERE music_category_id = ? ORDER BY id LIMIT ?",
        SONG_COLUMNS
    ))
    .bind(music_category_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Case-insensitive substring match on title or artist
pub async fn search(pool: &SqlitePool, query: &str) -> Result<Vec<Song>> {
    let pattern = contains_pattern(query);
    let rows = sqlx::query_as::<_, Song>(&format!(
        "SELECT {} FROM songs WHERE title LIKE ? ESCAPE '\\' OR artist LIKE ? ESCAPE '\\' ORDER BY title, id",
        SONG_COLUMNS
    ))
    .bind(&pattern)
    .bind(&pattern)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

fn push_filters(qb: &mut QueryBuilder<'_, Sqlite>, filter: &SongFilter) {
    qb.push(" WHERE 1 = 1");
    if let Some(q) = filter.q.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
        let pattern = contains_pattern(q);
        qb.push(" AND (title LIKE ")
            .push_bind(pattern.clone())
            .push(" ESCAPE '\\' OR artist LIKE ")
            .push_bind(pattern)
            .push(" ESCAPE '\\')");
    }
    if let Some(category_id) = filter.music_category_id {
        qb.push(" AND music_category_id = ").push_bind(category_id);
    }
    if let Some(artist) = filter.artist.as_deref().map(str::trim).filter(|a| !a.is_empty()) {
        qb.push(" AND artist = ").push_bind(artist.to_string()).push(" COLLATE NOCASE");
    }
}

pub async fn count(pool: &SqlitePool, filter: &SongFilter) -> Result<i64> {
    let mut qb = QueryBuilder::new("SELECT COUNT(*) FROM songs");
    push_filters(&mut qb, filter);
    let count = qb.build_query_scalar::<i64>().fetch_one(pool).await?;
    Ok(count)
}

pub async fn list(pool: &SqlitePool, filter: &SongFilter, offset: i64, limit: i64) -> Result<Vec<Song>> {
    let mut qb = QueryBuilder::new(format!("SELECT {} FROM songs", SONG_COLUMNS));
    push_filters(&mut qb, filter);
    qb.push(" ORDER BY id LIMIT ")
        .push_bind(limit)
        .push(" OFFSET ")
        .push_bind(offset);
    let rows = qb.build_query_as::<Song>().fetch_all(pool).await?;
    Ok(rows)
}

pub async fn create(pool: &SqlitePool, song: &NewSong) -> Result<i64> {
    let result = sqlx::query(
        "INSERT INTO songs (title, artist, cover_url, song_url, music_category_id) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(&song.title)
    .bind(&song.artist)
    .bind(&song.cover_url)
    .bind(&song.song_url)
    .bind(song.music_category_id)
    .execute(pool)
    .await
    .map_err(|e| Error::from_constraint(e, "Unknown music category"))?;
    Ok(result.last_insert_rowid())
}

pub async fn delete(pool: &SqlitePool, id: i64) -> Result<bool> {
    let result = sqlx::query("DELETE FROM songs WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use suzuani_common::db::connect_in_memory;

    fn song(title: &str, artist: &str, category: i64) -> NewSong {
        NewSong {
            title: title.to_string(),
            artist: artist.to_string(),
            cover_url: "uploads/covers/a.jpg".to_string(),
            song_url: "uploads/songs/a.mp3".to_string(),
            music_category_id: category,
        }
    }

    #[tokio::test]
    async fn test_search_and_filters() {
        let pool = connect_in_memory().await.unwrap();
        let ost = sqlx::query("INSERT INTO music_categories (name) VALUES ('OST')")
            .execute(&pool)
            .await
            .unwrap()
            .last_insert_rowid();

        create(&pool, &song("Unravel", "TK", ost)).await.unwrap();
        create(&pool, &song("Silhouette", "KANA-BOON", ost)).await.unwrap();
        create(&pool, &song("Blue Bird", "Ikimonogakari", ost)).await.unwrap();

        assert_eq!(search(&pool, "boon").await.unwrap().len(), 1);
        assert_eq!(search(&pool, "bird").await.unwrap().len(), 1);

        let filter = SongFilter {
            artist: Some("tk".to_string()),
            ..SongFilter::default()
        };
        assert_eq!(count(&pool, &filter).await.unwrap(), 1);

        let filter = SongFilter {
            q: Some("u".to_string()),
            music_category_id: Some(ost),
            ..SongFilter::default()
        };
        let rows = list(&pool, &filter, 0, 10).await.unwrap();
        // Unravel, Silhouette, Blue Bird all contain 'u' in title or artist
        assert_eq!(rows.len(), 3);

        assert_eq!(list_by_category(&pool, ost, 2).await.unwrap().len(), 2);
    }
}

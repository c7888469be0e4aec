//! Anime and manga title queries, plus anime episodes
//!
//! `animes` and `mangas` share one column layout, so the title queries are
//! written once against [`TitleRow`].

use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, QueryBuilder, Sqlite, SqlitePool};
use suzuani_common::db::{Anime, Episode, Manga};
use suzuani_common::{Error, Result};

use super::{contains_pattern, MediaKind};

const TITLE_COLUMNS: &str = "id, title, poster_url, description, rating, release_year, views, category_id";

/// Row type of a title table
pub trait TitleRow: for<'r> FromRow<'r, SqliteRow> + Serialize + Send + Unpin {
    const KIND: MediaKind;

    fn poster_url(&self) -> &str;
}

impl TitleRow for Anime {
    const KIND: MediaKind = MediaKind::Anime;

    fn poster_url(&self) -> &str {
        &self.poster_url
    }
}

impl TitleRow for Manga {
    const KIND: MediaKind = MediaKind::Manga;

    fn poster_url(&self) -> &str {
        &self.poster_url
    }
}

/// Admin listing filters
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TitleFilter {
    pub q: Option<String>,
    pub release_year: Option<i64>,
    pub min_rating: Option<f64>,
    pub category_id: Option<i64>,
}

/// Fields an admin sets on a title
#[derive(Debug, Clone, Deserialize)]
pub struct TitleInput {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub rating: f64,
    pub release_year: i64,
    pub category_id: i64,
}

pub async fn find<T: TitleRow>(pool: &SqlitePool, id: i64) -> Result<Option<T>> {
    let row = sqlx::query_as::<_, T>(&format!(
        "SELECT {} FROM {} WHERE id = ?",
        TITLE_COLUMNS,
        T::KIND.table()
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

pub async fn exists(pool: &SqlitePool, kind: MediaKind, id: i64) -> Result<bool> {
    let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {} WHERE id = ?", kind.table()))
        .bind(id)
        .fetch_one(pool)
        .await?;
    Ok(count > 0)
}

/// Up to `limit` titles of a category, in insertion order
pub async fn list_by_category<T: TitleRow>(pool: &SqlitePool, category_id: i64, limit: i64) -> Result<Vec<T>> {
    let rows = sqlx::query_as::<_, T>(&format!(
        "SELECT {} FROM {} WHERE category_id = ? ORDER BY id LIMIT ?",
        TITLE_COLUMNS,
        T::KIND.table()
    ))
    .bind(category_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Case-insensitive substring match on the title
pub async fn search<T: TitleRow>(pool: &SqlitePool, query: &str) -> Result<Vec<T>> {
    let rows = sqlx::query_as::<_, T>(&format!(
        "SELECT {} FROM {} WHERE title LIKE ? ESCAPE '\\' ORDER BY title, id",
        TITLE_COLUMNS,
        T::KIND.table()
    ))
    .bind(contains_pattern(query))
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

pub async fn increment_views(pool: &SqlitePool, kind: MediaKind, id: i64) -> Result<()> {
    sqlx::query(&format!("UPDATE {} SET views = views + 1 WHERE id = ?", kind.table()))
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

fn push_filters(qb: &mut QueryBuilder<'_, Sqlite>, filter: &TitleFilter) {
    qb.push(" WHERE 1 = 1");
    if let Some(q) = filter.q.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
        qb.push(" AND title LIKE ")
            .push_bind(contains_pattern(q))
            .push(" ESCAPE '\\'");
    }
    if let Some(year) = filter.release_year {
        qb.push(" AND release_year = ").push_bind(year);
    }
    if let Some(rating) = filter.min_rating {
        qb.push(" AND rating >= ").push_bind(rating);
    }
    if let Some(category_id) = filter.category_id {
        qb.push(" AND category_id = ").push_bind(category_id);
    }
}

pub async fn count<T: TitleRow>(pool: &SqlitePool, filter: &TitleFilter) -> Result<i64> {
    let mut qb = QueryBuilder::new(format!("SELECT COUNT(*) FROM {}", T::KIND.table()));
    push_filters(&mut qb, filter);
    let count = qb.build_query_scalar::<i64>().fetch_one(pool).await?;
    Ok(count)
}

pub async fn list<T: TitleRow>(pool: &SqlitePool, filter: &TitleFilter, offset: i64, limit: i64) -> Result<Vec<T>> {
    let mut qb = QueryBuilder::new(format!("SELECT {} FROM {}", TITLE_COLUMNS, T::KIND.table()));
    push_filters(&mut qb, filter);
    qb.push(" ORDER BY id LIMIT ")
        .push_bind(limit)
        .push(" OFFSET ")
        .push_bind(offset);
    let rows = qb.build_query_as::<T>().fetch_all(pool).await?;
    Ok(rows)
}

pub async fn create<T: TitleRow>(pool: &SqlitePool, input: &TitleInput, poster_url: Option<&str>) -> Result<i64> {
    let result = sqlx::query(&format!(
        r#"
        INSERT INTO {} (title, description, rating, release_year, category_id, poster_url)
        VALUES (?, ?, ?, ?, ?, COALESCE(?, 'default_poster.jpg'))
        "#,
        T::KIND.table()
    ))
    .bind(&input.title)
    .bind(&input.description)
    .bind(input.rating)
    .bind(input.release_year)
    .bind(input.category_id)
    .bind(poster_url)
    .execute(pool)
    .await
    .map_err(|e| Error::from_constraint(e, "Unknown category"))?;
    Ok(result.last_insert_rowid())
}

pub async fn update<T: TitleRow>(pool: &SqlitePool, id: i64, input: &TitleInput) -> Result<bool> {
    let result = sqlx::query(&format!(
        "UPDATE {} SET title = ?, description = ?, rating = ?, release_year = ?, category_id = ? WHERE id = ?",
        T::KIND.table()
    ))
    .bind(&input.title)
    .bind(&input.description)
    .bind(input.rating)
    .bind(input.release_year)
    .bind(input.category_id)
    .bind(id)
    .execute(pool)
    .await
    .map_err(|e| Error::from_constraint(e, "Unknown category"))?;
    Ok(result.rows_affected() > 0)
}

pub async fn set_poster(pool: &SqlitePool, kind: MediaKind, id: i64, poster_url: &str) -> Result<bool> {
    let result = sqlx::query(&format!("UPDATE {} SET poster_url = ? WHERE id = ?", kind.table()))
        .bind(poster_url)
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Files owned by a title: its poster plus episode thumbnails (anime) or
/// chapter page images (manga)
pub async fn stored_files(pool: &SqlitePool, kind: MediaKind, id: i64) -> Result<Vec<String>> {
    let sql = match kind {
        MediaKind::Anime => {
            r#"
            SELECT poster_url FROM animes WHERE id = ?1
            UNION ALL
            SELECT thumbnail_url FROM episodes WHERE anime_id = ?1
            "#
        }
        MediaKind::Manga => {
            r#"
            SELECT poster_url FROM mangas WHERE id = ?1
            UNION ALL
            SELECT p.image_url FROM manga_pages p
            JOIN manga_chapters c ON c.id = p.chapter_id
            WHERE c.manga_id = ?1
            "#
        }
    };
    let rows = sqlx::query_scalar(sql).bind(id).fetch_all(pool).await?;
    Ok(rows)
}

/// Delete a title; the schema cascades to episodes/chapters, comments and likes
pub async fn delete(pool: &SqlitePool, kind: MediaKind, id: i64) -> Result<bool> {
    let result = sqlx::query(&format!("DELETE FROM {} WHERE id = ?", kind.table()))
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

// ============================================================================
// Episodes
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct EpisodeInput {
    pub title: String,
    pub watch_link: String,
    pub anime_id: i64,
}

pub async fn find_episode(pool: &SqlitePool, id: i64) -> Result<Option<Episode>> {
    let row = sqlx::query_as::<_, Episode>(
        "SELECT id, title, thumbnail_url, watch_link, anime_id FROM episodes WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

pub async fn episodes_for_anime(pool: &SqlitePool, anime_id: i64) -> Result<Vec<Episode>> {
    let rows = sqlx::query_as::<_, Episode>(
        "SELECT id, title, thumbnail_url, watch_link, anime_id FROM episodes WHERE anime_id = ? ORDER BY id",
    )
    .bind(anime_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

pub async fn count_episodes(pool: &SqlitePool, anime_id: Option<i64>) -> Result<i64> {
    let count = sqlx::query_scalar("SELECT COUNT(*) FROM episodes WHERE ? IS NULL OR anime_id = ?")
        .bind(anime_id)
        .bind(anime_id)
        .fetch_one(pool)
        .await?;
    Ok(count)
}

pub async fn list_episodes(pool: &SqlitePool, anime_id: Option<i64>, offset: i64, limit: i64) -> Result<Vec<Episode>> {
    let rows = sqlx::query_as::<_, Episode>(
        r#"
        SELECT id, title, thumbnail_url, watch_link, anime_id FROM episodes
        WHERE ? IS NULL OR anime_id = ?
        ORDER BY anime_id, id
        LIMIT ? OFFSET ?
        "#,
    )
    .bind(anime_id)
    .bind(anime_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

pub async fn create_episode(pool: &SqlitePool, input: &EpisodeInput, thumbnail_url: Option<&str>) -> Result<i64> {
    let result = sqlx::query(
        r#"
        INSERT INTO episodes (title, watch_link, anime_id, thumbnail_url)
        VALUES (?, ?, ?, COALESCE(?, 'default_thumb.jpg'))
        "#,
    )
    .bind(&input.title)
    .bind(&input.watch_link)
    .bind(input.anime_id)
    .bind(thumbnail_url)
    .execute(pool)
    .await
    .map_err(|e| Error::from_constraint(e, "Unknown anime"))?;
    Ok(result.last_insert_rowid())
}

pub async fn update_episode(pool: &SqlitePool, id: i64, input: &EpisodeInput) -> Result<bool> {
    let result = sqlx::query("UPDATE episodes SET title = ?, watch_link = ?, anime_id = ? WHERE id = ?")
        .bind(&input.title)
        .bind(&input.watch_link)
        .bind(input.anime_id)
        .bind(id)
        .execute(pool)
        .await
        .map_err(|e| Error::from_constraint(e, "Unknown anime"))?;
    Ok(result.rows_affected() > 0)
}

pub async fn set_episode_thumbnail(pool: &SqlitePool, id: i64, thumbnail_url: &str) -> Result<bool> {
    let result = sqlx::query("UPDATE episodes SET thumbnail_url = ? WHERE id = ?")
        .bind(thumbnail_url)
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn delete_episode(pool: &SqlitePool, id: i64) -> Result<bool> {
    let result = sqlx::query("DELETE FROM episodes WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

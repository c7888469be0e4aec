//! Like toggles and liked-title history

use sqlx::SqlitePool;
use suzuani_common::db::{Anime, Manga};
use suzuani_common::Result;

use super::MediaKind;

/// Flip the like state of `(user, title)`; returns `true` when now liked
pub async fn toggle(pool: &SqlitePool, kind: MediaKind, user_id: i64, title_id: i64) -> Result<bool> {
    let mut tx = pool.begin().await?;

    let removed = sqlx::query(&format!(
        "DELETE FROM {} WHERE user_id = ? AND {} = ?",
        kind.likes_table(),
        kind.id_column()
    ))
    .bind(user_id)
    .bind(title_id)
    .execute(&mut *tx)
    .await?
    .rows_affected();

    if removed == 0 {
        sqlx::query(&format!(
            "INSERT INTO {} (user_id, {}) VALUES (?, ?)",
            kind.likes_table(),
            kind.id_column()
        ))
        .bind(user_id)
        .bind(title_id)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    Ok(removed == 0)
}

pub async fn count(pool: &SqlitePool, kind: MediaKind, title_id: i64) -> Result<i64> {
    let count = sqlx::query_scalar(&format!(
        "SELECT COUNT(*) FROM {} WHERE {} = ?",
        kind.likes_table(),
        kind.id_column()
    ))
    .bind(title_id)
    .fetch_one(pool)
    .await?;
    Ok(count)
}

pub async fn is_liked(pool: &SqlitePool, kind: MediaKind, user_id: i64, title_id: i64) -> Result<bool> {
    let count: i64 = sqlx::query_scalar(&format!(
        "SELECT COUNT(*) FROM {} WHERE user_id = ? AND {} = ?",
        kind.likes_table(),
        kind.id_column()
    ))
    .bind(user_id)
    .bind(title_id)
    .fetch_one(pool)
    .await?;
    Ok(count > 0)
}

pub async fn liked_animes(pool: &SqlitePool, user_id: i64) -> Result<Vec<Anime>> {
    let rows = sqlx::query_as::<_, Anime>(
        r#"
        SELECT a.id, a.title, a.poster_url, a.description, a.rating, a.release_year, a.views, a.category_id
        FROM animes a
        JOIN anime_likes l ON l.anime_id = a.id
        WHERE l.user_id = ?
        ORDER BY a.title, a.id
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

pub async fn liked_mangas(pool: &SqlitePool, user_id: i64) -> Result<Vec<Manga>> {
    let rows = sqlx::query_as::<_, Manga>(
        r#"
        SELECT m.id, m.title, m.poster_url, m.description, m.rating, m.release_year, m.views, m.category_id
        FROM mangas m
        JOIN manga_likes l ON l.manga_id = m.id
        WHERE l.user_id = ?
        ORDER BY m.title, m.id
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use suzuani_common::auth::hash_password;
    use suzuani_common::db::connect_in_memory;

    #[tokio::test]
    async fn test_toggle_twice_restores_state() {
        let pool = connect_in_memory().await.unwrap();
        let user_id = crate::db::users::create_user(&pool, "suzu", "suzu@example.com", &hash_password("secret1"), "1")
            .await
            .unwrap();
        sqlx::query("INSERT INTO categories (name) VALUES ('Seinen')")
            .execute(&pool)
            .await
            .unwrap();
        let manga_id = sqlx::query(
            "INSERT INTO mangas (title, description, release_year, category_id) VALUES ('Berserk', '', 1989, 1)",
        )
        .execute(&pool)
        .await
        .unwrap()
        .last_insert_rowid();

        assert!(toggle(&pool, MediaKind::Manga, user_id, manga_id).await.unwrap());
        assert!(is_liked(&pool, MediaKind::Manga, user_id, manga_id).await.unwrap());
        assert_eq!(count(&pool, MediaKind::Manga, manga_id).await.unwrap(), 1);
        assert_eq!(liked_mangas(&pool, user_id).await.unwrap().len(), 1);

        assert!(!toggle(&pool, MediaKind::Manga, user_id, manga_id).await.unwrap());
        assert!(!is_liked(&pool, MediaKind::Manga, user_id, manga_id).await.unwrap());
        assert_eq!(count(&pool, MediaKind::Manga, manga_id).await.unwrap(), 0);
        assert!(liked_animes(&pool, user_id).await.unwrap().is_empty());
    }
}

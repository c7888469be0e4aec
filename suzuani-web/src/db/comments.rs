//! Comment queries

use chrono::NaiveDateTime;
use serde::Serialize;
use sqlx::SqlitePool;
use suzuani_common::db::Comment;
use suzuani_common::{Error, Result};

use super::MediaKind;

/// Comment joined with its author, as shown under a title
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct CommentView {
    pub id: i64,
    pub text: String,
    pub created_at: NaiveDateTime,
    pub user_id: i64,
    pub username: String,
    pub profile_image: String,
}

/// Comments on a title, newest first
pub async fn list_for(pool: &SqlitePool, kind: MediaKind, title_id: i64) -> Result<Vec<CommentView>> {
    let rows = sqlx::query_as::<_, CommentView>(&format!(
        r#"
        SELECT c.id, c.text, c.created_at, c.user_id, u.username, u.profile_image
        FROM comments c
        JOIN users u ON u.id = c.user_id
        WHERE c.{} = ?
        ORDER BY c.created_at DESC, c.id DESC
        "#,
        kind.id_column()
    ))
    .bind(title_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

pub async fn has_commented(pool: &SqlitePool, kind: MediaKind, user_id: i64, title_id: i64) -> Result<bool> {
    let count: i64 = sqlx::query_scalar(&format!(
        "SELECT COUNT(*) FROM comments WHERE user_id = ? AND {} = ?",
        kind.id_column()
    ))
    .bind(user_id)
    .bind(title_id)
    .fetch_one(pool)
    .await?;
    Ok(count > 0)
}

/// Insert a comment; a second comment by the same user on the same title
/// fails with `Conflict`
pub async fn create(pool: &SqlitePool, kind: MediaKind, user_id: i64, title_id: i64, text: &str) -> Result<i64> {
    let result = sqlx::query(&format!(
        "INSERT INTO comments (text, user_id, {}) VALUES (?, ?, ?)",
        kind.id_column()
    ))
    .bind(text)
    .bind(user_id)
    .bind(title_id)
    .execute(pool)
    .await
    .map_err(|e| {
        let duplicate = matches!(&e, sqlx::Error::Database(db_err) if db_err.is_unique_violation());
        if duplicate {
            Error::Conflict(format!("User {} already commented on {} {}", user_id, kind.label(), title_id))
        } else {
            Error::Database(e)
        }
    })?;
    Ok(result.last_insert_rowid())
}

pub async fn find(pool: &SqlitePool, id: i64) -> Result<Option<Comment>> {
    let row = sqlx::query_as::<_, Comment>(
        "SELECT id, text, user_id, anime_id, manga_id, created_at FROM comments WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

pub async fn delete(pool: &SqlitePool, id: i64) -> Result<bool> {
    let result = sqlx::query("DELETE FROM comments WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn count(pool: &SqlitePool) -> Result<i64> {
    let count = sqlx::query_scalar("SELECT COUNT(*) FROM comments")
        .fetch_one(pool)
        .await?;
    Ok(count)
}

/// Every comment, newest first (admin listing)
pub async fn list(pool: &SqlitePool, offset: i64, limit: i64) -> Result<Vec<Comment>> {
    let rows = sqlx::query_as::<_, Comment>(
        r#"
        SELECT id, text, user_id, anime_id, manga_id, created_at FROM comments
        ORDER BY created_at DESC, id DESC
        LIMIT ? OFFSET ?
        "#,
    )
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

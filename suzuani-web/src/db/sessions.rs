//! Login session rows
//!
//! The `sessions` table stores only the SHA-256 digest of each token.
//! Timestamps are unix seconds.

use sqlx::SqlitePool;
use suzuani_common::auth::session_token;
use suzuani_common::db::User;
use suzuani_common::Result;
use tracing::debug;

/// Create a session for `user_id`; returns the raw token for the client
pub async fn create_session(
    pool: &SqlitePool,
    user_id: i64,
    remember: bool,
    ttl_secs: i64,
    now: i64,
) -> Result<String> {
    let token = session_token::generate();

    sqlx::query(
        "INSERT INTO sessions (token_hash, user_id, remember, created_at, expires_at) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(session_token::digest(&token))
    .bind(user_id)
    .bind(remember)
    .bind(now)
    .bind(now + ttl_secs)
    .execute(pool)
    .await?;

    Ok(token)
}

/// Resolve a raw token to its user. Expired sessions are deleted on sight.
pub async fn resolve_session(pool: &SqlitePool, token: &str, now: i64) -> Result<Option<User>> {
    let token_hash = session_token::digest(token);

    let row: Option<(i64, i64)> =
        sqlx::query_as("SELECT user_id, expires_at FROM sessions WHERE token_hash = ?")
            .bind(&token_hash)
            .fetch_optional(pool)
            .await?;

    let Some((user_id, expires_at)) = row else {
        return Ok(None);
    };

    if expires_at <= now {
        debug!("Session for user {} expired, removing", user_id);
        sqlx::query("DELETE FROM sessions WHERE token_hash = ?")
            .bind(&token_hash)
            .execute(pool)
            .await?;
        return Ok(None);
    }

    super::users::find_by_id(pool, user_id).await
}

pub async fn delete_session(pool: &SqlitePool, token: &str) -> Result<()> {
    sqlx::query("DELETE FROM sessions WHERE token_hash = ?")
        .bind(session_token::digest(token))
        .execute(pool)
        .await?;
    Ok(())
}

/// Drop every session of a user (after a password reset)
pub async fn delete_user_sessions(pool: &SqlitePool, user_id: i64) -> Result<u64> {
    let result = sqlx::query("DELETE FROM sessions WHERE user_id = ?")
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

pub async fn purge_expired(pool: &SqlitePool, now: i64) -> Result<u64> {
    let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= ?")
        .bind(now)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

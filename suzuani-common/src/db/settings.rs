//! Settings table access

use crate::Result;
use rand::RngCore;
use sqlx::SqlitePool;
use tracing::info;

/// Read a setting as text
pub async fn get_setting(pool: &SqlitePool, key: &str) -> Result<Option<String>> {
    let value: Option<Option<String>> =
        sqlx::query_scalar("SELECT value FROM settings WHERE key = ?")
            .bind(key)
            .fetch_optional(pool)
            .await?;

    Ok(value.flatten())
}

/// Read a setting as i64, falling back to `default` when absent or unparseable
pub async fn get_setting_i64(pool: &SqlitePool, key: &str, default: i64) -> Result<i64> {
    Ok(get_setting(pool, key)
        .await?
        .and_then(|v| v.trim().parse::<i64>().ok())
        .unwrap_or(default))
}

/// Insert or replace a setting
pub async fn set_setting(pool: &SqlitePool, key: &str, value: &str) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO settings (key, value, updated_at) VALUES (?, ?, CURRENT_TIMESTAMP)
        ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = CURRENT_TIMESTAMP
        "#,
    )
    .bind(key)
    .bind(value)
    .execute(pool)
    .await?;

    Ok(())
}

/// Load the token-signing secret, generating and persisting one on first run.
///
/// The secret is 32 random bytes, hex encoded.
pub async fn load_secret_key(pool: &SqlitePool) -> Result<String> {
    if let Some(secret) = get_setting(pool, "secret_key").await? {
        if !secret.is_empty() {
            return Ok(secret);
        }
    }

    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    let secret: String = bytes.iter().map(|b| format!("{:02x}", b)).collect();

    set_setting(pool, "secret_key", &secret).await?;
    info!("Generated new secret key");

    Ok(secret)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::connect_in_memory;

    #[tokio::test]
    async fn test_secret_key_is_generated_once() {
        let pool = connect_in_memory().await.unwrap();

        let first = load_secret_key(&pool).await.unwrap();
        let second = load_secret_key(&pool).await.unwrap();

        assert_eq!(first.len(), 64);
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_get_setting_i64_default_when_unparseable() {
        let pool = connect_in_memory().await.unwrap();
        set_setting(&pool, "broken", "not-a-number").await.unwrap();

        assert_eq!(get_setting_i64(&pool, "broken", 7).await.unwrap(), 7);
        assert_eq!(get_setting_i64(&pool, "missing", 9).await.unwrap(), 9);
        assert_eq!(
            get_setting_i64(&pool, "reset_token_max_age_seconds", 0).await.unwrap(),
            1800
        );
    }
}

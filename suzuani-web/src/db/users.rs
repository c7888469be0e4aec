//! User account queries

use sqlx::SqlitePool;
use suzuani_common::auth::PasswordHash;
use suzuani_common::db::User;
use suzuani_common::{Error, Result};

use super::contains_pattern;

const USER_COLUMNS: &str = "id, username, email, password_hash, password_salt, profile_image, \
                            is_admin, is_verified, otp, created_at";

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> Result<Option<User>> {
    let user = sqlx::query_as::<_, User>(&format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS))
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(user)
}

pub async fn find_by_email(pool: &SqlitePool, email: &str) -> Result<Option<User>> {
    let user = sqlx::query_as::<_, User>(&format!(
        "SELECT {} FROM users WHERE email = ? COLLATE NOCASE",
        USER_COLUMNS
    ))
    .bind(email.trim())
    .fetch_optional(pool)
    .await?;
    Ok(user)
}

/// Whether `username` belongs to an account other than `exclude_id`
pub async fn username_taken(pool: &SqlitePool, username: &str, exclude_id: Option<i64>) -> Result<bool> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE username = ? AND id != ?")
        .bind(username)
        .bind(exclude_id.unwrap_or(-1))
        .fetch_one(pool)
        .await?;
    Ok(count > 0)
}

/// Whether `email` belongs to an account other than `exclude_id`
pub async fn email_taken(pool: &SqlitePool, email: &str, exclude_id: Option<i64>) -> Result<bool> {
    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE email = ? COLLATE NOCASE AND id != ?")
            .bind(email)
            .bind(exclude_id.unwrap_or(-1))
            .fetch_one(pool)
            .await?;
    Ok(count > 0)
}

/// Insert an unverified account carrying `otp`; returns the new id
pub async fn create_user(
    pool: &SqlitePool,
    username: &str,
    email: &str,
    password: &PasswordHash,
    otp: &str,
) -> Result<i64> {
    let result = sqlx::query(
        r#"
        INSERT INTO users (username, email, password_hash, password_salt, is_verified, otp)
        VALUES (?, ?, ?, ?, 0, ?)
        "#,
    )
    .bind(username)
    .bind(email)
    .bind(&password.hash)
    .bind(&password.salt)
    .bind(otp)
    .execute(pool)
    .await
    .map_err(|e| Error::from_constraint(e, "User already exists"))?;

    Ok(result.last_insert_rowid())
}

pub async fn set_otp(pool: &SqlitePool, id: i64, otp: Option<&str>) -> Result<()> {
    sqlx::query("UPDATE users SET otp = ? WHERE id = ?")
        .bind(otp)
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Mark verified and clear the OTP
pub async fn mark_verified(pool: &SqlitePool, id: i64) -> Result<()> {
    sqlx::query("UPDATE users SET is_verified = 1, otp = NULL WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn set_password(pool: &SqlitePool, id: i64, password: &PasswordHash) -> Result<()> {
    sqlx::query("UPDATE users SET password_hash = ?, password_salt = ? WHERE id = ?")
        .bind(&password.hash)
        .bind(&password.salt)
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn update_profile(pool: &SqlitePool, id: i64, username: &str, email: &str) -> Result<()> {
    sqlx::query("UPDATE users SET username = ?, email = ? WHERE id = ?")
        .bind(username)
        .bind(email)
        .bind(id)
        .execute(pool)
        .await
        .map_err(|e| Error::from_constraint(e, "Username or email already in use"))?;
    Ok(())
}

pub async fn set_profile_image(pool: &SqlitePool, id: i64, path: &str) -> Result<()> {
    sqlx::query("UPDATE users SET profile_image = ? WHERE id = ?")
        .bind(path)
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Admin edit of an account
#[derive(Debug, Clone)]
pub struct UserUpdate {
    pub username: String,
    pub email: String,
    pub is_admin: bool,
    pub is_verified: bool,
}

pub async fn update_user(pool: &SqlitePool, id: i64, update: &UserUpdate) -> Result<bool> {
    let result = sqlx::query(
        "UPDATE users SET username = ?, email = ?, is_admin = ?, is_verified = ? WHERE id = ?",
    )
    .bind(&update.username)
    .bind(&update.email)
    .bind(update.is_admin)
    .bind(update.is_verified)
    .bind(id)
    .execute(pool)
    .await
    .map_err(|e| Error::from_constraint(e, "Username or email already in use"))?;

    // Verification by an admin makes a pending OTP pointless
    if update.is_verified {
        sqlx::query("UPDATE users SET otp = NULL WHERE id = ?")
            .bind(id)
            .execute(pool)
            .await?;
    }

    Ok(result.rows_affected() > 0)
}

pub async fn delete_user(pool: &SqlitePool, id: i64) -> Result<bool> {
    let result = sqlx::query("DELETE FROM users WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Count users whose username or e-mail contains `q`
pub async fn count_users(pool: &SqlitePool, q: Option<&str>) -> Result<i64> {
    let count = sqlx::query_scalar(
        "SELECT COUNT(*) FROM users WHERE ? IS NULL OR username LIKE ? ESCAPE '\\' OR email LIKE ? ESCAPE '\\'",
    )
    .bind(q)
    .bind(q.map(contains_pattern))
    .bind(q.map(contains_pattern))
    .fetch_one(pool)
    .await?;
    Ok(count)
}

pub async fn list_users(pool: &SqlitePool, q: Option<&str>, offset: i64, limit: i64) -> Result<Vec<User>> {
    let users = sqlx::query_as::<_, User>(&format!(
        r#"
        SELECT {} FROM users
        WHERE ? IS NULL OR username LIKE ? ESCAPE '\' OR email LIKE ? ESCAPE '\'
        ORDER BY id
        LIMIT ? OFFSET ?
        "#,
        USER_COLUMNS
    ))
    .bind(q)
    .bind(q.map(contains_pattern))
    .bind(q.map(contains_pattern))
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;
    Ok(users)
}

#[cfg(test)]
mod tests {
    use super::*;
    use suzuani_common::auth::{generate_otp, hash_password};
    use suzuani_common::db::connect_in_memory;

    #[tokio::test]
    async fn test_create_verify_and_lookup() {
        let pool = connect_in_memory().await.unwrap();
        let otp = generate_otp();
        let id = create_user(&pool, "suzu", "Suzu@Example.com", &hash_password("secret1"), &otp)
            .await
            .unwrap();

        let user = find_by_email(&pool, "suzu@example.com").await.unwrap().unwrap();
        assert_eq!(user.id, id);
        assert!(!user.is_verified);
        assert_eq!(user.otp.as_deref(), Some(otp.as_str()));

        mark_verified(&pool, id).await.unwrap();
        let user = find_by_id(&pool, id).await.unwrap().unwrap();
        assert!(user.is_verified);
        assert!(user.otp.is_none());
    }

    #[tokio::test]
    async fn test_uniqueness_checks_exclude_self() {
        let pool = connect_in_memory().await.unwrap();
        let id = create_user(&pool, "suzu", "suzu@example.com", &hash_password("secret1"), "123456")
            .await
            .unwrap();

        assert!(username_taken(&pool, "suzu", None).await.unwrap());
        assert!(!username_taken(&pool, "suzu", Some(id)).await.unwrap());
        assert!(email_taken(&pool, "SUZU@example.com", None).await.unwrap());
        assert!(!email_taken(&pool, "other@example.com", None).await.unwrap());

        let dup = create_user(&pool, "suzu", "x@example.com", &hash_password("secret1"), "123456").await;
        assert!(matches!(dup, Err(Error::Conflict(_))));
    }

    #[tokio::test]
    async fn test_list_users_search() {
        let pool = connect_in_memory().await.unwrap();
        for name in ["alpha", "beta", "gamma_1"] {
            create_user(&pool, name, &format!("{}@example.com", name), &hash_password("secret1"), "1")
                .await
                .unwrap();
        }

        assert_eq!(count_users(&pool, None).await.unwrap(), 3);
        assert_eq!(count_users(&pool, Some("_")).await.unwrap(), 1);

        let users = list_users(&pool, Some("ALP"), 0, 10).await.unwrap();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].username, "alpha");
    }
}

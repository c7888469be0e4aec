//! Database initialization
//!
//! Creates the SQLite file on first run, applies connection pragmas, creates
//! every table idempotently and seeds default settings. Safe to run on every
//! startup.

use crate::auth::password::hash_password;
use crate::config::AdminConfig;
use crate::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::{info, warn};

/// Current schema version recorded in `schema_version`
pub const SCHEMA_VERSION: i64 = 1;

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let options = SqliteConnectOptions::from_str(&format!("sqlite://{}", db_path.display()))?
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_millis(5000));

    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .min_connections(1)
        .connect_with(options)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    create_schema(&pool).await?;
    init_default_settings(&pool).await?;

    Ok(pool)
}

/// Single-connection in-memory database with the full schema.
///
/// Every connection to `sqlite::memory:` is a separate database, so the pool
/// is pinned to one connection.
pub async fn connect_in_memory() -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .min_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await?;

    create_schema(&pool).await?;
    init_default_settings(&pool).await?;

    Ok(pool)
}

/// Create all tables (idempotent)
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    create_schema_version_table(pool).await?;
    create_settings_table(pool).await?;
    create_users_table(pool).await?;
    create_sessions_table(pool).await?;

    // Anime / manga catalog
    create_categories_table(pool).await?;
    create_animes_table(pool).await?;
    create_episodes_table(pool).await?;
    create_mangas_table(pool).await?;
    create_manga_chapters_table(pool).await?;
    create_manga_pages_table(pool).await?;
    create_banners_table(pool).await?;
    create_comments_table(pool).await?;

    // Music catalog
    create_music_categories_table(pool).await?;
    create_songs_table(pool).await?;

    // Linking tables
    create_like_tables(pool).await?;

    sqlx::query("INSERT OR IGNORE INTO schema_version (version) VALUES (?)")
        .bind(SCHEMA_VERSION)
        .execute(pool)
        .await?;

    Ok(())
}

async fn create_schema_version_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Create the settings table
///
/// Stores application configuration key-value pairs.
pub async fn create_settings_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS settings (
            key TEXT PRIMARY KEY,
            value TEXT,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_users_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            username TEXT NOT NULL UNIQUE CHECK (length(username) <= 20),
            email TEXT NOT NULL UNIQUE CHECK (length(email) <= 120),
            password_hash TEXT NOT NULL,
            password_salt TEXT NOT NULL,
            profile_image TEXT NOT NULL DEFAULT 'uploads/profiles/default.jpg',
            is_admin INTEGER NOT NULL DEFAULT 0,
            is_verified INTEGER NOT NULL DEFAULT 0,
            otp TEXT,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_sessions_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS sessions (
            token_hash TEXT PRIMARY KEY,
            user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            remember INTEGER NOT NULL DEFAULT 0,
            created_at INTEGER NOT NULL,
            expires_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_sessions_user ON sessions(user_id)")
        .execute(pool)
        .await?;

    Ok(())
}

async fn create_categories_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS categories (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE CHECK (length(name) <= 50)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_animes_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS animes (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            title TEXT NOT NULL,
            poster_url TEXT NOT NULL DEFAULT 'default_poster.jpg',
            description TEXT NOT NULL,
            rating REAL NOT NULL DEFAULT 0.0,
            release_year INTEGER NOT NULL,
            views INTEGER NOT NULL DEFAULT 0,
            category_id INTEGER NOT NULL REFERENCES categories(id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_animes_category ON animes(category_id)")
        .execute(pool)
        .await?;

    Ok(())
}

async fn create_episodes_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS episodes (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            title TEXT NOT NULL,
            thumbnail_url TEXT NOT NULL DEFAULT 'default_thumb.jpg',
            watch_link TEXT NOT NULL,
            anime_id INTEGER NOT NULL REFERENCES animes(id) ON DELETE CASCADE
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_episodes_anime ON episodes(anime_id)")
        .execute(pool)
        .await?;

    Ok(())
}

async fn create_mangas_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS mangas (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            title TEXT NOT NULL,
            poster_url TEXT NOT NULL DEFAULT 'default_poster.jpg',
            description TEXT NOT NULL,
            rating REAL NOT NULL DEFAULT 0.0,
            release_year INTEGER NOT NULL,
            views INTEGER NOT NULL DEFAULT 0,
            category_id INTEGER NOT NULL REFERENCES categories(id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_mangas_category ON mangas(category_id)")
        .execute(pool)
        .await?;

    Ok(())
}

async fn create_manga_chapters_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS manga_chapters (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            title TEXT NOT NULL,
            manga_id INTEGER NOT NULL REFERENCES mangas(id) ON DELETE CASCADE
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_chapters_manga ON manga_chapters(manga_id)")
        .execute(pool)
        .await?;

    Ok(())
}

async fn create_manga_pages_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS manga_pages (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            page_number INTEGER NOT NULL,
            image_url TEXT NOT NULL,
            chapter_id INTEGER NOT NULL REFERENCES manga_chapters(id) ON DELETE CASCADE
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_pages_chapter ON manga_pages(chapter_id, page_number)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_banners_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS banners (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            image_url TEXT NOT NULL,
            banner_type TEXT NOT NULL CHECK (banner_type IN ('anime', 'manga', 'music')),
            anime_id INTEGER REFERENCES animes(id) ON DELETE SET NULL,
            manga_id INTEGER REFERENCES mangas(id) ON DELETE SET NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_comments_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS comments (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            text TEXT NOT NULL,
            user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            anime_id INTEGER REFERENCES animes(id) ON DELETE CASCADE,
            manga_id INTEGER REFERENCES mangas(id) ON DELETE CASCADE,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    // One comment per user per title; replaces the earlier non-unique indexes
    for statement in [
        "DROP INDEX IF EXISTS idx_comments_anime",
        "DROP INDEX IF EXISTS idx_comments_manga",
        "CREATE UNIQUE INDEX IF NOT EXISTS uq_comments_anime_user ON comments(anime_id, user_id) WHERE anime_id IS NOT NULL",
        "CREATE UNIQUE INDEX IF NOT EXISTS uq_comments_manga_user ON comments(manga_id, user_id) WHERE manga_id IS NOT NULL",
    ] {
        sqlx::query(statement).execute(pool).await?;
    }

    Ok(())
}

async fn create_music_categories_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS music_categories (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE CHECK (length(name) <= 50)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_songs_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS songs (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            title TEXT NOT NULL,
            artist TEXT NOT NULL,
            cover_url TEXT NOT NULL DEFAULT 'default_cover.jpg',
            song_url TEXT NOT NULL,
            music_category_id INTEGER NOT NULL REFERENCES music_categories(id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_songs_category ON songs(music_category_id)")
        .execute(pool)
        .await?;

    Ok(())
}

async fn create_like_tables(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS anime_likes (
            user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            anime_id INTEGER NOT NULL REFERENCES animes(id) ON DELETE CASCADE,
            PRIMARY KEY (user_id, anime_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS manga_likes (
            user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            manga_id INTEGER NOT NULL REFERENCES mangas(id) ON DELETE CASCADE,
            PRIMARY KEY (user_id, manga_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Initialize default settings
///
/// Ensures all required settings exist. Existing values are never overwritten,
/// NULL values are reset to the default.
async fn init_default_settings(pool: &SqlitePool) -> Result<()> {
    // Session lifetimes
    ensure_setting(pool, "session_timeout_seconds", "86400").await?; // 1 day
    ensure_setting(pool, "remember_session_timeout_seconds", "2592000").await?; // 30 days

    // Password reset
    ensure_setting(pool, "reset_token_max_age_seconds", "1800").await?; // 30 minutes

    // Uploads
    ensure_setting(pool, "http_max_upload_bytes", "10485760").await?; // 10 MB

    Ok(())
}

/// Ensure a setting exists with a default value
pub async fn ensure_setting(pool: &SqlitePool, key: &str, default_value: &str) -> Result<()> {
    let existing: Option<Option<String>> =
        sqlx::query_scalar("SELECT value FROM settings WHERE key = ?")
            .bind(key)
            .fetch_optional(pool)
            .await?;

    match existing {
        Some(Some(_)) => {}
        Some(None) => {
            warn!("Setting '{}' is NULL, resetting to default '{}'", key, default_value);
            sqlx::query("UPDATE settings SET value = ?, updated_at = CURRENT_TIMESTAMP WHERE key = ?")
                .bind(default_value)
                .bind(key)
                .execute(pool)
                .await?;
        }
        None => {
            sqlx::query("INSERT INTO settings (key, value) VALUES (?, ?)")
                .bind(key)
                .bind(default_value)
                .execute(pool)
                .await?;
        }
    }

    Ok(())
}

/// Seed the administrator account if no user with its username exists.
///
/// Returns `true` when the account was created on this call.
pub async fn ensure_admin_user(pool: &SqlitePool, admin: &AdminConfig) -> Result<bool> {
    let exists: Option<i64> = sqlx::query_scalar("SELECT id FROM users WHERE username = ?")
        .bind(&admin.username)
        .fetch_optional(pool)
        .await?;

    if exists.is_some() {
        return Ok(false);
    }

    let hashed = hash_password(&admin.password);
    sqlx::query(
        r#"
        INSERT INTO users (username, email, password_hash, password_salt, is_admin, is_verified)
        VALUES (?, ?, ?, ?, 1, 1)
        "#,
    )
    .bind(&admin.username)
    .bind(&admin.email)
    .bind(&hashed.hash)
    .bind(&hashed.salt)
    .execute(pool)
    .await?;

    info!("Created administrator account '{}'", admin.username);
    if admin.password == crate::config::DEFAULT_ADMIN_PASSWORD {
        warn!("Administrator account uses the default password; change it via [admin] in suzuani.toml");
    }

    Ok(true)
}

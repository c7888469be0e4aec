//! Banner queries

use sqlx::SqlitePool;
use suzuani_common::db::{Banner, BannerType};
use suzuani_common::{Error, Result};

/// Banners shown at the top of a home page
pub const BANNERS_PER_PAGE: i64 = 4;

#[derive(Debug, Clone)]
pub struct NewBanner {
    pub image_url: String,
    pub banner_type: BannerType,
    pub anime_id: Option<i64>,
    pub manga_id: Option<i64>,
}

pub async fn list_by_type(pool: &SqlitePool, banner_type: BannerType, limit: i64) -> Result<Vec<Banner>> {
    let rows = sqlx::query_as::<_, Banner>(
        "SELECT id, image_url, banner_type, anime_id, manga_id FROM banners WHERE banner_type = ? ORDER BY id LIMIT ?",
    )
    .bind(banner_type.as_str())
    .bind(limit)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

pub async fn count(pool: &SqlitePool, banner_type: Option<BannerType>) -> Result<i64> {
    let banner_type = banner_type.map(|t| t.as_str());
    let count = sqlx::query_scalar("SELECT COUNT(*) FROM banners WHERE ? IS NULL OR banner_type = ?")
        .bind(banner_type)
        .bind(banner_type)
        .fetch_one(pool)
        .await?;
    Ok(count)
}

pub async fn list(pool: &SqlitePool, banner_type: Option<BannerType>, offset: i64, limit: i64) -> Result<Vec<Banner>> {
    let banner_type = banner_type.map(|t| t.as_str());
    let rows = sqlx::query_as::<_, Banner>(
        r#"
        SELECT id, image_url, banner_type, anime_id, manga_id FROM banners
        WHERE ? IS NULL OR banner_type = ?
        ORDER BY id
        LIMIT ? OFFSET ?
        "#,
    )
    .bind(banner_type)
    .bind(banner_type)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

pub async fn create(pool: &SqlitePool, banner: &NewBanner) -> Result<i64> {
    let result = sqlx::query(
        "INSERT INTO banners (image_url, banner_type, anime_id, manga_id) VALUES (?, ?, ?, ?)",
    )
    .bind(&banner.image_url)
    .bind(banner.banner_type.as_str())
    .bind(banner.anime_id)
    .bind(banner.manga_id)
    .execute(pool)
    .await
    .map_err(|e| Error::from_constraint(e, "Linked title does not exist"))?;
    Ok(result.last_insert_rowid())
}

pub async fn find(pool: &SqlitePool, id: i64) -> Result<Option<Banner>> {
    let row = sqlx::query_as::<_, Banner>(
        "SELECT id, image_url, banner_type, anime_id, manga_id FROM banners WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

pub async fn delete(pool: &SqlitePool, id: i64) -> Result<bool> {
    let result = sqlx::query("DELETE FROM banners WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

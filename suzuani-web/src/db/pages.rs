//! Manga chapter and page queries

use serde::Deserialize;
use sqlx::SqlitePool;
use suzuani_common::db::{MangaChapter, MangaPage};
use suzuani_common::{Error, Result};

#[derive(Debug, Clone, Deserialize)]
pub struct ChapterInput {
    pub title: String,
    pub manga_id: i64,
}

pub async fn find_chapter(pool: &SqlitePool, id: i64) -> Result<Option<MangaChapter>> {
    let row = sqlx::query_as::<_, MangaChapter>("SELECT id, title, manga_id FROM manga_chapters WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

/// Chapters of a manga in reading order
pub async fn chapters_for_manga(pool: &SqlitePool, manga_id: i64) -> Result<Vec<MangaChapter>> {
    let rows = sqlx::query_as::<_, MangaChapter>(
        "SELECT id, title, manga_id FROM manga_chapters WHERE manga_id = ? ORDER BY id",
    )
    .bind(manga_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Ids of the chapters immediately before and after `chapter_id` in the same manga
pub async fn neighbor_chapters(pool: &SqlitePool, manga_id: i64, chapter_id: i64) -> Result<(Option<i64>, Option<i64>)> {
    let prev = sqlx::query_scalar(
        "SELECT id FROM manga_chapters WHERE manga_id = ? AND id < ? ORDER BY id DESC LIMIT 1",
    )
    .bind(manga_id)
    .bind(chapter_id)
    .fetch_optional(pool)
    .await?;

    let next = sqlx::query_scalar(
        "SELECT id FROM manga_chapters WHERE manga_id = ? AND id > ? ORDER BY id ASC LIMIT 1",
    )
    .bind(manga_id)
    .bind(chapter_id)
    .fetch_optional(pool)
    .await?;

    Ok((prev, next))
}

pub async fn count_chapters(pool: &SqlitePool, manga_id: Option<i64>) -> Result<i64> {
    let count = sqlx::query_scalar("SELECT COUNT(*) FROM manga_chapters WHERE ? IS NULL OR manga_id = ?")
        .bind(manga_id)
        .bind(manga_id)
        .fetch_one(pool)
        .await?;
    Ok(count)
}

pub async fn list_chapters(pool: &SqlitePool, manga_id: Option<i64>, offset: i64, limit: i64) -> Result<Vec<MangaChapter>> {
    let rows = sqlx::query_as::<_, MangaChapter>(
        r#"
        SELECT id, title, manga_id FROM manga_chapters
        WHERE ? IS NULL OR manga_id = ?
        ORDER BY manga_id, id
        LIMIT ? OFFSET ?
        "#,
    )
    .bind(manga_id)
    .bind(manga_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

pub async fn create_chapter(pool: &SqlitePool, input: &ChapterInput) -> Result<i64> {
    let result = sqlx::query("INSERT INTO manga_chapters (title, manga_id) VALUES (?, ?)")
        .bind(&input.title)
        .bind(input.manga_id)
        .execute(pool)
        .await
        .map_err(|e| Error::from_constraint(e, "Unknown manga"))?;
    Ok(result.last_insert_rowid())
}

pub async fn update_chapter(pool: &SqlitePool, id: i64, input: &ChapterInput) -> Result<bool> {
    let result = sqlx::query("UPDATE manga_chapters SET title = ?, manga_id = ? WHERE id = ?")
        .bind(&input.title)
        .bind(input.manga_id)
        .bind(id)
        .execute(pool)
        .await
        .map_err(|e| Error::from_constraint(e, "Unknown manga"))?;
    Ok(result.rows_affected() > 0)
}

/// Image paths of every page in a chapter
pub async fn chapter_page_images(pool: &SqlitePool, chapter_id: i64) -> Result<Vec<String>> {
    let rows = sqlx::query_scalar("SELECT image_url FROM manga_pages WHERE chapter_id = ?")
        .bind(chapter_id)
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

pub async fn delete_chapter(pool: &SqlitePool, id: i64) -> Result<bool> {
    let result = sqlx::query("DELETE FROM manga_chapters WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

// ============================================================================
// Pages
// ============================================================================

pub async fn count_pages(pool: &SqlitePool, chapter_id: Option<i64>) -> Result<i64> {
    let count = sqlx::query_scalar("SELECT COUNT(*) FROM manga_pages WHERE ? IS NULL OR chapter_id = ?")
        .bind(chapter_id)
        .bind(chapter_id)
        .fetch_one(pool)
        .await?;
    Ok(count)
}

/// Pages ordered by chapter then page number
pub async fn list_pages(pool: &SqlitePool, chapter_id: Option<i64>, offset: i64, limit: i64) -> Result<Vec<MangaPage>> {
    let rows = sqlx::query_as::<_, MangaPage>(
        r#"
        SELECT id, page_number, image_url, chapter_id FROM manga_pages
        WHERE ? IS NULL OR chapter_id = ?
        ORDER BY chapter_id, page_number, id
        LIMIT ? OFFSET ?
        "#,
    )
    .bind(chapter_id)
    .bind(chapter_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

pub async fn create_page(pool: &SqlitePool, chapter_id: i64, page_number: i64, image_url: &str) -> Result<i64> {
    let result = sqlx::query("INSERT INTO manga_pages (page_number, image_url, chapter_id) VALUES (?, ?, ?)")
        .bind(page_number)
        .bind(image_url)
        .bind(chapter_id)
        .execute(pool)
        .await
        .map_err(|e| Error::from_constraint(e, "Unknown chapter"))?;
    Ok(result.last_insert_rowid())
}

pub async fn find_page(pool: &SqlitePool, id: i64) -> Result<Option<MangaPage>> {
    let row = sqlx::query_as::<_, MangaPage>(
        "SELECT id, page_number, image_url, chapter_id FROM manga_pages WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

pub async fn delete_page(pool: &SqlitePool, id: i64) -> Result<bool> {
    let result = sqlx::query("DELETE FROM manga_pages WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

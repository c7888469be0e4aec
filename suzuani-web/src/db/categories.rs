//! Category queries, shared by anime/manga categories and music categories

use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, SqlitePool};
use suzuani_common::db::{Category, MusicCategory};
use suzuani_common::{Error, Result};

use super::contains_pattern;

/// A `{id, name}` category table and the tables that reference it
pub trait CategoryRow: for<'r> FromRow<'r, SqliteRow> + Send + Unpin {
    const TABLE: &'static str;
    /// `(table, column)` pairs that hold a foreign key to this table
    const REFERENCED_BY: &'static [(&'static str, &'static str)];
    const LABEL: &'static str;
}

impl CategoryRow for Category {
    const TABLE: &'static str = "categories";
    const REFERENCED_BY: &'static [(&'static str, &'static str)] =
        &[("animes", "category_id"), ("mangas", "category_id")];
    const LABEL: &'static str = "Category";
}

impl CategoryRow for MusicCategory {
    const TABLE: &'static str = "music_categories";
    const REFERENCED_BY: &'static [(&'static str, &'static str)] = &[("songs", "music_category_id")];
    const LABEL: &'static str = "Music category";
}

/// Every category ordered by name
pub async fn list_all<C: CategoryRow>(pool: &SqlitePool) -> Result<Vec<C>> {
    let rows = sqlx::query_as::<_, C>(&format!("SELECT id, name FROM {} ORDER BY name, id", C::TABLE))
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

pub async fn find<C: CategoryRow>(pool: &SqlitePool, id: i64) -> Result<Option<C>> {
    let row = sqlx::query_as::<_, C>(&format!("SELECT id, name FROM {} WHERE id = ?", C::TABLE))
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

pub async fn exists<C: CategoryRow>(pool: &SqlitePool, id: i64) -> Result<bool> {
    Ok(find::<C>(pool, id).await?.is_some())
}

pub async fn count<C: CategoryRow>(pool: &SqlitePool, q: Option<&str>) -> Result<i64> {
    let count = sqlx::query_scalar(&format!(
        "SELECT COUNT(*) FROM {} WHERE ? IS NULL OR name LIKE ? ESCAPE '\\'",
        C::TABLE
    ))
    .bind(q)
    .bind(q.map(contains_pattern))
    .fetch_one(pool)
    .await?;
    Ok(count)
}

pub async fn list<C: CategoryRow>(pool: &SqlitePool, q: Option<&str>, offset: i64, limit: i64) -> Result<Vec<C>> {
    let rows = sqlx::query_as::<_, C>(&format!(
        "SELECT id, name FROM {} WHERE ? IS NULL OR name LIKE ? ESCAPE '\\' ORDER BY name, id LIMIT ? OFFSET ?",
        C::TABLE
    ))
    .bind(q)
    .bind(q.map(contains_pattern))
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

pub async fn create<C: CategoryRow>(pool: &SqlitePool, name: &str) -> Result<i64> {
    let result = sqlx::query(&format!("INSERT INTO {} (name) VALUES (?)", C::TABLE))
        .bind(name)
        .execute(pool)
        .await
        .map_err(|e| Error::from_constraint(e, &format!("{} '{}' already exists", C::LABEL, name)))?;
    Ok(result.last_insert_rowid())
}

pub async fn rename<C: CategoryRow>(pool: &SqlitePool, id: i64, name: &str) -> Result<bool> {
    let result = sqlx::query(&format!("UPDATE {} SET name = ? WHERE id = ?", C::TABLE))
        .bind(name)
        .bind(id)
        .execute(pool)
        .await
        .map_err(|e| Error::from_constraint(e, &format!("{} '{}' already exists", C::LABEL, name)))?;
    Ok(result.rows_affected() > 0)
}

/// Delete a category. Fails with `Conflict` while anything still references it.
pub async fn delete<C: CategoryRow>(pool: &SqlitePool, id: i64) -> Result<bool> {
    for (table, column) in C::REFERENCED_BY {
        let in_use: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {} WHERE {} = ?", table, column))
            .bind(id)
            .fetch_one(pool)
            .await?;
        if in_use > 0 {
            return Err(Error::Conflict(format!(
                "{} is still used by {} row(s) in {}",
                C::LABEL,
                in_use,
                table
            )));
        }
    }

    let result = sqlx::query(&format!("DELETE FROM {} WHERE id = ?", C::TABLE))
        .bind(id)
        .execute(pool)
        .await
        .map_err(|e| Error::from_constraint(e, &format!("{} is still in use", C::LABEL)))?;
    Ok(result.rows_affected() > 0)
}

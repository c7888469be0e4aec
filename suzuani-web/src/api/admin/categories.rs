//! Admin CRUD for anime/manga categories and music categories

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::{not_found, require_text};
use crate::db::categories::{self, CategoryRow};
use crate::error::{ApiError, ApiResult, FieldErrors};
use crate::pagination::{Page, PageParams};
use crate::AppState;

/// Longest accepted category name
const MAX_NAME_LEN: usize = 50;

#[derive(Debug, Deserialize)]
pub struct CategorySearch {
    pub q: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CategoryForm {
    pub name: String,
}

fn validated_name(form: &CategoryForm) -> ApiResult<String> {
    let name = form.name.trim();
    let mut errors = FieldErrors::new();
    require_text(&mut errors, "name", name);
    if name.chars().count() > MAX_NAME_LEN {
        errors.insert(
            "name".to_string(),
            format!("Name must be at most {} characters long.", MAX_NAME_LEN),
        );
    }
    if !errors.is_empty() {
        return Err(ApiError::Validation(errors));
    }
    Ok(name.to_string())
}

/// GET /admin/categories, /admin/music_categories
pub async fn list_categories<C: CategoryRow + Serialize>(
    State(state): State<AppState>,
    Query(page): Query<PageParams>,
    Query(search): Query<CategorySearch>,
) -> ApiResult<Json<Page<C>>> {
    let q = search.q.as_deref().map(str::trim).filter(|q| !q.is_empty());
    let total = categories::count::<C>(&state.db, q).await?;
    let pagination = page.paginate(total);
    let items = categories::list::<C>(&state.db, q, pagination.offset, pagination.page_size).await?;
    Ok(Json(Page::new(items, pagination, total)))
}

pub async fn get_category<C: CategoryRow + Serialize>(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<C>> {
    categories::find::<C>(&state.db, id)
        .await?
        .map(Json)
        .ok_or_else(|| not_found(C::LABEL, id))
}

pub async fn create_category<C: CategoryRow + Serialize>(
    State(state): State<AppState>,
    Json(form): Json<CategoryForm>,
) -> ApiResult<(StatusCode, Json<C>)> {
    let name = validated_name(&form)?;
    let id = categories::create::<C>(&state.db, &name).await?;
    info!("Created {} {} '{}'", C::LABEL, id, name);

    let created = categories::find::<C>(&state.db, id)
        .await?
        .ok_or_else(|| not_found(C::LABEL, id))?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn update_category<C: CategoryRow + Serialize>(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(form): Json<CategoryForm>,
) -> ApiResult<Json<C>> {
    let name = validated_name(&form)?;
    if !categories::rename::<C>(&state.db, id, &name).await? {
        return Err(not_found(C::LABEL, id));
    }
    get_category::<C>(State(state), Path(id)).await
}

/// Refused with 409 while titles or songs still use the category
pub async fn delete_category<C: CategoryRow + Serialize>(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    if !categories::delete::<C>(&state.db, id).await? {
        return Err(not_found(C::LABEL, id));
    }
    info!("Deleted {} {}", C::LABEL, id);
    Ok(StatusCode::NO_CONTENT)
}

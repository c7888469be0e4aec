//! Admin CRUD for animes and mangas
//!
//! Handlers are generic over the title row type and mounted twice, under
//! `/admin/animes` and `/admin/mangas`.

use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    Json,
};
use suzuani_common::db::Category;
use tracing::{info, warn};

use super::{not_found, require_text};
use crate::db::categories;
use crate::db::titles::{self, TitleFilter, TitleInput, TitleRow};
use crate::error::{ApiError, ApiResult, FieldErrors};
use crate::pagination::{Page, PageParams};
use crate::uploads::{MultipartForm, UploadKind};
use crate::AppState;

fn label<T: TitleRow>() -> &'static str {
    T::KIND.label()
}

async fn validate(state: &AppState, input: &TitleInput) -> ApiResult<TitleInput> {
    let mut errors = FieldErrors::new();
    let title = input.title.trim();
    require_text(&mut errors, "title", title);
    if title.chars().count() > 100 {
        errors.insert("title".to_string(), "Title must be at most 100 characters long.".to_string());
    }
    if !(0.0..=10.0).contains(&input.rating) {
        errors.insert("rating".to_string(), "Rating must be between 0 and 10.".to_string());
    }
    if input.release_year <= 0 {
        errors.insert("release_year".to_string(), "Release year must be positive.".to_string());
    }
    if !categories::exists::<Category>(&state.db, input.category_id).await? {
        errors.insert("category_id".to_string(), "Unknown category.".to_string());
    }
    if !errors.is_empty() {
        return Err(ApiError::Validation(errors));
    }

    Ok(TitleInput {
        title: title.to_string(),
        description: input.description.trim().to_string(),
        ..input.clone()
    })
}

/// GET /admin/animes?q=&release_year=&min_rating=&category_id=
pub async fn list_titles<T: TitleRow + 'static>(
    State(state): State<AppState>,
    Query(page): Query<PageParams>,
    Query(filter): Query<TitleFilter>,
) -> ApiResult<Json<Page<T>>> {
    let total = titles::count::<T>(&state.db, &filter).await?;
    let pagination = page.paginate(total);
    let items = titles::list::<T>(&state.db, &filter, pagination.offset, pagination.page_size).await?;
    Ok(Json(Page::new(items, pagination, total)))
}

pub async fn get_title<T: TitleRow + 'static>(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<T>> {
    titles::find::<T>(&state.db, id)
        .await?
        .map(Json)
        .ok_or_else(|| not_found(label::<T>(), id))
}

pub async fn create_title<T: TitleRow + 'static>(
    State(state): State<AppState>,
    Json(input): Json<TitleInput>,
) -> ApiResult<(StatusCode, Json<T>)> {
    let input = validate(&state, &input).await?;
    let id = titles::create::<T>(&state.db, &input, None).await?;
    info!("Created {} {} '{}'", label::<T>(), id, input.title);

    let created = titles::find::<T>(&state.db, id)
        .await?
        .ok_or_else(|| not_found(label::<T>(), id))?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn update_title<T: TitleRow + 'static>(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(input): Json<TitleInput>,
) -> ApiResult<Json<T>> {
    let input = validate(&state, &input).await?;
    if !titles::update::<T>(&state.db, id, &input).await? {
        return Err(not_found(label::<T>(), id));
    }
    get_title::<T>(State(state), Path(id)).await
}

/// Deleting a title cascades to its episodes or chapters, comments and likes;
/// the poster and the episode thumbnails or page images are removed from disk
pub async fn delete_title<T: TitleRow + 'static>(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    let files = titles::stored_files(&state.db, T::KIND, id).await?;
    if !titles::delete(&state.db, T::KIND, id).await? {
        return Err(not_found(label::<T>(), id));
    }
    state.uploads.remove_all(&files).await;
    warn!("Deleted {} {} with its episodes, comments and likes", label::<T>(), id);
    Ok(StatusCode::NO_CONTENT)
}

/// POST /admin/animes/:id/poster (multipart field `poster`)
pub async fn upload_poster<T: TitleRow + 'static>(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    multipart: Multipart,
) -> ApiResult<Json<T>> {
    let existing = titles::find::<T>(&state.db, id)
        .await?
        .ok_or_else(|| not_found(label::<T>(), id))?;

    let form = MultipartForm::read(multipart).await?;
    let poster = form.required_file("poster")?;
    let path = state.uploads.save(UploadKind::Poster, &poster.file_name, &poster.bytes).await?;
    titles::set_poster(&state.db, T::KIND, id, &path).await?;
    state.uploads.remove(existing.poster_url()).await;

    get_title::<T>(State(state), Path(id)).await
}

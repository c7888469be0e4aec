//! Admin CRUD for manga chapters and their pages

use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use suzuani_common::db::{MangaChapter, MangaPage};
use tracing::info;

use super::{not_found, require_text};
use crate::db::pages::{self, ChapterInput};
use crate::db::{titles, MediaKind};
use crate::error::{ApiError, ApiResult, FieldErrors};
use crate::pagination::{Page, PageParams};
use crate::uploads::{MultipartForm, UploadKind};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ChapterFilter {
    pub manga_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct PageFilter {
    pub chapter_id: Option<i64>,
}

async fn validate(state: &AppState, input: &ChapterInput) -> ApiResult<ChapterInput> {
    let mut errors = FieldErrors::new();
    let title = input.title.trim();
    require_text(&mut errors, "title", title);
    if title.chars().count() > 100 {
        errors.insert("title".to_string(), "Title must be at most 100 characters long.".to_string());
    }
    if !titles::exists(&state.db, MediaKind::Manga, input.manga_id).await? {
        errors.insert("manga_id".to_string(), "Unknown manga.".to_string());
    }
    if !errors.is_empty() {
        return Err(ApiError::Validation(errors));
    }

    Ok(ChapterInput {
        title: title.to_string(),
        manga_id: input.manga_id,
    })
}

/// GET /admin/chapters?manga_id=
pub async fn list_chapters(
    State(state): State<AppState>,
    Query(page): Query<PageParams>,
    Query(filter): Query<ChapterFilter>,
) -> ApiResult<Json<Page<MangaChapter>>> {
    let total = pages::count_chapters(&state.db, filter.manga_id).await?;
    let pagination = page.paginate(total);
    let items = pages::list_chapters(&state.db, filter.manga_id, pagination.offset, pagination.page_size).await?;
    Ok(Json(Page::new(items, pagination, total)))
}

pub async fn get_chapter(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<Json<MangaChapter>> {
    pages::find_chapter(&state.db, id)
        .await?
        .map(Json)
        .ok_or_else(|| not_found("Chapter", id))
}

pub async fn create_chapter(
    State(state): State<AppState>,
    Json(input): Json<ChapterInput>,
) -> ApiResult<(StatusCode, Json<MangaChapter>)> {
    let input = validate(&state, &input).await?;
    let id = pages::create_chapter(&state.db, &input).await?;
    info!("Created chapter {} for manga {}", id, input.manga_id);

    let created = pages::find_chapter(&state.db, id)
        .await?
        .ok_or_else(|| not_found("Chapter", id))?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn update_chapter(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(input): Json<ChapterInput>,
) -> ApiResult<Json<MangaChapter>> {
    let input = validate(&state, &input).await?;
    if !pages::update_chapter(&state.db, id, &input).await? {
        return Err(not_found("Chapter", id));
    }
    get_chapter(State(state), Path(id)).await
}

/// Pages of the chapter go with it, image files included
pub async fn delete_chapter(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<StatusCode> {
    let images = pages::chapter_page_images(&state.db, id).await?;
    if !pages::delete_chapter(&state.db, id).await? {
        return Err(not_found("Chapter", id));
    }
    state.uploads.remove_all(&images).await;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /admin/pages?chapter_id=
pub async fn list_pages(
    State(state): State<AppState>,
    Query(page): Query<PageParams>,
    Query(filter): Query<PageFilter>,
) -> ApiResult<Json<Page<MangaPage>>> {
    let total = pages::count_pages(&state.db, filter.chapter_id).await?;
    let pagination = page.paginate(total);
    let items = pages::list_pages(&state.db, filter.chapter_id, pagination.offset, pagination.page_size).await?;
    Ok(Json(Page::new(items, pagination, total)))
}

/// POST /admin/pages (multipart: `chapter_id`, `page_number`, file `image`)
pub async fn create_page(
    State(state): State<AppState>,
    multipart: Multipart,
) -> ApiResult<(StatusCode, Json<MangaPage>)> {
    let form = MultipartForm::read(multipart).await?;
    let chapter_id = form.required_int("chapter_id")?;
    let page_number = form.required_int("page_number")?;
    let image = form.required_file("image")?;

    if page_number < 1 {
        return Err(ApiError::invalid_field("page_number", "Page numbers start at 1."));
    }
    if pages::find_chapter(&state.db, chapter_id).await?.is_none() {
        return Err(ApiError::invalid_field("chapter_id", "Unknown chapter."));
    }

    let path = state.uploads.save(UploadKind::MangaPage, &image.file_name, &image.bytes).await?;
    let id = match pages::create_page(&state.db, chapter_id, page_number, &path).await {
        Ok(id) => id,
        Err(e) => {
            state.uploads.remove(&path).await;
            return Err(e.into());
        }
    };

    Ok((
        StatusCode::CREATED,
        Json(MangaPage {
            id,
            page_number,
            image_url: path,
            chapter_id,
        }),
    ))
}

pub async fn delete_page(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<StatusCode> {
    let page = pages::find_page(&state.db, id)
        .await?
        .ok_or_else(|| not_found("Page", id))?;

    if !pages::delete_page(&state.db, id).await? {
        return Err(not_found("Page", id));
    }
    state.uploads.remove(&page.image_url).await;
    Ok(StatusCode::NO_CONTENT)
}

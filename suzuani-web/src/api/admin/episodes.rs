//! Admin CRUD for anime episodes

use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use suzuani_common::db::Episode;
use tracing::info;

use super::{not_found, require_text};
use crate::db::titles::{self, EpisodeInput};
use crate::db::MediaKind;
use crate::error::{ApiError, ApiResult, FieldErrors};
use crate::pagination::{Page, PageParams};
use crate::uploads::{MultipartForm, UploadKind};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct EpisodeFilter {
    pub anime_id: Option<i64>,
}

async fn validate(state: &AppState, input: &EpisodeInput) -> ApiResult<EpisodeInput> {
    let mut errors = FieldErrors::new();
    let title = input.title.trim();
    let watch_link = input.watch_link.trim();

    require_text(&mut errors, "title", title);
    if title.chars().count() > 100 {
        errors.insert("title".to_string(), "Title must be at most 100 characters long.".to_string());
    }
    require_text(&mut errors, "watch_link", watch_link);
    if watch_link.chars().count() > 200 {
        errors.insert("watch_link".to_string(), "Link must be at most 200 characters long.".to_string());
    }
    if !titles::exists(&state.db, MediaKind::Anime, input.anime_id).await? {
        errors.insert("anime_id".to_string(), "Unknown anime.".to_string());
    }
    if !errors.is_empty() {
        return Err(ApiError::Validation(errors));
    }

    Ok(EpisodeInput {
        title: title.to_string(),
        watch_link: watch_link.to_string(),
        anime_id: input.anime_id,
    })
}

/// GET /admin/episodes?anime_id=
pub async fn list_episodes(
    State(state): State<AppState>,
    Query(page): Query<PageParams>,
    Query(filter): Query<EpisodeFilter>,
) -> ApiResult<Json<Page<Episode>>> {
    let total = titles::count_episodes(&state.db, filter.anime_id).await?;
    let pagination = page.paginate(total);
    let items = titles::list_episodes(&state.db, filter.anime_id, pagination.offset, pagination.page_size).await?;
    Ok(Json(Page::new(items, pagination, total)))
}

pub async fn get_episode(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<Json<Episode>> {
    titles::find_episode(&state.db, id)
        .await?
        .map(Json)
        .ok_or_else(|| not_found("Episode", id))
}

pub async fn create_episode(
    State(state): State<AppState>,
    Json(input): Json<EpisodeInput>,
) -> ApiResult<(StatusCode, Json<Episode>)> {
    let input = validate(&state, &input).await?;
    let id = titles::create_episode(&state.db, &input, None).await?;
    info!("Created episode {} for anime {}", id, input.anime_id);

    let created = titles::find_episode(&state.db, id)
        .await?
        .ok_or_else(|| not_found("Episode", id))?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn update_episode(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(input): Json<EpisodeInput>,
) -> ApiResult<Json<Episode>> {
    let input = validate(&state, &input).await?;
    if !titles::update_episode(&state.db, id, &input).await? {
        return Err(not_found("Episode", id));
    }
    get_episode(State(state), Path(id)).await
}

pub async fn delete_episode(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<StatusCode> {
    let episode = titles::find_episode(&state.db, id)
        .await?
        .ok_or_else(|| not_found("Episode", id))?;

    if !titles::delete_episode(&state.db, id).await? {
        return Err(not_found("Episode", id));
    }
    state.uploads.remove(&episode.thumbnail_url).await;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /admin/episodes/:id/thumbnail (multipart field `thumbnail`)
pub async fn upload_thumbnail(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    multipart: Multipart,
) -> ApiResult<Json<Episode>> {
    let episode = titles::find_episode(&state.db, id)
        .await?
        .ok_or_else(|| not_found("Episode", id))?;

    let form = MultipartForm::read(multipart).await?;
    let thumbnail = form.required_file("thumbnail")?;
    let path = state
        .uploads
        .save(UploadKind::EpisodeThumbnail, &thumbnail.file_name, &thumbnail.bytes)
        .await?;
    titles::set_episode_thumbnail(&state.db, id, &path).await?;
    state.uploads.remove(&episode.thumbnail_url).await;

    get_episode(State(state), Path(id)).await
}

//! Admin song management
//!
//! A song is created in one multipart request carrying its cover image and
//! its audio file; both are required.

use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    Json,
};
use suzuani_common::db::{MusicCategory, Song};
use tracing::info;

use super::not_found;
use crate::db::categories;
use crate::db::music::{self, NewSong, SongFilter};
use crate::error::{ApiError, ApiResult, FieldErrors};
use crate::pagination::{Page, PageParams};
use crate::uploads::{MultipartForm, UploadKind};
use crate::AppState;

/// GET /admin/songs?q=&music_category_id=&artist=
pub async fn list_songs(
    State(state): State<AppState>,
    Query(page): Query<PageParams>,
    Query(filter): Query<SongFilter>,
) -> ApiResult<Json<Page<Song>>> {
    let total = music::count(&state.db, &filter).await?;
    let pagination = page.paginate(total);
    let items = music::list(&state.db, &filter, pagination.offset, pagination.page_size).await?;
    Ok(Json(Page::new(items, pagination, total)))
}

pub async fn get_song(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<Json<Song>> {
    music::find(&state.db, id)
        .await?
        .map(Json)
        .ok_or_else(|| not_found("Song", id))
}

/// POST /admin/songs (multipart: `title`, `artist`, `music_category_id`,
/// files `cover` and `song`)
pub async fn create_song(
    State(state): State<AppState>,
    multipart: Multipart,
) -> ApiResult<(StatusCode, Json<Song>)> {
    let form = MultipartForm::read(multipart).await?;

    let mut errors = FieldErrors::new();
    let title = form.text("title").unwrap_or_default();
    let artist = form.text("artist").unwrap_or_default();
    for (field, value) in [("title", title), ("artist", artist)] {
        if value.is_empty() {
            errors.insert(field.to_string(), "This field is required.".to_string());
        } else if value.chars().count() > 100 {
            errors.insert(field.to_string(), "Must be at most 100 characters long.".to_string());
        }
    }
    let music_category_id = form.required_int("music_category_id")?;
    if !categories::exists::<MusicCategory>(&state.db, music_category_id).await? {
        errors.insert("music_category_id".to_string(), "Unknown music category.".to_string());
    }
    if form.file("cover").is_none() {
        errors.insert("cover".to_string(), "A cover image is required.".to_string());
    }
    if form.file("song").is_none() {
        errors.insert("song".to_string(), "An audio file is required.".to_string());
    }
    if !errors.is_empty() {
        return Err(ApiError::Validation(errors));
    }

    let cover = form.required_file("cover")?;
    let audio = form.required_file("song")?;

    // Both files must pass before either is written
    state.uploads.check(UploadKind::Song, &audio.file_name, &audio.bytes)?;
    state.uploads.check(UploadKind::SongCover, &cover.file_name, &cover.bytes)?;

    let song_url = state.uploads.save(UploadKind::Song, &audio.file_name, &audio.bytes).await?;
    let cover_url = match state.uploads.save(UploadKind::SongCover, &cover.file_name, &cover.bytes).await {
        Ok(path) => path,
        Err(e) => {
            state.uploads.remove(&song_url).await;
            return Err(e.into());
        }
    };

    let new_song = NewSong {
        title: title.to_string(),
        artist: artist.to_string(),
        cover_url,
        song_url,
        music_category_id,
    };
    let id = match music::create(&state.db, &new_song).await {
        Ok(id) => id,
        Err(e) => {
            state.uploads.remove_all(&[new_song.song_url, new_song.cover_url]).await;
            return Err(e.into());
        }
    };
    info!("Created song {} '{}' by {}", id, new_song.title, new_song.artist);

    let created = music::find(&state.db, id)
        .await?
        .ok_or_else(|| not_found("Song", id))?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// DELETE /admin/songs/:id; removes the audio file and cover too
pub async fn delete_song(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<StatusCode> {
    let song = music::find(&state.db, id)
        .await?
        .ok_or_else(|| not_found("Song", id))?;

    if !music::delete(&state.db, id).await? {
        return Err(not_found("Song", id));
    }
    state.uploads.remove_all(&[song.song_url, song.cover_url]).await;
    Ok(StatusCode::NO_CONTENT)
}

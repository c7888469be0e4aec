//! Likes and comment deletion

use axum::{
    extract::{Path, State},
    routing::post,
    Json, Router,
};
use serde_json::{json, Value};
use tracing::info;

use crate::db::{comments, likes, titles, MediaKind};
use crate::error::{ApiError, ApiResult};
use crate::session::CurrentUser;
use crate::AppState;

async fn toggle_like(state: &AppState, kind: MediaKind, user_id: i64, title_id: i64) -> ApiResult<Json<Value>> {
    if !titles::exists(&state.db, kind, title_id).await? {
        return Err(ApiError::NotFound(format!("{} {}", kind.label(), title_id)));
    }

    let liked = likes::toggle(&state.db, kind, user_id, title_id).await?;
    let status = if liked { "liked" } else { "unliked" };
    Ok(Json(json!({ "status": status })))
}

/// POST /like_anime/:id
pub async fn like_anime(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<i64>,
) -> ApiResult<Json<Value>> {
    toggle_like(&state, MediaKind::Anime, current.user.id, id).await
}

/// POST /like_manga/:id
pub async fn like_manga(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<i64>,
) -> ApiResult<Json<Value>> {
    toggle_like(&state, MediaKind::Manga, current.user.id, id).await
}

/// POST /comment/:id/delete
///
/// Only the author may delete. Responds with the page to return to.
pub async fn delete_comment(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<i64>,
) -> ApiResult<Json<Value>> {
    let comment = comments::find(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Comment {}", id)))?;

    if comment.user_id != current.user.id {
        return Err(ApiError::Forbidden("You can only delete your own comments.".to_string()));
    }

    let redirect = match (comment.anime_id, comment.manga_id) {
        (Some(anime_id), _) => format!("/anime/{}", anime_id),
        (None, Some(manga_id)) => format!("/manga/{}", manga_id),
        (None, None) => "/".to_string(),
    };

    comments::delete(&state.db, id).await?;
    info!("User {} deleted comment {}", current.user.id, id);

    Ok(Json(json!({
        "message": "Your comment has been deleted.",
        "redirect": redirect,
    })))
}

/// Like and comment-removal routes; mounted behind the login guard
pub fn social_routes() -> Router<AppState> {
    Router::new()
        .route("/like_anime/:id", post(like_anime))
        .route("/like_manga/:id", post(like_manga))
        .route("/comment/:id/delete", post(delete_comment))
}

//! Admin comment moderation

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use suzuani_common::db::Comment;
use tracing::info;

use super::not_found;
use crate::db::comments;
use crate::error::ApiResult;
use crate::pagination::{Page, PageParams};
use crate::session::AdminUser;
use crate::AppState;

/// GET /admin/comments (newest first)
pub async fn list_comments(
    State(state): State<AppState>,
    Query(page): Query<PageParams>,
) -> ApiResult<Json<Page<Comment>>> {
    let total = comments::count(&state.db).await?;
    let pagination = page.paginate(total);
    let items = comments::list(&state.db, pagination.offset, pagination.page_size).await?;
    Ok(Json(Page::new(items, pagination, total)))
}

/// DELETE /admin/comments/:id (any author)
pub async fn delete_comment(
    State(state): State<AppState>,
    AdminUser(current): AdminUser,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    if !comments::delete(&state.db, id).await? {
        return Err(not_found("Comment", id));
    }
    info!("Admin {} removed comment {}", current.user.id, id);
    Ok(StatusCode::NO_CONTENT)
}

//! Admin user management
//!
//! Password digests and OTPs never leave the server: listings use [`PublicUser`].

use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use suzuani_common::db::PublicUser;
use tracing::{info, warn};

use super::not_found;
use crate::api::account::{check_identity_available, validate_email, validate_username};
use crate::db::users::{self, UserUpdate};
use crate::error::{ApiError, ApiResult, FieldErrors};
use crate::pagination::{Page, PageParams};
use crate::session::AdminUser;
use crate::uploads::{MultipartForm, UploadKind};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct UserSearch {
    pub q: Option<String>,
}

/// GET /admin/users
pub async fn list_users(
    State(state): State<AppState>,
    Query(page): Query<PageParams>,
    Query(search): Query<UserSearch>,
) -> ApiResult<Json<Page<PublicUser>>> {
    let q = search.q.as_deref().map(str::trim).filter(|q| !q.is_empty());
    let total = users::count_users(&state.db, q).await?;
    let pagination = page.paginate(total);
    let rows = users::list_users(&state.db, q, pagination.offset, pagination.page_size).await?;

    let items = rows.iter().map(PublicUser::from).collect();
    Ok(Json(Page::new(items, pagination, total)))
}

/// GET /admin/users/:id
pub async fn get_user(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<Json<PublicUser>> {
    let user = users::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| not_found("User", id))?;
    Ok(Json(PublicUser::from(&user)))
}

/// Flags left out of the form keep their stored value
#[derive(Debug, Deserialize)]
pub struct UserForm {
    pub username: String,
    pub email: String,
    pub is_admin: Option<bool>,
    pub is_verified: Option<bool>,
}

/// PUT /admin/users/:id
pub async fn update_user(
    State(state): State<AppState>,
    AdminUser(current): AdminUser,
    Path(id): Path<i64>,
    Json(form): Json<UserForm>,
) -> ApiResult<Json<PublicUser>> {
    let existing = users::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| not_found("User", id))?;

    let update = UserUpdate {
        username: form.username.trim().to_string(),
        email: form.email.trim().to_string(),
        is_admin: form.is_admin.unwrap_or(existing.is_admin),
        is_verified: form.is_verified.unwrap_or(existing.is_verified),
    };

    let mut errors = FieldErrors::new();
    validate_username(&mut errors, &update.username);
    validate_email(&mut errors, &update.email);
    check_identity_available(&state, &mut errors, &update.username, &update.email, Some(id)).await?;
    if id == current.user.id && !update.is_admin {
        errors.insert(
            "is_admin".to_string(),
            "You cannot remove your own administrator rights.".to_string(),
        );
    }
    if !errors.is_empty() {
        return Err(ApiError::Validation(errors));
    }

    users::update_user(&state.db, id, &update).await?;
    info!("Admin {} updated user {}", current.user.id, id);

    get_user(State(state), Path(id)).await
}

/// DELETE /admin/users/:id
pub async fn delete_user(
    State(state): State<AppState>,
    AdminUser(current): AdminUser,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    if id == current.user.id {
        return Err(ApiError::Conflict("You cannot delete your own account.".to_string()));
    }

    let user = users::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| not_found("User", id))?;

    if !users::delete_user(&state.db, id).await? {
        return Err(not_found("User", id));
    }
    state.uploads.remove(&user.profile_image).await;

    warn!("Admin {} deleted user {}", current.user.id, id);
    Ok(StatusCode::NO_CONTENT)
}

/// POST /admin/users/:id/profile_image (multipart field `image`)
pub async fn upload_profile_image(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    multipart: Multipart,
) -> ApiResult<Json<PublicUser>> {
    let user = users::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| not_found("User", id))?;

    let form = MultipartForm::read(multipart).await?;
    let image = form.required_file("image")?;
    let path = state
        .uploads
        .save(UploadKind::ProfileImage, &image.file_name, &image.bytes)
        .await?;
    users::set_profile_image(&state.db, id, &path).await?;
    state.uploads.remove(&user.profile_image).await;

    get_user(State(state), Path(id)).await
}

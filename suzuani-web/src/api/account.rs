//! Account endpoints: registration, OTP verification, login/logout,
//! password reset, profile and liked-content history

use axum::{
    extract::{Multipart, Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use suzuani_common::auth::{generate_otp, hash_password, otp_matches, reset_token, verify_password, PasswordHash};
use suzuani_common::db::{get_setting_i64, PublicUser, User};
use suzuani_common::mail::{otp_email, reset_email, OutgoingMail};
use tracing::{debug, error, info};

use crate::db::{likes, sessions, users};
use crate::error::{ApiError, ApiResult, FieldErrors};
use crate::session::{expired_session_cookie, session_cookie, unix_now, CurrentUser, MaybeUser};
use crate::uploads::{MultipartForm, UploadKind};
use crate::AppState;

const BAD_CREDENTIALS: &str = "Login Unsuccessful. Please check email and password.";
const INVALID_RESET_TOKEN: &str = "That is an invalid or expired token.";
const RESET_REQUESTED: &str = "An email has been sent with instructions to reset your password.";

// ============================================================================
// Validation
// ============================================================================

pub(crate) fn validate_username(errors: &mut FieldErrors, username: &str) {
    let len = username.chars().count();
    if !(2..=20).contains(&len) {
        errors.insert(
            "username".to_string(),
            "Username must be between 2 and 20 characters long.".to_string(),
        );
    }
}

pub(crate) fn validate_email(errors: &mut FieldErrors, email: &str) {
    if email.chars().count() > 120 || !is_valid_email(email) {
        errors.insert("email".to_string(), "Invalid email address.".to_string());
    }
}

fn validate_new_password(errors: &mut FieldErrors, password: &str, confirm: &str) {
    if password.chars().count() < 6 {
        errors.insert(
            "password".to_string(),
            "Password must be at least 6 characters long.".to_string(),
        );
    }
    if password != confirm {
        errors.insert(
            "confirm_password".to_string(),
            "Field must be equal to password.".to_string(),
        );
    }
}

/// `local@domain.tld` with no whitespace
fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain
            .split_once('.')
            .map(|(host, tld)| !host.is_empty() && !tld.is_empty() && !tld.ends_with('.'))
            .unwrap_or(false)
}

/// Username and e-mail uniqueness, ignoring the account `exclude_id`
pub(crate) async fn check_identity_available(
    state: &AppState,
    errors: &mut FieldErrors,
    username: &str,
    email: &str,
    exclude_id: Option<i64>,
) -> ApiResult<()> {
    if !errors.contains_key("username") && users::username_taken(&state.db, username, exclude_id).await? {
        errors.insert(
            "username".to_string(),
            "That username is taken. Please choose a different one.".to_string(),
        );
    }
    if !errors.contains_key("email") && users::email_taken(&state.db, email, exclude_id).await? {
        errors.insert(
            "email".to_string(),
            "That email is taken. Please choose a different one.".to_string(),
        );
    }
    Ok(())
}

fn reject_authenticated(caller: &MaybeUser) -> ApiResult<()> {
    match caller.0 {
        Some(_) => Err(ApiError::Conflict("You are already logged in.".to_string())),
        None => Ok(()),
    }
}

/// Hand a message to the mailer; failures are logged, never propagated
async fn deliver(state: &AppState, mail: OutgoingMail) -> bool {
    let mailer = state.mailer.clone();
    let (to, subject) = (mail.to.clone(), mail.subject.clone());
    let result = tokio::task::spawn_blocking(move || mailer.send(&mail)).await;

    match result {
        Ok(Ok(())) => true,
        Ok(Err(e)) => {
            error!("EMAIL SENDING FAILED for {} ({}): {}", to, subject, e);
            false
        }
        Err(e) => {
            error!("EMAIL SENDING FAILED for {} ({}): mail task panicked: {}", to, subject, e);
            false
        }
    }
}

/// Password hashing is CPU-bound; keep it off the async workers
async fn hash_in_background(password: String) -> ApiResult<PasswordHash> {
    tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| ApiError::Internal(format!("Password hashing task failed: {}", e)))
}

async fn verify_in_background(password: String, user: &User) -> ApiResult<bool> {
    let (hash, salt) = (user.password_hash.clone(), user.password_salt.clone());
    tokio::task::spawn_blocking(move || verify_password(&password, &hash, &salt))
        .await
        .map_err(|e| ApiError::Internal(format!("Password check task failed: {}", e)))
}

async fn reset_max_age(state: &AppState) -> ApiResult<i64> {
    Ok(get_setting_i64(
        &state.db,
        "reset_token_max_age_seconds",
        reset_token::DEFAULT_MAX_AGE_SECS,
    )
    .await?)
}

/// Only local absolute paths are honoured as redirect targets
fn safe_next(next: Option<&str>) -> String {
    match next {
        Some(path) if path.starts_with('/') && !path.starts_with("//") && !path.contains('\\') => path.to_string(),
        _ => "/".to_string(),
    }
}

// ============================================================================
// Registration and verification
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct RegisterForm {
    pub username: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

/// POST /register
pub async fn register(
    State(state): State<AppState>,
    caller: MaybeUser,
    Json(form): Json<RegisterForm>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    reject_authenticated(&caller)?;

    let username = form.username.trim();
    let email = form.email.trim();

    let mut errors = FieldErrors::new();
    validate_username(&mut errors, username);
    validate_email(&mut errors, email);
    validate_new_password(&mut errors, &form.password, &form.confirm_password);
    check_identity_available(&state, &mut errors, username, email, None).await?;
    if !errors.is_empty() {
        return Err(ApiError::Validation(errors));
    }

    let otp = generate_otp();
    let password = hash_in_background(form.password).await?;
    let user_id = users::create_user(&state.db, username, email, &password, &otp).await?;
    info!("Registered user {} ({})", user_id, username);

    let mail_sent = deliver(&state, otp_email(&state.mail, username, email, &otp)).await;
    let message = if mail_sent {
        format!("An OTP has been sent to {}. Please verify.", email)
    } else {
        "Registration successful, but could not send OTP email.".to_string()
    };

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "user_id": user_id,
            "verify_url": format!("/verify_otp/{}", user_id),
            "mail_sent": mail_sent,
            "message": message,
        })),
    ))
}

#[derive(Debug, Deserialize)]
pub struct OtpForm {
    pub otp: String,
}

/// The account, or `None` when it is already verified
async fn unverified_user(state: &AppState, user_id: i64) -> ApiResult<Option<User>> {
    let user = users::find_by_id(&state.db, user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("User {}", user_id)))?;

    Ok((!user.is_verified).then_some(user))
}

fn already_verified() -> Json<Value> {
    Json(json!({
        "status": "already_verified",
        "message": "Your account is already verified. You can log in.",
        "login_url": "/login",
    }))
}

/// POST /verify_otp/:user_id
pub async fn verify_otp(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
    Json(form): Json<OtpForm>,
) -> ApiResult<Json<Value>> {
    let Some(user) = unverified_user(&state, user_id).await? else {
        return Ok(already_verified());
    };

    if !otp_matches(user.otp.as_deref(), &form.otp) {
        return Err(ApiError::BadRequest("Invalid OTP. Please try again.".to_string()));
    }

    users::mark_verified(&state.db, user.id).await?;
    info!("User {} verified", user.id);

    Ok(Json(json!({
        "status": "verified",
        "message": "Your account has been verified! You can now log in.",
        "login_url": "/login",
    })))
}

/// POST /verify_otp/:user_id/resend
pub async fn resend_otp(State(state): State<AppState>, Path(user_id): Path<i64>) -> ApiResult<Json<Value>> {
    let Some(user) = unverified_user(&state, user_id).await? else {
        return Ok(already_verified());
    };

    let otp = generate_otp();
    users::set_otp(&state.db, user.id, Some(&otp)).await?;
    let mail_sent = deliver(&state, otp_email(&state.mail, &user.username, &user.email, &otp)).await;
    let message = if mail_sent {
        format!("A new OTP has been sent to {}.", user.email)
    } else {
        "Could not send OTP email.".to_string()
    };

    Ok(Json(json!({
        "status": "sent",
        "mail_sent": mail_sent,
        "message": message,
    })))
}

// ============================================================================
// Login / logout
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub remember: bool,
}

#[derive(Debug, Deserialize)]
pub struct NextQuery {
    pub next: Option<String>,
}

/// POST /login
pub async fn login(
    State(state): State<AppState>,
    caller: MaybeUser,
    Query(query): Query<NextQuery>,
    Json(form): Json<LoginForm>,
) -> ApiResult<Response> {
    reject_authenticated(&caller)?;

    let user = users::find_by_email(&state.db, &form.email).await?;
    let authenticated = match &user {
        Some(user) => verify_in_background(form.password.clone(), user).await?,
        None => false,
    };
    let user = match user {
        Some(user) if authenticated => user,
        _ => {
            debug!("Failed login for {}", form.email.trim());
            return Err(ApiError::unauthorized(BAD_CREDENTIALS));
        }
    };

    if !user.is_verified {
        let body = Json(json!({
            "error": {
                "code": "NOT_VERIFIED",
                "message": "Please verify your email address before logging in.",
                "verify_url": format!("/verify_otp/{}", user.id),
            }
        }));
        return Ok((StatusCode::FORBIDDEN, body).into_response());
    }

    let ttl_secs = if form.remember {
        get_setting_i64(&state.db, "remember_session_timeout_seconds", 2_592_000).await?
    } else {
        get_setting_i64(&state.db, "session_timeout_seconds", 86_400).await?
    };

    let token = sessions::create_session(&state.db, user.id, form.remember, ttl_secs, unix_now()).await?;
    let cookie = session_cookie(&token, form.remember.then_some(ttl_secs));
    info!("User {} logged in", user.id);

    Ok((
        [(header::SET_COOKIE, cookie)],
        Json(json!({
            "token": token,
            "next": safe_next(query.next.as_deref()),
            "user": PublicUser::from(&user),
        })),
    )
        .into_response())
}

/// POST /logout
pub async fn logout(State(state): State<AppState>, MaybeUser(caller): MaybeUser) -> ApiResult<Response> {
    if let Some(current) = caller {
        sessions::delete_session(&state.db, &current.token).await?;
        info!("User {} logged out", current.user.id);
    }

    Ok((
        [(header::SET_COOKIE, expired_session_cookie())],
        Json(json!({ "status": "logged_out", "next": "/login" })),
    )
        .into_response())
}

// ============================================================================
// Password reset
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ResetRequestForm {
    pub email: String,
}

/// POST /reset_password
pub async fn reset_request(
    State(state): State<AppState>,
    caller: MaybeUser,
    Json(form): Json<ResetRequestForm>,
) -> ApiResult<Json<Value>> {
    reject_authenticated(&caller)?;

    match users::find_by_email(&state.db, &form.email).await? {
        Some(user) => {
            let token = reset_token::issue(user.id, &state.secret_key, unix_now());
            let max_age = reset_max_age(&state).await?;
            deliver(&state, reset_email(&state.mail, &user.username, &user.email, &token, max_age)).await;
            info!("Password reset requested for user {}", user.id);
        }
        None => debug!("Password reset requested for unknown address"),
    }

    Ok(Json(json!({ "message": RESET_REQUESTED, "login_url": "/login" })))
}

async fn user_for_reset_token(state: &AppState, token: &str) -> ApiResult<User> {
    let max_age = reset_max_age(state).await?;

    let user_id = reset_token::verify(token, &state.secret_key, max_age, unix_now()).map_err(|e| {
        debug!("Rejected reset token: {}", e);
        ApiError::BadRequest(INVALID_RESET_TOKEN.to_string())
    })?;

    users::find_by_id(&state.db, user_id)
        .await?
        .ok_or_else(|| ApiError::BadRequest(INVALID_RESET_TOKEN.to_string()))
}

/// GET /reset_password/:token
pub async fn reset_token_status(
    State(state): State<AppState>,
    caller: MaybeUser,
    Path(token): Path<String>,
) -> ApiResult<Json<Value>> {
    reject_authenticated(&caller)?;
    user_for_reset_token(&state, &token).await?;
    Ok(Json(json!({ "status": "valid" })))
}

#[derive(Debug, Deserialize)]
pub struct ResetPasswordForm {
    pub password: String,
    pub confirm_password: String,
}

/// POST /reset_password/:token
pub async fn reset_password(
    State(state): State<AppState>,
    caller: MaybeUser,
    Path(token): Path<String>,
    Json(form): Json<ResetPasswordForm>,
) -> ApiResult<Json<Value>> {
    reject_authenticated(&caller)?;
    let user = user_for_reset_token(&state, &token).await?;

    let mut errors = FieldErrors::new();
    validate_new_password(&mut errors, &form.password, &form.confirm_password);
    if !errors.is_empty() {
        return Err(ApiError::Validation(errors));
    }

    let password = hash_in_background(form.password).await?;
    users::set_password(&state.db, user.id, &password).await?;
    let dropped = sessions::delete_user_sessions(&state.db, user.id).await?;
    info!("Password reset for user {} ({} session(s) invalidated)", user.id, dropped);

    Ok(Json(json!({
        "message": "Your password has been updated! You can now log in.",
        "login_url": "/login",
    })))
}

// ============================================================================
// Profile and history
// ============================================================================

/// GET /profile
pub async fn get_profile(current: CurrentUser) -> Json<PublicUser> {
    Json(PublicUser::from(&current.user))
}

#[derive(Debug, Deserialize)]
pub struct ProfileForm {
    pub username: String,
    pub email: String,
}

/// POST /profile
pub async fn update_profile(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(form): Json<ProfileForm>,
) -> ApiResult<Json<Value>> {
    let username = form.username.trim();
    let email = form.email.trim();

    let mut errors = FieldErrors::new();
    validate_username(&mut errors, username);
    validate_email(&mut errors, email);
    check_identity_available(&state, &mut errors, username, email, Some(current.user.id)).await?;
    if !errors.is_empty() {
        return Err(ApiError::Validation(errors));
    }

    users::update_profile(&state.db, current.user.id, username, email).await?;
    let user = users::find_by_id(&state.db, current.user.id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("User {}", current.user.id)))?;

    Ok(Json(json!({
        "message": "Your account has been updated!",
        "user": PublicUser::from(&user),
    })))
}

/// POST /profile/picture (multipart field `picture`)
pub async fn update_profile_picture(
    State(state): State<AppState>,
    current: CurrentUser,
    multipart: Multipart,
) -> ApiResult<Json<Value>> {
    let form = MultipartForm::read(multipart).await?;
    let picture = form.required_file("picture")?;

    let path = state
        .uploads
        .save(UploadKind::ProfileImage, &picture.file_name, &picture.bytes)
        .await?;
    users::set_profile_image(&state.db, current.user.id, &path).await?;
    state.uploads.remove(&current.user.profile_image).await;

    Ok(Json(json!({
        "message": "Your account has been updated!",
        "profile_image": path,
        "profile_image_url": format!("/static/{}", path),
    })))
}

/// GET /history
pub async fn history(State(state): State<AppState>, current: CurrentUser) -> ApiResult<Json<Value>> {
    let animes = likes::liked_animes(&state.db, current.user.id).await?;
    let mangas = likes::liked_mangas(&state.db, current.user.id).await?;
    if animes.is_empty() && mangas.is_empty() {
        debug!("User {} has no liked content", current.user.id);
    }

    Ok(Json(json!({ "animes": animes, "mangas": mangas })))
}

// ============================================================================
// Routes
// ============================================================================

/// Routes open to anonymous callers
pub fn account_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/verify_otp/:user_id", post(verify_otp))
        .route("/verify_otp/:user_id/resend", post(resend_otp))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/reset_password", post(reset_request))
        .route("/reset_password/:token", get(reset_token_status).post(reset_password))
}

/// Routes for the logged-in caller's own account
pub fn profile_routes() -> Router<AppState> {
    Router::new()
        .route("/profile", get(get_profile).post(update_profile))
        .route("/profile/picture", post(update_profile_picture))
        .route("/history", get(history))
}

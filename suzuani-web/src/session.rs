//! Login sessions over HTTP
//!
//! A session token travels either in the `suzuani_session` cookie or in an
//! `Authorization: Bearer <token>` header. [`require_login`] and
//! [`require_admin`] guard whole routers; the [`CurrentUser`], [`MaybeUser`]
//! and [`AdminUser`] extractors give handlers the caller.

use axum::{
    extract::{FromRequestParts, OriginalUri, Request, State},
    http::{header, request::Parts, HeaderMap, Uri},
    middleware::Next,
    response::Response,
};
use suzuani_common::db::User;
use tracing::debug;

use crate::db::sessions;
use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// Cookie carrying the session token
pub const SESSION_COOKIE: &str = "suzuani_session";

/// Authenticated caller
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user: User,
    /// Raw session token the caller presented
    pub token: String,
}

/// Caller that may or may not be logged in
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<CurrentUser>);

/// Authenticated caller with `is_admin`
#[derive(Debug, Clone)]
pub struct AdminUser(pub CurrentUser);

/// Current unix time in seconds
pub fn unix_now() -> i64 {
    chrono::Utc::now().timestamp()
}

/// Extract the session token from the Authorization header or the cookie
pub fn session_token_from_headers(headers: &HeaderMap) -> Option<String> {
    if let Some(value) = headers.get(header::AUTHORIZATION).and_then(|v| v.to_str().ok()) {
        if let Some(token) = value.strip_prefix("Bearer ") {
            let token = token.trim();
            if !token.is_empty() {
                return Some(token.to_string());
            }
        }
    }

    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|cookies| cookies.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == SESSION_COOKIE && !value.is_empty())
        .map(|(_, value)| value.to_string())
}

/// `Set-Cookie` value for a new session; `max_age_secs` makes it persistent
pub fn session_cookie(token: &str, max_age_secs: Option<i64>) -> String {
    let mut cookie = format!("{}={}; Path=/; HttpOnly; SameSite=Lax", SESSION_COOKIE, token);
    if let Some(max_age) = max_age_secs {
        cookie.push_str(&format!("; Max-Age={}", max_age));
    }
    cookie
}

/// `Set-Cookie` value that removes the session cookie
pub fn expired_session_cookie() -> String {
    format!("{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0", SESSION_COOKIE)
}

/// Resolve the caller from request headers
pub async fn lookup(state: &AppState, headers: &HeaderMap) -> ApiResult<Option<CurrentUser>> {
    let Some(token) = session_token_from_headers(headers) else {
        return Ok(None);
    };

    let user = sessions::resolve_session(&state.db, &token, unix_now()).await?;
    Ok(user.map(|user| CurrentUser { user, token }))
}

/// 401 pointing at the login page, with `next` set to the requested URL
pub fn login_required(uri: &Uri) -> ApiError {
    let target = uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/");
    let next: String = url::form_urlencoded::byte_serialize(target.as_bytes()).collect();

    ApiError::Unauthorized {
        message: "Please log in to access this page.".to_string(),
        login_url: Some(format!("/login?next={}", next)),
    }
}

/// URI as the client sent it, before any `nest` prefix stripping
fn requested_uri(request: &Request) -> &Uri {
    match request.extensions().get::<OriginalUri>() {
        Some(OriginalUri(uri)) => uri,
        None => request.uri(),
    }
}

/// Middleware: reject anonymous callers, stash the caller in request extensions
pub async fn require_login(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let current = lookup(&state, request.headers())
        .await?
        .ok_or_else(|| login_required(requested_uri(&request)))?;

    request.extensions_mut().insert(current);
    Ok(next.run(request).await)
}

/// Middleware: like [`require_login`], and the caller must be an admin
pub async fn require_admin(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let current = lookup(&state, request.headers())
        .await?
        .ok_or_else(|| login_required(requested_uri(&request)))?;

    if !current.user.is_admin {
        debug!("User {} denied admin route {}", current.user.id, request.uri().path());
        return Err(ApiError::Forbidden("Administrator access required".to_string()));
    }

    request.extensions_mut().insert(current);
    Ok(next.run(request).await)
}

#[axum::async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        if let Some(current) = parts.extensions.get::<CurrentUser>() {
            return Ok(current.clone());
        }

        lookup(state, &parts.headers)
            .await?
            .ok_or_else(|| login_required(&parts.uri))
    }
}

#[axum::async_trait]
impl FromRequestParts<AppState> for MaybeUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        if let Some(current) = parts.extensions.get::<CurrentUser>() {
            return Ok(MaybeUser(Some(current.clone())));
        }

        Ok(MaybeUser(lookup(state, &parts.headers).await?))
    }
}

#[axum::async_trait]
impl FromRequestParts<AppState> for AdminUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let current = CurrentUser::from_request_parts(parts, state).await?;
        if !current.user.is_admin {
            return Err(ApiError::Forbidden("Administrator access required".to_string()));
        }
        Ok(AdminUser(current))
    }
}

//! suzuani-web library: the SuzuAni catalog HTTP service
//!
//! Anonymous callers reach health, account and static routes only. The
//! catalog, social and profile routes sit behind [`session::require_login`];
//! everything under `/admin` sits behind [`session::require_admin`].

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::{middleware, Router};
use sqlx::SqlitePool;
use suzuani_common::config::MailConfig;
use suzuani_common::mail::Mailer;
use tower::ServiceBuilder;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod db;
pub mod error;
pub mod pagination;
pub mod session;
pub mod uploads;

pub use error::{ApiError, ApiResult};

use uploads::UploadStore;

/// Room for multipart framing and text fields around the largest upload
const BODY_LIMIT_SLACK: usize = 64 * 1024;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// Signing key for password reset tokens
    pub secret_key: Arc<str>,
    /// Outgoing mail (OTP and reset messages)
    pub mailer: Arc<dyn Mailer>,
    pub mail: MailConfig,
    pub uploads: UploadStore,
}

impl AppState {
    pub fn new(
        db: SqlitePool,
        secret_key: impl Into<Arc<str>>,
        mailer: Arc<dyn Mailer>,
        mail: MailConfig,
        uploads: UploadStore,
    ) -> Self {
        Self {
            db,
            secret_key: secret_key.into(),
            mailer,
            mail,
            uploads,
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    let body_limit = state.uploads.max_bytes() + BODY_LIMIT_SLACK;

    // Routes requiring a logged-in user
    let protected = Router::new()
        .merge(api::catalog_routes())
        .merge(api::social_routes())
        .merge(api::profile_routes())
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            session::require_login,
        ));

    // Routes requiring an administrator
    let admin = Router::new()
        .nest("/admin", api::admin_routes())
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            session::require_admin,
        ));

    // Public routes (no authentication)
    let public = Router::new()
        .merge(api::health_routes())
        .merge(api::account_routes())
        .nest_service("/static", ServeDir::new(state.uploads.static_root()));

    Router::new()
        .merge(protected)
        .merge(admin)
        .merge(public)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(DefaultBodyLimit::max(body_limit)),
        )
        .with_state(state)
}

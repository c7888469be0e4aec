//! Error types for suzuani-web
//!
//! Every handler returns [`ApiResult`]. Errors render as
//! `{"error": {"code": "...", "message": "..."}}`, with an extra `fields`
//! object for validation failures.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::error;

/// Per-field validation messages, keyed by form field name
pub type FieldErrors = BTreeMap<String, String>;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Resource not found (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Form validation failed (422)
    #[error("Validation failed")]
    Validation(FieldErrors),

    /// No valid session (401)
    #[error("Authentication required")]
    Unauthorized {
        message: String,
        login_url: Option<String>,
    },

    /// Authenticated but not allowed (403)
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Conflict (409), e.g. duplicate comment, category still in use
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Upload too large (413)
    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error(transparent)]
    Other(#[from] anyhow::Error),

    /// suzuani-common error
    #[error("Common error: {0}")]
    Common(#[from] suzuani_common::Error),
}

impl ApiError {
    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::Unauthorized {
            message: message.into(),
            login_url: None,
        }
    }

    /// Single-field validation failure
    pub fn invalid_field(field: &str, message: impl Into<String>) -> Self {
        let mut fields = FieldErrors::new();
        fields.insert(field.to_string(), message.into());
        ApiError::Validation(fields)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            ApiError::Validation(fields) => {
                let body = Json(json!({
                    "error": {
                        "code": "VALIDATION_ERROR",
                        "message": "Please correct the highlighted fields.",
                        "fields": fields,
                    }
                }));
                return (StatusCode::UNPROCESSABLE_ENTITY, body).into_response();
            }
            ApiError::Unauthorized { message, login_url } => {
                let body = Json(json!({
                    "error": {
                        "code": "UNAUTHORIZED",
                        "message": message,
                        "login_url": login_url,
                    }
                }));
                return (StatusCode::UNAUTHORIZED, body).into_response();
            }
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, "FORBIDDEN", msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg),
            ApiError::PayloadTooLarge(msg) => (StatusCode::PAYLOAD_TOO_LARGE, "PAYLOAD_TOO_LARGE", msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", msg),
            ApiError::Database(ref err) => {
                error!("Database error: {}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "DATABASE_ERROR",
                    "Database error".to_string(),
                )
            }
            ApiError::Io(ref err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "IO_ERROR",
                err.to_string(),
            ),
            ApiError::Other(ref err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                err.to_string(),
            ),
            ApiError::Common(err) => return common_error_response(err),
        };

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

fn common_error_response(err: suzuani_common::Error) -> Response {
    use suzuani_common::Error as CommonError;

    match err {
        CommonError::NotFound(msg) => ApiError::NotFound(msg).into_response(),
        CommonError::InvalidInput(msg) => ApiError::BadRequest(msg).into_response(),
        CommonError::Conflict(msg) => ApiError::Conflict(msg).into_response(),
        CommonError::Database(e) => ApiError::Database(e).into_response(),
        CommonError::Io(e) => ApiError::Io(e).into_response(),
        other => ApiError::Internal(other.to_string()).into_response(),
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;

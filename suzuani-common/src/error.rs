//! Common error types for SuzuAni

use thiserror::Error;

/// Common result type for SuzuAni operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types shared by the library and the web service
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation error (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Requested resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Uniqueness or referential constraint would be violated
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Map constraint violations reported by SQLite to `Conflict`, leave everything else alone
    pub fn from_constraint(err: sqlx::Error, context: &str) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.is_unique_violation() || db_err.is_foreign_key_violation() {
                return Error::Conflict(format!("{}: {}", context, db_err.message()));
            }
        }
        Error::Database(err)
    }
}

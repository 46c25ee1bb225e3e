//! Error types for devcloud.

use thiserror::Error;

/// Common error type for devcloud.
#[derive(Error, Debug)]
pub enum DevcloudError {
    /// Database error.
    ///
    /// Database errors from sqlx are automatically converted.
    #[error("database error: {0}")]
    Database(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Authentication error.
    #[error("authentication error: {0}")]
    Auth(String),

    /// Permission denied error.
    #[error("permission denied: {0}")]
    Permission(String),

    /// Validation error for user input.
    #[error("validation error: {0}")]
    Validation(String),

    /// Resource not found.
    #[error("{0} not found")]
    NotFound(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

impl From<sqlx::Error> for DevcloudError {
    fn from(e: sqlx::Error) -> Self {
        DevcloudError::Database(e.to_string())
    }
}

/// Result type alias for devcloud operations.
pub type Result<T> = std::result::Result<T, DevcloudError>;

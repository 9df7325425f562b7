use thiserror::Error;

use crate::storage::StorageError;

/// Errors surfaced by process bootstrap and the provisioning commands.
///
/// Per-update failures never reach this type; the workflow engine logs them
/// and answers the user itself.
#[derive(Error, Debug)]
pub enum AppError {
    /// Storage gateway errors
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Database connection pool errors
    #[error("Database pool error: {0}")]
    DatabasePool(#[from] r2d2::Error),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// URL parsing errors
    #[error("URL parsing error: {0}")]
    Url(#[from] url::ParseError),

    /// Missing or malformed configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Provisioning lookups that found nothing
    #[error("Not found: {0}")]
    NotFound(String),
}

/// Type alias for Result with AppError
pub type AppResult<T> = Result<T, AppError>;

//! Shared error and result types for Bindery

use thiserror::Error;

/// Service-wide error type
#[derive(Debug, Error)]
pub enum BinderyError {
    /// MongoDB connection or query failure
    #[error("database error: {0}")]
    Database(String),

    /// Invalid or incomplete configuration
    #[error("configuration error: {0}")]
    Config(String),

    /// Rate book could not be loaded or parsed
    #[error("rate book error: {0}")]
    RateBook(String),

    /// Client sent a malformed or incomplete request
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Requested record does not exist
    #[error("not found: {0}")]
    NotFound(String),

    /// Record already exists (e.g. duplicate policy number)
    #[error("conflict: {0}")]
    Conflict(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, BinderyError>;

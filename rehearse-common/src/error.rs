//! Common error types for Rehearse

use thiserror::Error;

/// Common result type for Rehearse operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across the Rehearse service and client
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation error (wraps sqlx::Error)
    #[cfg(feature = "sqlx")]
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

    /// Session lifecycle rule violated (e.g. finishing twice, changing mode)
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),

    /// No user identity available for a per-user operation
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Model call or model output parse failure
    #[error("Generation failed: {0}")]
    Generation(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

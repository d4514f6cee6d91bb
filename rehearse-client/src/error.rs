//! Client error classification
//!
//! Every failure a front-end can see lands in one of these variants, so
//! callers can decide between re-authenticating, redirecting, offering a
//! retry or showing a diagnostic.

use thiserror::Error;

/// Result type for client operations
pub type ClientResult<T> = Result<T, ClientError>;

#[derive(Debug, Error)]
pub enum ClientError {
    /// Token missing, expired or rejected; the user must sign in again
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Session (or question) does not exist for this user
    #[error("Not found: {0}")]
    NotFound(String),

    /// Model call failed or returned unusable output
    #[error("Generation failed: {0}")]
    Generation(String),

    /// Server store is misconfigured; carries the server's diagnostic hint
    #[error("Store configuration: {0}")]
    StoreConfig(String),

    /// Backend unreachable (no HTTP response at all)
    #[error("Network error: {0}")]
    Network(String),

    /// Backend answered with an unclassified HTTP error
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    /// Operation not allowed in the current session or controller state
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Guest local storage could not be read or written
    #[error("Local storage error: {0}")]
    Storage(String),

    /// Live streaming connection failed
    #[error("Live transport error: {0}")]
    Transport(String),

    /// Missing or invalid client configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

impl ClientError {
    /// Whether repeating the same operation may succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            ClientError::Generation(_) | ClientError::Network(_) | ClientError::Transport(_) => {
                true
            }
            ClientError::Http { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

impl From<rehearse_common::Error> for ClientError {
    fn from(err: rehearse_common::Error) -> Self {
        use rehearse_common::Error;

        match err {
            Error::NotFound(msg) => ClientError::NotFound(msg),
            Error::InvalidInput(msg) | Error::InvalidTransition(msg) => {
                ClientError::InvalidState(msg)
            }
            Error::Unauthorized(msg) => ClientError::Unauthorized(msg),
            Error::Generation(msg) => ClientError::Generation(msg),
            Error::Config(msg) => ClientError::Config(msg),
            Error::Io(e) => ClientError::Storage(e.to_string()),
            other => ClientError::Storage(other.to_string()),
        }
    }
}

//! Error types for rehearse-api

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use rehearse_common::api::{codes, ErrorBody};
use thiserror::Error;
use tracing::{error, warn};

use crate::store;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// No valid identity for a per-user operation (401)
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Resource not found (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Conflict (409), e.g. finishing a completed session
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Model call or output failure (500)
    #[error("Generation failed: {0}")]
    Generation(String),

    /// Store misconfiguration with an actionable hint (500)
    #[error("Store configuration: {0}")]
    StoreConfig(String),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl From<rehearse_common::Error> for ApiError {
    fn from(err: rehearse_common::Error) -> Self {
        use rehearse_common::Error;

        match err {
            Error::Database(db_err) => match store::configuration_hint(&db_err) {
                Some(hint) => ApiError::StoreConfig(hint),
                None => ApiError::Internal(format!("Database error: {}", db_err)),
            },
            Error::InvalidInput(msg) => ApiError::BadRequest(msg),
            Error::InvalidTransition(msg) => ApiError::Conflict(msg),
            Error::NotFound(msg) => ApiError::NotFound(msg),
            Error::Unauthorized(msg) => ApiError::Unauthorized(msg),
            Error::Generation(msg) => ApiError::Generation(msg),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl ApiError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, codes::UNAUTHORIZED),
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, codes::NOT_FOUND),
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, codes::BAD_REQUEST),
            ApiError::Conflict(_) => (StatusCode::CONFLICT, codes::CONFLICT),
            ApiError::Generation(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, codes::GENERATION_ERROR)
            }
            ApiError::StoreConfig(_) => (StatusCode::INTERNAL_SERVER_ERROR, codes::STORE_CONFIG),
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, codes::INTERNAL_ERROR),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        if status.is_server_error() {
            error!(code, "{}", self);
        } else {
            warn!(code, "{}", self);
        }

        let message = match self {
            ApiError::Unauthorized(msg)
            | ApiError::NotFound(msg)
            | ApiError::BadRequest(msg)
            | ApiError::Conflict(msg)
            | ApiError::Generation(msg)
            | ApiError::StoreConfig(msg)
            | ApiError::Internal(msg) => msg,
        };

        (status, Json(ErrorBody::new(code, message))).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;

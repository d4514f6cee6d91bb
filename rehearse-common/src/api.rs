//! Shared API request/response types
//!
//! Used by the API service for (de)serializing requests and by the client's
//! remote backend for building them.

use serde::{Deserialize, Serialize};

use crate::models::{InterviewSession, TranscriptEntry};

/// Header prefix for bearer-token authentication
pub const BEARER_PREFIX: &str = "Bearer ";

/// POST /api/sessions/:id/answer
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitAnswerRequest {
    pub question_index: usize,
    pub answer: String,
}

/// POST /api/sessions/:id/finish
///
/// Live sessions may hand over the final transcript; when absent the stored
/// transcript is reviewed.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct FinishRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transcript: Option<Vec<TranscriptEntry>>,
}

/// POST /api/sessions/import
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ImportRequest {
    pub session: InterviewSession,
}

/// Machine-readable error codes carried in [`ErrorBody`]
pub mod codes {
    pub const UNAUTHORIZED: &str = "UNAUTHORIZED";
    pub const NOT_FOUND: &str = "NOT_FOUND";
    pub const BAD_REQUEST: &str = "BAD_REQUEST";
    pub const CONFLICT: &str = "CONFLICT";
    pub const GENERATION_ERROR: &str = "GENERATION_ERROR";
    pub const STORE_CONFIG: &str = "STORE_CONFIG";
    pub const IDENTITY_UNAVAILABLE: &str = "IDENTITY_UNAVAILABLE";
    pub const INTERNAL_ERROR: &str = "INTERNAL_ERROR";
}

/// Error response body: `{"error": {"code": ..., "message": ...}}`
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}

impl ErrorBody {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ErrorDetail {
                code: code.into(),
                message: message.into(),
            },
        }
    }
}

/// GET /api/health
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub module: String,
    pub version: String,
    pub uptime_seconds: u64,
}

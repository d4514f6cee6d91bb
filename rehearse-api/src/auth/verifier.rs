//! Identity-provider token verification

use async_trait::async_trait;
use rehearse_common::config::IdentityConfig;
use rehearse_common::{Error, Result};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use super::VerifiedUser;

/// Why a token could not be verified
#[derive(Debug, Error)]
pub enum VerifyError {
    /// Token is malformed, expired or revoked
    #[error("invalid token: {0}")]
    InvalidToken(String),

    /// Identity provider could not be reached or answered unexpectedly
    #[error("identity provider unavailable: {0}")]
    Unavailable(String),
}

/// Resolves a bearer token to the user it belongs to
#[async_trait]
pub trait TokenVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> std::result::Result<VerifiedUser, VerifyError>;
}

#[derive(Debug, Deserialize)]
struct LookupResponse {
    #[serde(default)]
    users: Vec<LookupUser>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LookupUser {
    local_id: String,
    email: Option<String>,
}

/// Verifies ID tokens against the Identity Toolkit `accounts:lookup` endpoint
pub struct IdentityToolkitVerifier {
    http_client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl IdentityToolkitVerifier {
    pub fn new(base_url: &str, api_key: &str) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| Error::Internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }

    pub fn from_config(config: &IdentityConfig) -> Result<Self> {
        let api_key = config.api_key.as_deref().ok_or_else(|| {
            Error::Config(format!(
                "identity provider API key is not configured (set {} or [identity] api_key)",
                rehearse_common::config::ENV_IDENTITY_API_KEY
            ))
        })?;
        Self::new(&config.base_url, api_key)
    }
}

#[async_trait]
impl TokenVerifier for IdentityToolkitVerifier {
    async fn verify(&self, token: &str) -> std::result::Result<VerifiedUser, VerifyError> {
        let response = self
            .http_client
            .post(format!("{}/v1/accounts:lookup", self.base_url))
            .query(&[("key", self.api_key.as_str())])
            .json(&json!({ "idToken": token }))
            .send()
            .await
            .map_err(|e| VerifyError::Unavailable(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::BAD_REQUEST || status == reqwest::StatusCode::UNAUTHORIZED
        {
            let body = response.text().await.unwrap_or_default();
            debug!(%status, "Identity provider rejected token");
            return Err(VerifyError::InvalidToken(body));
        }
        if !status.is_success() {
            return Err(VerifyError::Unavailable(format!(
                "lookup returned status {}",
                status
            )));
        }

        let lookup: LookupResponse = response
            .json()
            .await
            .map_err(|e| VerifyError::Unavailable(format!("unreadable lookup response: {}", e)))?;

        lookup
            .users
            .into_iter()
            .next()
            .filter(|user| !user.local_id.is_empty())
            .map(|user| VerifiedUser {
                uid: user.local_id,
                email: user.email,
            })
            .ok_or_else(|| VerifyError::InvalidToken("token does not belong to a user".to_string()))
    }
}

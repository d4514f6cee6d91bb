//! Identity resolution and backend selection
//!
//! The identity is resolved once, before a session starts. If no answer
//! arrives within [`AUTH_TIMEOUT`] the client carries on as a guest.

use async_trait::async_trait;
use rehearse_common::config::ClientConfig;
use rehearse_common::model::InterviewModel;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::backend::{GuestBackend, LocalStorage, RemoteBackend, SessionBackend};
use crate::error::{ClientError, ClientResult};

/// Upper bound on waiting for the identity provider
pub const AUTH_TIMEOUT: Duration = Duration::from_secs(10);

/// Supplies the signed-in user's ID token
#[async_trait]
pub trait TokenSource: Send + Sync {
    /// `Ok(None)` when nobody is signed in
    async fn id_token(&self) -> ClientResult<Option<String>>;
}

/// A token fixed at startup (CLI flag, environment or config file)
#[derive(Debug, Clone, Default)]
pub struct StaticToken(pub Option<String>);

#[async_trait]
impl TokenSource for StaticToken {
    async fn id_token(&self) -> ClientResult<Option<String>> {
        Ok(self.0.clone())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identity {
    Guest,
    SignedIn { token: String },
}

/// Resolve the current identity, degrading to guest on error or timeout
pub async fn resolve_identity(source: &dyn TokenSource, timeout: Duration) -> Identity {
    match tokio::time::timeout(timeout, source.id_token()).await {
        Ok(Ok(Some(token))) if !token.trim().is_empty() => {
            info!("Signed in, sessions are stored remotely");
            Identity::SignedIn { token }
        }
        Ok(Ok(_)) => {
            info!("Not signed in, using guest storage");
            Identity::Guest
        }
        Ok(Err(e)) => {
            warn!("Identity lookup failed, continuing as guest: {}", e);
            Identity::Guest
        }
        Err(_) => {
            warn!(
                "Identity lookup timed out after {:?}, continuing as guest",
                timeout
            );
            Identity::Guest
        }
    }
}

/// Pick the storage backend for a resolved identity
///
/// Guests call the model directly, so they need `guest_model`.
pub fn select_backend(
    identity: &Identity,
    config: &ClientConfig,
    guest_model: Option<InterviewModel>,
) -> ClientResult<Arc<dyn SessionBackend>> {
    match identity {
        Identity::SignedIn { token } => {
            Ok(Arc::new(RemoteBackend::new(&config.api_base_url, token.clone())?))
        }
        Identity::Guest => {
            let model = guest_model.ok_or_else(|| {
                ClientError::Config(
                    "guest mode calls the model directly and needs a model API key".to_string(),
                )
            })?;
            Ok(Arc::new(GuestBackend::new(
                LocalStorage::new(&config.guest_storage),
                model,
            )))
        }
    }
}

//! Moving a guest session into the signed-in account

use rehearse_common::models::InterviewSession;
use tracing::{info, warn};

use crate::backend::{LocalStorage, RemoteBackend};
use crate::error::ClientResult;

/// Import the stored guest session, then clear it locally
///
/// Local storage is only cleared after the import succeeded, so a failed
/// import can be retried. Returns the imported session, or `None` when there
/// was nothing to import.
pub async fn adopt_guest_session(
    storage: &LocalStorage,
    remote: &RemoteBackend,
) -> ClientResult<Option<InterviewSession>> {
    let Some(guest) = storage.load_guest_session().await? else {
        return Ok(None);
    };

    let imported = match remote.import(&guest).await {
        Ok(imported) => imported,
        Err(e) => {
            warn!(session_id = %guest.id, "Guest session import failed: {}", e);
            return Err(e);
        }
    };
    storage.clear_guest_session().await?;

    info!(session_id = %imported.id, "Guest session moved to account");
    Ok(Some(imported))
}

//! Signed-out storage: one session in a local key/value file
//!
//! Every mutation rewrites the whole session under [`GUEST_SESSION_KEY`];
//! the last write wins and history is that single session.

use async_trait::async_trait;
use rehearse_common::model::InterviewModel;
use rehearse_common::models::{InterviewSession, SessionMode, SessionSetup, TranscriptEntry};
use rehearse_common::session;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use uuid::Uuid;

use super::{BackendKind, SessionBackend};
use crate::error::{ClientError, ClientResult};

/// Key holding the guest session
pub const GUEST_SESSION_KEY: &str = "rehearse.guest-session";

/// JSON object file used as a string-keyed store
#[derive(Debug, Clone)]
pub struct LocalStorage {
    path: PathBuf,
}

impl LocalStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_all(&self) -> ClientResult<Map<String, Value>> {
        let text = match tokio::fs::read_to_string(&self.path).await {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Map::new()),
            Err(e) => {
                return Err(ClientError::Storage(format!(
                    "Failed to read {}: {}",
                    self.path.display(),
                    e
                )))
            }
        };
        if text.trim().is_empty() {
            return Ok(Map::new());
        }
        serde_json::from_str(&text).map_err(|e| {
            ClientError::Storage(format!("{} is not a JSON object: {}", self.path.display(), e))
        })
    }

    /// Write via a temporary file and rename so readers never see half a file
    async fn write_all(&self, items: &Map<String, Value>) -> ClientResult<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| ClientError::Storage(e.to_string()))?;
        }
        let text = serde_json::to_string_pretty(items)
            .map_err(|e| ClientError::Storage(e.to_string()))?;

        let tmp = self.path.with_extension("tmp");
        tokio::fs::write(&tmp, text)
            .await
            .map_err(|e| ClientError::Storage(format!("Failed to write {}: {}", tmp.display(), e)))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| ClientError::Storage(format!("Failed to replace {}: {}", self.path.display(), e)))
    }

    pub async fn get_item(&self, key: &str) -> ClientResult<Option<Value>> {
        Ok(self.read_all().await?.remove(key))
    }

    pub async fn set_item(&self, key: &str, value: Value) -> ClientResult<()> {
        let mut items = self.read_all().await?;
        items.insert(key.to_string(), value);
        self.write_all(&items).await
    }

    pub async fn remove_item(&self, key: &str) -> ClientResult<()> {
        let mut items = self.read_all().await?;
        if items.remove(key).is_some() {
            self.write_all(&items).await?;
        }
        Ok(())
    }

    /// The stored guest session, if any
    pub async fn load_guest_session(&self) -> ClientResult<Option<InterviewSession>> {
        match self.get_item(GUEST_SESSION_KEY).await? {
            Some(value) => serde_json::from_value(value)
                .map(Some)
                .map_err(|e| ClientError::Storage(format!("Stored guest session is unreadable: {}", e))),
            None => Ok(None),
        }
    }

    pub async fn store_guest_session(&self, session: &InterviewSession) -> ClientResult<()> {
        let value =
            serde_json::to_value(session).map_err(|e| ClientError::Storage(e.to_string()))?;
        self.set_item(GUEST_SESSION_KEY, value).await
    }

    pub async fn clear_guest_session(&self) -> ClientResult<()> {
        self.remove_item(GUEST_SESSION_KEY).await
    }
}

/// Session backend for users who are not signed in
pub struct GuestBackend {
    storage: LocalStorage,
    model: InterviewModel,
}

impl GuestBackend {
    pub fn new(storage: LocalStorage, model: InterviewModel) -> Self {
        Self { storage, model }
    }

    async fn load(&self, id: &str) -> ClientResult<InterviewSession> {
        match self.storage.load_guest_session().await? {
            Some(session) if session.id == id => Ok(session),
            _ => Err(ClientError::NotFound(format!("Session not found: {}", id))),
        }
    }
}

#[async_trait]
impl SessionBackend for GuestBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Guest
    }

    async fn create(&self, setup: SessionSetup) -> ClientResult<InterviewSession> {
        if setup.job_title.trim().is_empty() {
            return Err(ClientError::InvalidState("job title is required".to_string()));
        }

        let questions = match setup.mode {
            SessionMode::Classic => self.model.generate_questions(&setup).await?,
            SessionMode::Live => Vec::new(),
        };
        let session = session::new_session(Uuid::new_v4().to_string(), setup, questions, None);
        self.storage.store_guest_session(&session).await?;

        info!(session_id = %session.id, mode = ?session.mode, "Created guest session");
        Ok(session)
    }

    async fn get(&self, id: &str) -> ClientResult<InterviewSession> {
        self.load(id).await
    }

    async fn list(&self) -> ClientResult<Vec<InterviewSession>> {
        Ok(self.storage.load_guest_session().await?.into_iter().collect())
    }

    async fn submit_answer(
        &self,
        id: &str,
        question_index: usize,
        answer: &str,
    ) -> ClientResult<InterviewSession> {
        if answer.trim().is_empty() {
            return Err(ClientError::InvalidState("answer must not be empty".to_string()));
        }

        let mut session = self.load(id).await?;
        let question = session::check_answerable(&session, question_index)?.clone();
        let feedback = self.model.evaluate_answer(&session, &question, answer).await?;
        session::record_answer(&mut session, question_index, answer.to_string(), feedback)?;
        self.storage.store_guest_session(&session).await?;

        debug!(session_id = %id, question = question_index, "Recorded guest answer");
        Ok(session)
    }

    async fn save(&self, session: &InterviewSession) -> ClientResult<InterviewSession> {
        match self.storage.load_guest_session().await? {
            Some(before) if before.id == session.id => session::validate_update(&before, session)?,
            _ => session::check_invariants(session)?,
        }
        self.storage.store_guest_session(session).await?;
        Ok(session.clone())
    }

    async fn finish(
        &self,
        id: &str,
        transcript: Option<Vec<TranscriptEntry>>,
    ) -> ClientResult<InterviewSession> {
        let mut session = self.load(id).await?;
        if session.is_completed() {
            return Err(ClientError::InvalidState(format!(
                "Session {} is already completed",
                id
            )));
        }

        match session.mode {
            SessionMode::Classic => session::complete_classic(&mut session)?,
            SessionMode::Live => {
                let transcript = transcript.unwrap_or_else(|| session.transcript.clone());
                let review = self.model.review_live_session(&session, &transcript).await?;
                session::complete_live(&mut session, transcript, review)?;
            }
        }
        self.storage.store_guest_session(&session).await?;

        info!(session_id = %id, "Finished guest session");
        Ok(session)
    }
}

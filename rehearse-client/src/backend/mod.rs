//! Session storage backends
//!
//! A controller talks to exactly one [`SessionBackend`], chosen once from the
//! resolved identity: [`GuestBackend`] keeps a single session on disk and
//! calls the model directly, [`RemoteBackend`] goes through the API service.

pub mod guest;
pub mod remote;

use async_trait::async_trait;
use rehearse_common::models::{InterviewSession, SessionSetup, TranscriptEntry};

use crate::error::ClientResult;

pub use guest::{GuestBackend, LocalStorage, GUEST_SESSION_KEY};
pub use remote::RemoteBackend;

/// Where sessions live for the current user
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Guest,
    Remote,
}

#[async_trait]
pub trait SessionBackend: Send + Sync {
    fn kind(&self) -> BackendKind;

    /// Start a session; classic sessions come back with their questions
    async fn create(&self, setup: SessionSetup) -> ClientResult<InterviewSession>;

    async fn get(&self, id: &str) -> ClientResult<InterviewSession>;

    /// Sessions visible to the user, newest first
    async fn list(&self) -> ClientResult<Vec<InterviewSession>>;

    /// Evaluate an answer to the active question and advance
    async fn submit_answer(
        &self,
        id: &str,
        question_index: usize,
        answer: &str,
    ) -> ClientResult<InterviewSession>;

    /// Persist a modified session; the live controller saves its growing
    /// transcript this way after every model turn
    async fn save(&self, session: &InterviewSession) -> ClientResult<InterviewSession>;

    /// Complete a session; live sessions may hand over the final transcript
    async fn finish(
        &self,
        id: &str,
        transcript: Option<Vec<TranscriptEntry>>,
    ) -> ClientResult<InterviewSession>;
}

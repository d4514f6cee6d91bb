//! Transcript accumulation task
//!
//! The live stream delivers transcription in fragments. One task owns the
//! transcript; everyone else sends it events over a channel.

use rehearse_common::models::{Speaker, TranscriptEntry};
use rehearse_common::session::append_transcript;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::error::{ClientError, ClientResult};

const CHANNEL_CAPACITY: usize = 256;

enum TranscriptEvent {
    Chunk { speaker: Speaker, text: String },
    Snapshot(oneshot::Sender<Vec<TranscriptEntry>>),
}

/// Sending side of the transcript task
#[derive(Clone)]
pub struct TranscriptHandle {
    tx: mpsc::Sender<TranscriptEvent>,
}

impl TranscriptHandle {
    /// Spawn the task; it ends once every handle is dropped
    pub fn spawn() -> (Self, JoinHandle<Vec<TranscriptEntry>>) {
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let task = tokio::spawn(run(rx));
        (Self { tx }, task)
    }

    /// Record a fragment; continues the previous entry for the same speaker
    pub async fn append(&self, speaker: Speaker, text: impl Into<String>) -> ClientResult<()> {
        self.tx
            .send(TranscriptEvent::Chunk {
                speaker,
                text: text.into(),
            })
            .await
            .map_err(|_| ClientError::InvalidState("transcript task has stopped".to_string()))
    }

    /// Current transcript, including every fragment sent before this call
    pub async fn snapshot(&self) -> ClientResult<Vec<TranscriptEntry>> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(TranscriptEvent::Snapshot(reply_tx))
            .await
            .map_err(|_| ClientError::InvalidState("transcript task has stopped".to_string()))?;
        reply_rx
            .await
            .map_err(|_| ClientError::InvalidState("transcript task has stopped".to_string()))
    }
}

async fn run(mut rx: mpsc::Receiver<TranscriptEvent>) -> Vec<TranscriptEntry> {
    let mut entries = Vec::new();
    while let Some(event) = rx.recv().await {
        match event {
            TranscriptEvent::Chunk { speaker, text } => {
                append_transcript(&mut entries, speaker, &text)
            }
            TranscriptEvent::Snapshot(reply) => {
                let _ = reply.send(entries.clone());
            }
        }
    }
    entries
}

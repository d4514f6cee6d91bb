//! Live (streaming conversation) session controller
//!
//! ```text
//! Idle -> RequestingPermissions -> Ready -> Active -> Ending -> Completed
//! ```
//!
//! While active, one streaming task forwards captured media to the model and
//! routes everything the model sends back: audio into the [`PlaybackQueue`],
//! transcription into the transcript task. The transcript is saved to the
//! backend at the end of every model turn. Ending cancels the stream, waits
//! for the task to release media and transport, then hands the final
//! transcript to the backend for review.

pub mod audio;
pub mod media;
pub mod playback;
pub mod transcript;
pub mod transport;

use rehearse_common::model::prompts::live_system_instruction;
use rehearse_common::models::{InterviewSession, SessionMode, SessionSetup, Speaker, TranscriptEntry};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::backend::SessionBackend;
use crate::error::{ClientError, ClientResult};
use media::{MediaChunk, MediaSource};
use playback::{AudioOutput, PlaybackQueue};
use transcript::TranscriptHandle;
use transport::{LiveConnector, LiveSetup, LiveTransport, RealtimeInput, ServerEvent};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiveState {
    Idle,
    RequestingPermissions,
    Ready,
    Active,
    Ending,
    Completed,
}

/// Devices handed to the streaming task and returned when it stops
struct Devices {
    media: Box<dyn MediaSource>,
    output: Box<dyn AudioOutput>,
}

/// How the streaming task ended
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEnd {
    /// Ended by the controller
    Cancelled,
    /// The server closed the stream
    Closed,
    /// The stream failed
    Failed(String),
}

struct ActiveStream {
    cancel: CancellationToken,
    task: JoinHandle<(Devices, StreamEnd)>,
}

pub struct LiveController {
    backend: Arc<dyn SessionBackend>,
    connector: Arc<dyn LiveConnector>,
    live_model: String,
    state: LiveState,
    session: Option<InterviewSession>,
    devices: Option<Devices>,
    stream: Option<ActiveStream>,
    transcript: Option<TranscriptHandle>,
    /// Snapshot taken while ending, kept so a failed finish can be retried
    final_transcript: Option<Vec<TranscriptEntry>>,
}

impl LiveController {
    pub fn new(
        backend: Arc<dyn SessionBackend>,
        connector: Arc<dyn LiveConnector>,
        live_model: impl Into<String>,
        media: Box<dyn MediaSource>,
        output: Box<dyn AudioOutput>,
    ) -> Self {
        Self {
            backend,
            connector,
            live_model: live_model.into(),
            state: LiveState::Idle,
            session: None,
            devices: Some(Devices { media, output }),
            stream: None,
            transcript: None,
            final_transcript: None,
        }
    }

    pub fn state(&self) -> LiveState {
        self.state
    }

    pub fn session(&self) -> Option<&InterviewSession> {
        self.session.as_ref()
    }

    fn require(&self, expected: LiveState, action: &str) -> ClientResult<()> {
        if self.state != expected {
            return Err(ClientError::InvalidState(format!(
                "cannot {} while {:?}",
                action, self.state
            )));
        }
        Ok(())
    }

    /// Create the live session record
    pub async fn create(&mut self, mut setup: SessionSetup) -> ClientResult<&InterviewSession> {
        self.require(LiveState::Idle, "create a session")?;
        if self.session.is_some() {
            return Err(ClientError::InvalidState("a session is already loaded".to_string()));
        }
        setup.mode = SessionMode::Live;
        let session = self.backend.create(setup).await?;
        info!(session_id = %session.id, "Live session created");
        Ok(self.session.insert(session))
    }

    /// Ask for microphone/camera access
    pub async fn prepare(&mut self) -> ClientResult<()> {
        self.require(LiveState::Idle, "request permissions")?;
        if self.session.is_none() {
            return Err(ClientError::InvalidState("create a session first".to_string()));
        }
        let devices = self
            .devices
            .as_mut()
            .ok_or_else(|| ClientError::InvalidState("media devices are in use".to_string()))?;

        self.state = LiveState::RequestingPermissions;
        match devices.media.request_permissions().await {
            Ok(()) => {
                self.state = LiveState::Ready;
                Ok(())
            }
            Err(e) => {
                warn!("Media permissions refused: {}", e);
                self.state = LiveState::Idle;
                Err(e)
            }
        }
    }

    /// Open the stream and start forwarding media
    pub async fn start(&mut self) -> ClientResult<()> {
        self.require(LiveState::Ready, "start streaming")?;
        let session = self
            .session
            .as_ref()
            .ok_or_else(|| ClientError::InvalidState("no session loaded".to_string()))?;

        let setup = LiveSetup {
            model: self.live_model.clone(),
            system_instruction: live_system_instruction(session),
        };
        let transport = self.connector.connect(&setup).await?;
        let devices = self
            .devices
            .take()
            .ok_or_else(|| ClientError::InvalidState("media devices are in use".to_string()))?;

        let (transcript, _transcript_task) = TranscriptHandle::spawn();
        let checkpoint = Checkpoint {
            backend: self.backend.clone(),
            session: session.clone(),
        };
        let cancel = CancellationToken::new();
        let task = tokio::spawn(run_stream(
            devices,
            transport,
            transcript.clone(),
            checkpoint,
            cancel.clone(),
        ));

        info!(session_id = %session.id, "Live session active");
        self.transcript = Some(transcript);
        self.stream = Some(ActiveStream { cancel, task });
        self.state = LiveState::Active;
        Ok(())
    }

    /// Whether the streaming task is still running
    pub fn is_streaming(&self) -> bool {
        self.stream
            .as_ref()
            .is_some_and(|stream| !stream.task.is_finished())
    }

    /// Transcript accumulated so far
    pub async fn transcript(&self) -> ClientResult<Vec<TranscriptEntry>> {
        if let Some(final_transcript) = &self.final_transcript {
            return Ok(final_transcript.clone());
        }
        match &self.transcript {
            Some(handle) => handle.snapshot().await,
            None => Ok(Vec::new()),
        }
    }

    /// Stop streaming and request the session review
    ///
    /// If the review fails the controller stays in `Ending` and `end` can be
    /// called again.
    pub async fn end(&mut self) -> ClientResult<&InterviewSession> {
        match self.state {
            LiveState::Active => self.stop_stream().await?,
            LiveState::Ending => {}
            other => {
                return Err(ClientError::InvalidState(format!(
                    "cannot end a session while {:?}",
                    other
                )))
            }
        }

        let id = match &self.session {
            Some(session) => session.id.clone(),
            None => return Err(ClientError::InvalidState("no session loaded".to_string())),
        };
        let transcript = self.final_transcript.clone().unwrap_or_default();

        let finished = self.backend.finish(&id, Some(transcript)).await?;
        info!(session_id = %id, "Live session completed");

        self.final_transcript = None;
        self.state = LiveState::Completed;
        Ok(self.session.insert(finished))
    }

    async fn stop_stream(&mut self) -> ClientResult<()> {
        self.state = LiveState::Ending;

        if let Some(stream) = self.stream.take() {
            stream.cancel.cancel();
            match stream.task.await {
                Ok((devices, end)) => {
                    debug!(?end, "Streaming task stopped");
                    self.devices = Some(devices);
                }
                Err(e) => warn!("Streaming task panicked: {}", e),
            }
        }

        let transcript = match self.transcript.take() {
            Some(handle) => handle.snapshot().await?,
            None => Vec::new(),
        };
        self.final_transcript = Some(transcript);
        Ok(())
    }
}

impl Drop for LiveController {
    fn drop(&mut self) {
        if let Some(stream) = &self.stream {
            stream.cancel.cancel();
        }
    }
}

/// Last saved copy of the session, used to persist the transcript mid-stream
struct Checkpoint {
    backend: Arc<dyn SessionBackend>,
    session: InterviewSession,
}

impl Checkpoint {
    /// Save the transcript if it grew; failures are logged and retried on the
    /// next turn
    async fn save(&mut self, transcript: &TranscriptHandle) {
        let entries = match transcript.snapshot().await {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Transcript unavailable for saving: {}", e);
                return;
            }
        };
        if entries == self.session.transcript {
            return;
        }

        let mut session = self.session.clone();
        session.transcript = entries;
        match self.backend.save(&session).await {
            Ok(saved) => {
                debug!(
                    session_id = %saved.id,
                    entries = saved.transcript.len(),
                    "Saved live transcript"
                );
                self.session = saved;
            }
            Err(e) => warn!(session_id = %session.id, "Failed to save live transcript: {}", e),
        }
    }
}

/// Pump media out and server events in until cancelled or the stream closes
async fn run_stream(
    devices: Devices,
    mut transport: Box<dyn LiveTransport>,
    transcript: TranscriptHandle,
    mut checkpoint: Checkpoint,
    cancel: CancellationToken,
) -> (Devices, StreamEnd) {
    let Devices { mut media, output } = devices;
    let mut playback = PlaybackQueue::new(output, audio::OUTPUT_SAMPLE_RATE);
    let mut capturing = true;

    let end = loop {
        tokio::select! {
            _ = cancel.cancelled() => break StreamEnd::Cancelled,

            chunk = media.next_chunk(), if capturing => {
                let input = match chunk {
                    Some(MediaChunk::Audio(samples)) => RealtimeInput::Audio(audio::encode_pcm16(&samples)),
                    Some(MediaChunk::VideoFrame(jpeg)) => RealtimeInput::Video(audio::encode_frame(&jpeg)),
                    None => {
                        debug!("Media capture ended");
                        capturing = false;
                        continue;
                    }
                };
                if let Err(e) = transport.send(input).await {
                    break StreamEnd::Failed(e.to_string());
                }
            }

            event = transport.next_event() => {
                let event = match event {
                    Some(Ok(event)) => event,
                    Some(Err(e)) => break StreamEnd::Failed(e.to_string()),
                    None => break StreamEnd::Closed,
                };
                if let Err(e) = handle_event(event, &mut playback, &transcript, &mut checkpoint).await {
                    break StreamEnd::Failed(e.to_string());
                }
            }
        }
    };

    if let StreamEnd::Failed(reason) = &end {
        warn!("Live stream failed: {}", reason);
    }

    media.stop();
    playback.interrupt();
    if let Err(e) = transport.close().await {
        debug!("Closing live stream: {}", e);
    }

    let devices = Devices {
        media,
        output: playback.into_output(),
    };
    (devices, end)
}

async fn handle_event(
    event: ServerEvent,
    playback: &mut PlaybackQueue,
    transcript: &TranscriptHandle,
    checkpoint: &mut Checkpoint,
) -> ClientResult<()> {
    match event {
        ServerEvent::Audio(data) => match audio::decode_pcm16(&data) {
            Ok(samples) => {
                playback.enqueue(samples, Instant::now());
            }
            Err(e) => warn!("Dropping undecodable audio chunk: {}", e),
        },
        ServerEvent::InputTranscription(text) => transcript.append(Speaker::User, text).await?,
        ServerEvent::OutputTranscription(text) => transcript.append(Speaker::Ai, text).await?,
        ServerEvent::Interrupted => playback.interrupt(),
        ServerEvent::SetupComplete => debug!("Live stream setup complete"),
        ServerEvent::TurnComplete => {
            debug!("Model turn complete");
            checkpoint.save(transcript).await;
        }
    }
    Ok(())
}

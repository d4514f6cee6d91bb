//! Bidirectional streaming transport to the hosted live model
//!
//! The client opens a WebSocket, sends one `setup` message, then streams
//! `realtimeInput` audio/video while the server pushes `serverContent`
//! (audio, transcription, interruption and turn boundaries).

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use rehearse_common::config::ModelConfig;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::VecDeque;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

use super::audio::{INPUT_MIME_TYPE, VIDEO_MIME_TYPE};
use crate::error::{ClientError, ClientResult};

/// Parameters for opening a live stream
#[derive(Debug, Clone, PartialEq)]
pub struct LiveSetup {
    pub model: String,
    pub system_instruction: String,
}

/// Media sent to the model; payloads are already base64-encoded
#[derive(Debug, Clone, PartialEq)]
pub enum RealtimeInput {
    Audio(String),
    Video(String),
}

/// Events pushed by the model
#[derive(Debug, Clone, PartialEq)]
pub enum ServerEvent {
    SetupComplete,
    /// Base64 PCM16 at 24 kHz
    Audio(String),
    /// What the candidate said
    InputTranscription(String),
    /// What the interviewer said
    OutputTranscription(String),
    /// The candidate talked over the model; queued audio is stale
    Interrupted,
    TurnComplete,
}

/// An open live stream
#[async_trait]
pub trait LiveTransport: Send {
    async fn send(&mut self, input: RealtimeInput) -> ClientResult<()>;

    /// Next server event; `None` once the stream has closed
    async fn next_event(&mut self) -> Option<ClientResult<ServerEvent>>;

    async fn close(&mut self) -> ClientResult<()>;
}

/// Opens live streams
#[async_trait]
pub trait LiveConnector: Send + Sync {
    async fn connect(&self, setup: &LiveSetup) -> ClientResult<Box<dyn LiveTransport>>;
}

pub fn setup_message(setup: &LiveSetup) -> Value {
    let model = if setup.model.starts_with("models/") {
        setup.model.clone()
    } else {
        format!("models/{}", setup.model)
    };
    json!({
        "setup": {
            "model": model,
            "generationConfig": { "responseModalities": ["AUDIO"] },
            "systemInstruction": { "parts": [{ "text": setup.system_instruction }] },
            "inputAudioTranscription": {},
            "outputAudioTranscription": {}
        }
    })
}

pub fn realtime_message(input: &RealtimeInput) -> Value {
    match input {
        RealtimeInput::Audio(data) => json!({
            "realtimeInput": { "audio": { "data": data, "mimeType": INPUT_MIME_TYPE } }
        }),
        RealtimeInput::Video(data) => json!({
            "realtimeInput": { "video": { "data": data, "mimeType": VIDEO_MIME_TYPE } }
        }),
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ServerMessage {
    setup_complete: Option<Value>,
    server_content: Option<ServerContent>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ServerContent {
    model_turn: Option<ModelTurn>,
    input_transcription: Option<Transcription>,
    output_transcription: Option<Transcription>,
    #[serde(default)]
    interrupted: bool,
    #[serde(default)]
    turn_complete: bool,
}

#[derive(Debug, Default, Deserialize)]
struct ModelTurn {
    #[serde(default)]
    parts: Vec<TurnPart>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TurnPart {
    inline_data: Option<InlineData>,
}

#[derive(Debug, Deserialize)]
struct InlineData {
    data: String,
}

#[derive(Debug, Deserialize)]
struct Transcription {
    #[serde(default)]
    text: String,
}

/// Split one server message into events, in protocol order
///
/// Unknown message kinds (tool calls, usage metadata) yield no events.
pub fn parse_server_message(text: &str) -> ClientResult<Vec<ServerEvent>> {
    let message: ServerMessage = serde_json::from_str(text)
        .map_err(|e| ClientError::Transport(format!("unreadable server message: {}", e)))?;

    let mut events = Vec::new();
    if message.setup_complete.is_some() {
        events.push(ServerEvent::SetupComplete);
    }
    let Some(content) = message.server_content else {
        return Ok(events);
    };

    if content.interrupted {
        events.push(ServerEvent::Interrupted);
    }
    if let Some(turn) = content.model_turn {
        events.extend(
            turn.parts
                .into_iter()
                .filter_map(|part| part.inline_data)
                .map(|inline| ServerEvent::Audio(inline.data)),
        );
    }
    if let Some(t) = content.input_transcription.filter(|t| !t.text.is_empty()) {
        events.push(ServerEvent::InputTranscription(t.text));
    }
    if let Some(t) = content.output_transcription.filter(|t| !t.text.is_empty()) {
        events.push(ServerEvent::OutputTranscription(t.text));
    }
    if content.turn_complete {
        events.push(ServerEvent::TurnComplete);
    }
    Ok(events)
}

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Live stream over the hosted model's WebSocket endpoint
pub struct GeminiLiveTransport {
    socket: Socket,
    pending: VecDeque<ServerEvent>,
    closed: bool,
}

impl GeminiLiveTransport {
    pub async fn connect(url: &str, api_key: &str, setup: &LiveSetup) -> ClientResult<Self> {
        let separator = if url.contains('?') { '&' } else { '?' };
        let endpoint = format!("{}{}key={}", url, separator, api_key);

        let (mut socket, _) = connect_async(endpoint.as_str())
            .await
            .map_err(|e| ClientError::Transport(format!("failed to connect: {}", e)))?;

        socket
            .send(Message::Text(setup_message(setup).to_string()))
            .await
            .map_err(|e| ClientError::Transport(format!("failed to send setup: {}", e)))?;

        info!(model = %setup.model, "Live stream opened");
        Ok(Self {
            socket,
            pending: VecDeque::new(),
            closed: false,
        })
    }
}

#[async_trait]
impl LiveTransport for GeminiLiveTransport {
    async fn send(&mut self, input: RealtimeInput) -> ClientResult<()> {
        if self.closed {
            return Err(ClientError::Transport("stream is closed".to_string()));
        }
        self.socket
            .send(Message::Text(realtime_message(&input).to_string()))
            .await
            .map_err(|e| ClientError::Transport(format!("send failed: {}", e)))
    }

    async fn next_event(&mut self) -> Option<ClientResult<ServerEvent>> {
        loop {
            if let Some(event) = self.pending.pop_front() {
                return Some(Ok(event));
            }
            if self.closed {
                return None;
            }

            let text = match self.socket.next().await? {
                Ok(Message::Text(text)) => text,
                // The service sends JSON in binary frames as well
                Ok(Message::Binary(bytes)) => match String::from_utf8(bytes) {
                    Ok(text) => text,
                    Err(_) => {
                        warn!("Ignoring non-UTF-8 binary frame");
                        continue;
                    }
                },
                Ok(Message::Close(frame)) => {
                    debug!(?frame, "Live stream closed by server");
                    self.closed = true;
                    return None;
                }
                Ok(_) => continue,
                Err(e) => {
                    self.closed = true;
                    return Some(Err(ClientError::Transport(e.to_string())));
                }
            };

            match parse_server_message(&text) {
                Ok(events) => self.pending.extend(events),
                Err(e) => return Some(Err(e)),
            }
        }
    }

    async fn close(&mut self) -> ClientResult<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.socket
            .close(None)
            .await
            .map_err(|e| ClientError::Transport(format!("close failed: {}", e)))
    }
}

/// Connects [`GeminiLiveTransport`] streams
pub struct GeminiLiveConnector {
    url: String,
    api_key: String,
}

impl GeminiLiveConnector {
    pub fn new(url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            api_key: api_key.into(),
        }
    }

    /// Connector for the configured live endpoint
    pub fn from_config(config: &ModelConfig) -> ClientResult<Self> {
        Ok(Self::new(&config.live_url, config.require_api_key()?))
    }
}

#[async_trait]
impl LiveConnector for GeminiLiveConnector {
    async fn connect(&self, setup: &LiveSetup) -> ClientResult<Box<dyn LiveTransport>> {
        let transport = GeminiLiveTransport::connect(&self.url, &self.api_key, setup).await?;
        Ok(Box::new(transport))
    }
}

//! Signed-in storage through the API service

use async_trait::async_trait;
use rehearse_common::api::{codes, ErrorBody, FinishRequest, ImportRequest, SubmitAnswerRequest};
use rehearse_common::models::{InterviewSession, SessionSetup, TranscriptEntry};
use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use tracing::debug;

use super::{BackendKind, SessionBackend};
use crate::error::{ClientError, ClientResult};

const USER_AGENT: &str = concat!("rehearse/", env!("CARGO_PKG_VERSION"));

/// Classify a non-success response by its error code, falling back to status
async fn error_from_response(response: Response) -> ClientError {
    let status = response.status().as_u16();
    let text = response.text().await.unwrap_or_default();

    let Ok(body) = serde_json::from_str::<ErrorBody>(&text) else {
        return match status {
            401 => ClientError::Unauthorized(text),
            404 => ClientError::NotFound(text),
            _ => ClientError::Http {
                status,
                message: text,
            },
        };
    };

    let message = body.error.message;
    match body.error.code.as_str() {
        codes::UNAUTHORIZED => ClientError::Unauthorized(message),
        codes::NOT_FOUND => ClientError::NotFound(message),
        codes::CONFLICT => ClientError::InvalidState(message),
        codes::GENERATION_ERROR => ClientError::Generation(message),
        codes::STORE_CONFIG => ClientError::StoreConfig(message),
        _ => ClientError::Http { status, message },
    }
}

fn network_error(err: reqwest::Error) -> ClientError {
    ClientError::Network(err.to_string())
}

/// Session backend backed by the API service
pub struct RemoteBackend {
    http_client: reqwest::Client,
    base_url: String,
    token: String,
}

impl RemoteBackend {
    /// `base_url` is the API root, e.g. `http://127.0.0.1:5780/api`
    pub fn new(base_url: &str, token: impl Into<String>) -> ClientResult<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| ClientError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.into(),
        })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.http_client
            .request(method, format!("{}{}", self.base_url, path))
            .bearer_auth(&self.token)
    }

    async fn execute<T: DeserializeOwned>(&self, request: RequestBuilder) -> ClientResult<T> {
        let response = request.send().await.map_err(network_error)?;
        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }
        response
            .json()
            .await
            .map_err(|e| ClientError::Http {
                status: 200,
                message: format!("unreadable response body: {}", e),
            })
    }

    async fn send_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: &B,
    ) -> ClientResult<T> {
        debug!(%method, path, "API request");
        self.execute(self.request(method, path).json(body)).await
    }

    /// Adopt a guest session for the signed-in user, keeping its id
    pub async fn import(&self, session: &InterviewSession) -> ClientResult<InterviewSession> {
        self.send_json(
            Method::POST,
            "/sessions/import",
            &ImportRequest {
                session: session.clone(),
            },
        )
        .await
    }
}

#[async_trait]
impl SessionBackend for RemoteBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Remote
    }

    async fn create(&self, setup: SessionSetup) -> ClientResult<InterviewSession> {
        self.send_json(Method::POST, "/sessions", &setup).await
    }

    async fn get(&self, id: &str) -> ClientResult<InterviewSession> {
        self.execute(self.request(Method::GET, &format!("/sessions/{}", id)))
            .await
    }

    async fn list(&self) -> ClientResult<Vec<InterviewSession>> {
        self.execute(self.request(Method::GET, "/sessions")).await
    }

    async fn submit_answer(
        &self,
        id: &str,
        question_index: usize,
        answer: &str,
    ) -> ClientResult<InterviewSession> {
        self.send_json(
            Method::POST,
            &format!("/sessions/{}/answer", id),
            &SubmitAnswerRequest {
                question_index,
                answer: answer.to_string(),
            },
        )
        .await
    }

    async fn save(&self, session: &InterviewSession) -> ClientResult<InterviewSession> {
        self.send_json(Method::PUT, &format!("/sessions/{}", session.id), session)
            .await
    }

    async fn finish(
        &self,
        id: &str,
        transcript: Option<Vec<TranscriptEntry>>,
    ) -> ClientResult<InterviewSession> {
        self.send_json(
            Method::POST,
            &format!("/sessions/{}/finish", id),
            &FinishRequest { transcript },
        )
        .await
    }
}

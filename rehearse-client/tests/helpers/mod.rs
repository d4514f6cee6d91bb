//! Shared test fixtures: canned model, stub identity provider and an
//! in-process API server

#![allow(dead_code)]

use async_trait::async_trait;
use rehearse_api::auth::{TokenVerifier, VerifiedUser, VerifyError};
use rehearse_api::{build_router, store, AppState};
use rehearse_client::backend::{GuestBackend, LocalStorage};
use rehearse_common::model::{GenerativeModel, InterviewModel};
use rehearse_common::models::{SessionMode, SessionSetup};
use rehearse_common::{Error, Result};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

pub const TOKEN: &str = "token-alice";
pub const SCORE: u8 = 7;
pub const REVIEW_SUMMARY: &str = "Clear, well-paced conversation";

/// Answers by response schema; generation can be switched to failing
#[derive(Default)]
pub struct CannedModel {
    pub calls: AtomicUsize,
    pub fail: AtomicBool,
}

impl CannedModel {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl GenerativeModel for CannedModel {
    async fn generate_json(&self, _prompt: &str, schema: &Value) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(Error::Generation("model overloaded".to_string()));
        }

        let response = if schema["type"] == "ARRAY" {
            Value::Array(
                (0..10)
                    .map(|i| {
                        json!({
                            "text": format!("Question {}", i + 1),
                            "category": "behavioral",
                            "difficulty": "medium",
                            "expectedDuration": 2
                        })
                    })
                    .collect(),
            )
        } else if schema["properties"].get("overall_score").is_some() {
            json!({
                "overall_score": SCORE,
                "strengths": ["specific example"],
                "improvements": ["state the result"],
                "missed_points": ["team impact"],
                "suggested_structure": "Situation, Task, Action, Result"
            })
        } else {
            json!({
                "summary": REVIEW_SUMMARY,
                "strengths": ["concise"],
                "improvements": ["more metrics"],
                "next_steps": ["mock system design round"]
            })
        };
        Ok(response.to_string())
    }
}

/// Accepts [`TOKEN`] only
pub struct StubVerifier;

#[async_trait]
impl TokenVerifier for StubVerifier {
    async fn verify(&self, token: &str) -> std::result::Result<VerifiedUser, VerifyError> {
        if token == TOKEN {
            Ok(VerifiedUser {
                uid: "alice".to_string(),
                email: None,
            })
        } else {
            Err(VerifyError::InvalidToken("unknown token".to_string()))
        }
    }
}

/// Serve the API on an ephemeral port; returns its base URL
pub async fn spawn_api(model: Arc<CannedModel>) -> String {
    let pool = store::connect_memory().await.unwrap();
    let state = AppState::new(pool, InterviewModel::new(model), Arc::new(StubVerifier));
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}/api", addr)
}

/// Guest backend over a fresh temporary storage file
pub fn guest_backend(model: Arc<CannedModel>) -> (GuestBackend, LocalStorage, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let storage = LocalStorage::new(dir.path().join("local-storage.json"));
    let backend = GuestBackend::new(storage.clone(), InterviewModel::new(model));
    (backend, storage, dir)
}

pub fn setup(mode: SessionMode) -> SessionSetup {
    SessionSetup {
        job_title: "Backend Engineer".to_string(),
        company: Some("Acme".to_string()),
        job_description: "Design and operate HTTP services".to_string(),
        mode,
        persona: "Friendly Hiring Manager".to_string(),
        resume_text: None,
    }
}

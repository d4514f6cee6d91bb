//! rehearse-api library - interview practice HTTP service
//!
//! Serves per-user interview sessions under `/api`. Session routes require a
//! bearer token verified against the identity provider; `/api/health` is
//! public.

use axum::Router;
use chrono::{DateTime, Utc};
use rehearse_common::model::InterviewModel;
use sqlx::SqlitePool;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub mod api;
pub mod auth;
pub mod error;
pub mod store;

pub use error::{ApiError, ApiResult};

use auth::TokenVerifier;
use store::DocumentStore;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Interview session collection
    pub sessions: DocumentStore,
    /// Question generation, evaluation and review
    pub model: InterviewModel,
    /// Bearer token verification
    pub verifier: Arc<dyn TokenVerifier>,
    /// Server startup time (for uptime)
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(pool: SqlitePool, model: InterviewModel, verifier: Arc<dyn TokenVerifier>) -> Self {
        Self {
            sessions: DocumentStore::new(pool, store::SESSIONS),
            model,
            verifier,
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::middleware;

    let protected = api::session_routes().layer(middleware::from_fn_with_state(
        state.clone(),
        auth::auth_middleware,
    ));

    Router::new()
        .merge(protected)
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

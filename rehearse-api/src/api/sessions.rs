//! Interview session endpoints
//!
//! Every handler runs behind the auth middleware and only touches documents
//! owned by the verified caller.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Extension, Json, Router,
};
use rehearse_common::api::{FinishRequest, ImportRequest, SubmitAnswerRequest};
use rehearse_common::models::{InterviewSession, SessionMode, SessionSetup};
use rehearse_common::session;
use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::{debug, info};

use crate::auth::VerifiedUser;
use crate::error::{ApiError, ApiResult};
use crate::store::{Document, DocumentData};
use crate::AppState;

fn session_from_document(doc: Document) -> ApiResult<InterviewSession> {
    serde_json::from_value(Value::Object(doc.data)).map_err(|e| {
        ApiError::Internal(format!("Stored session {} is unreadable: {}", doc.id, e))
    })
}

fn session_to_document(session: &InterviewSession) -> ApiResult<DocumentData> {
    match serde_json::to_value(session) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(ApiError::Internal(
            "session did not serialize to an object".to_string(),
        )),
        Err(e) => Err(ApiError::Internal(format!(
            "Failed to serialize session: {}",
            e
        ))),
    }
}

/// Load a session with the version it was read at
async fn load_session(
    state: &AppState,
    user: &VerifiedUser,
    id: &str,
) -> ApiResult<(InterviewSession, DateTime<Utc>)> {
    let doc = state
        .sessions
        .get(&user.uid, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Session not found: {}", id)))?;
    let version = doc.updated_at;
    Ok((session_from_document(doc)?, version))
}

/// Write back a session loaded at `version`; 409 if it changed meanwhile
async fn save_session(
    state: &AppState,
    user: &VerifiedUser,
    session: &InterviewSession,
    version: DateTime<Utc>,
) -> ApiResult<()> {
    state
        .sessions
        .replace(&user.uid, &session.id, version, session_to_document(session)?)
        .await?;
    Ok(())
}

/// Reject a client-supplied session state as a bad request
fn reject_invalid(err: rehearse_common::Error) -> ApiError {
    match err {
        rehearse_common::Error::InvalidInput(msg)
        | rehearse_common::Error::InvalidTransition(msg) => ApiError::BadRequest(msg),
        other => other.into(),
    }
}

/// GET /api/sessions
pub async fn list_sessions(
    State(state): State<AppState>,
    Extension(user): Extension<VerifiedUser>,
) -> ApiResult<Json<Vec<InterviewSession>>> {
    let docs = state.sessions.list(&user.uid).await?;
    let sessions = docs
        .into_iter()
        .map(session_from_document)
        .collect::<ApiResult<Vec<_>>>()?;

    debug!(uid = %user.uid, count = sessions.len(), "Listed sessions");
    Ok(Json(sessions))
}

/// GET /api/sessions/:id
pub async fn get_session(
    State(state): State<AppState>,
    Extension(user): Extension<VerifiedUser>,
    Path(id): Path<String>,
) -> ApiResult<Json<InterviewSession>> {
    let (session, _) = load_session(&state, &user, &id).await?;
    Ok(Json(session))
}

/// POST /api/sessions
///
/// Classic sessions get their question set generated up front; live sessions
/// start without questions.
pub async fn create_session(
    State(state): State<AppState>,
    Extension(user): Extension<VerifiedUser>,
    Json(setup): Json<SessionSetup>,
) -> ApiResult<(StatusCode, Json<InterviewSession>)> {
    if setup.job_title.trim().is_empty() {
        return Err(ApiError::BadRequest("jobTitle is required".to_string()));
    }

    let questions = match setup.mode {
        SessionMode::Classic => state.model.generate_questions(&setup).await?,
        SessionMode::Live => Vec::new(),
    };

    let draft = session::new_session(String::new(), setup, questions, Some(user.uid.clone()));
    let doc = state
        .sessions
        .create(&user.uid, session_to_document(&draft)?)
        .await?;
    let created = session_from_document(doc)?;

    info!(
        session_id = %created.id,
        mode = ?created.mode,
        questions = created.questions.len(),
        "Created interview session"
    );
    Ok((StatusCode::CREATED, Json(created)))
}

/// PUT /api/sessions/:id
///
/// Shallow-merges the body into the stored session. The merged result must be
/// a legal successor of the stored one.
pub async fn update_session(
    State(state): State<AppState>,
    Extension(user): Extension<VerifiedUser>,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> ApiResult<Json<InterviewSession>> {
    let Value::Object(partial) = body else {
        return Err(ApiError::BadRequest(
            "update body must be a JSON object".to_string(),
        ));
    };

    let (before, version) = load_session(&state, &user, &id).await?;

    let mut merged = session_to_document(&before)?;
    for (key, value) in &partial {
        merged.insert(key.clone(), value.clone());
    }
    let after: InterviewSession = serde_json::from_value(Value::Object(merged))
        .map_err(|e| ApiError::BadRequest(format!("Invalid session fields: {}", e)))?;
    session::validate_update(&before, &after).map_err(reject_invalid)?;

    let doc = state
        .sessions
        .update(&user.uid, &id, version, partial)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Session not found: {}", id)))?;

    debug!(session_id = %id, "Updated session");
    Ok(Json(session_from_document(doc)?))
}

/// POST /api/sessions/:id/answer
pub async fn submit_answer(
    State(state): State<AppState>,
    Extension(user): Extension<VerifiedUser>,
    Path(id): Path<String>,
    Json(request): Json<SubmitAnswerRequest>,
) -> ApiResult<Json<InterviewSession>> {
    if request.answer.trim().is_empty() {
        return Err(ApiError::BadRequest("answer must not be empty".to_string()));
    }

    let (mut session, version) = load_session(&state, &user, &id).await?;
    let question = session::check_answerable(&session, request.question_index)?.clone();

    let feedback = state
        .model
        .evaluate_answer(&session, &question, &request.answer)
        .await?;
    session::record_answer(&mut session, request.question_index, request.answer, feedback)?;
    save_session(&state, &user, &session, version).await?;

    info!(
        session_id = %id,
        question = request.question_index,
        completed = session.is_completed(),
        "Recorded answer"
    );
    Ok(Json(session))
}

/// POST /api/sessions/:id/finish
///
/// The body is optional; live sessions may include the final transcript.
pub async fn finish_session(
    State(state): State<AppState>,
    Extension(user): Extension<VerifiedUser>,
    Path(id): Path<String>,
    request: Option<Json<FinishRequest>>,
) -> ApiResult<Json<InterviewSession>> {
    let request = request.map(|Json(r)| r).unwrap_or_default();
    let (mut session, version) = load_session(&state, &user, &id).await?;

    if session.is_completed() {
        return Err(ApiError::Conflict(format!(
            "Session {} is already completed",
            id
        )));
    }

    match session.mode {
        SessionMode::Classic => session::complete_classic(&mut session)?,
        SessionMode::Live => {
            let transcript = request
                .transcript
                .unwrap_or_else(|| session.transcript.clone());
            let review = state.model.review_live_session(&session, &transcript).await?;
            session::complete_live(&mut session, transcript, review)?;
        }
    }
    save_session(&state, &user, &session, version).await?;

    info!(session_id = %id, mode = ?session.mode, "Finished session");
    Ok(Json(session))
}

/// POST /api/sessions/import
///
/// Adopts a session created while signed out. The id is kept; ownership
/// moves to the caller. Importing the same session again is a no-op; any
/// other session already stored under the id is left alone with a 409.
pub async fn import_session(
    State(state): State<AppState>,
    Extension(user): Extension<VerifiedUser>,
    Json(request): Json<ImportRequest>,
) -> ApiResult<Json<InterviewSession>> {
    let mut session = request.session;
    session.user_id = Some(user.uid.clone());
    session::check_invariants(&session).map_err(reject_invalid)?;

    let data = session_to_document(&session)?;
    match state.sessions.insert(&user.uid, &session.id, data).await {
        Ok(_) => {}
        Err(rehearse_common::Error::InvalidTransition(_)) => {
            let (existing, _) = load_session(&state, &user, &session.id).await?;
            if existing != session {
                return Err(ApiError::Conflict(format!(
                    "Session {} already exists",
                    session.id
                )));
            }
            debug!(session_id = %session.id, "Guest session was already imported");
            return Ok(Json(existing));
        }
        Err(e) => return Err(e.into()),
    }

    info!(session_id = %session.id, uid = %user.uid, "Imported guest session");
    Ok(Json(session))
}

/// Build session routes (auth applied by the caller)
pub fn session_routes() -> Router<AppState> {
    Router::new()
        .route("/api/sessions", get(list_sessions).post(create_session))
        .route("/api/sessions/import", post(import_session))
        .route("/api/sessions/:id", get(get_session).put(update_session))
        .route("/api/sessions/:id/answer", post(submit_answer))
        .route("/api/sessions/:id/finish", post(finish_session))
}

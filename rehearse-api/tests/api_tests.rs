//! Session API integration tests
//!
//! Drives the router in-process with an in-memory store, a stub token
//! verifier and a canned model.

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use rehearse_api::auth::{TokenVerifier, VerifiedUser, VerifyError};
use rehearse_api::{build_router, store, AppState};
use rehearse_common::model::{GenerativeModel, InterviewModel, EMPTY_SESSION_SUMMARY};
use rehearse_common::{Error, Result};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

const ALICE: &str = "token-alice";
const BOB: &str = "token-bob";
const OFFLINE: &str = "token-offline";

/// Accepts two fixed tokens; one more simulates an unreachable provider
struct StubVerifier;

#[async_trait]
impl TokenVerifier for StubVerifier {
    async fn verify(&self, token: &str) -> std::result::Result<VerifiedUser, VerifyError> {
        match token {
            ALICE => Ok(VerifiedUser {
                uid: "alice".to_string(),
                email: Some("alice@example.com".to_string()),
            }),
            BOB => Ok(VerifiedUser {
                uid: "bob".to_string(),
                email: None,
            }),
            OFFLINE => Err(VerifyError::Unavailable("connection refused".to_string())),
            _ => Err(VerifyError::InvalidToken("unknown token".to_string())),
        }
    }
}

/// Answers by response schema: question set, feedback or live review
#[derive(Default)]
struct CannedModel {
    calls: AtomicUsize,
    fail: bool,
    delay: Option<Duration>,
}

#[async_trait]
impl GenerativeModel for CannedModel {
    async fn generate_json(&self, _prompt: &str, schema: &Value) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail {
            return Err(Error::Generation("quota exceeded".to_string()));
        }

        let response = if schema["type"] == "ARRAY" {
            let questions: Vec<Value> = (0..12)
                .map(|i| {
                    json!({
                        "text": format!("Question {}", i),
                        "category": "technical",
                        "difficulty": "medium",
                        "expectedDuration": 3
                    })
                })
                .collect();
            Value::Array(questions)
        } else if schema["properties"].get("overall_score").is_some() {
            json!({
                "overall_score": 7,
                "strengths": ["clear structure"],
                "improvements": ["quantify impact"],
                "missed_points": [],
                "suggested_structure": "STAR"
            })
        } else {
            json!({
                "summary": "Solid conversation",
                "strengths": ["calm"],
                "improvements": ["more detail"],
                "next_steps": ["practice system design"]
            })
        };
        Ok(response.to_string())
    }
}

async fn test_app_with(model: Arc<CannedModel>) -> Router {
    let pool = store::connect_memory().await.unwrap();
    let state = AppState::new(pool, InterviewModel::new(model), Arc::new(StubVerifier));
    build_router(state)
}

async fn test_app() -> (Router, Arc<CannedModel>) {
    let model = Arc::new(CannedModel::default());
    (test_app_with(model.clone()).await, model)
}

async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn create(app: &Router, token: &str, mode: &str) -> Value {
    let (status, session) = send(
        app,
        Method::POST,
        "/api/sessions",
        Some(token),
        Some(json!({
            "jobTitle": "Backend Engineer",
            "company": "Acme",
            "jobDescription": "Build and run APIs",
            "mode": mode,
            "persona": "Friendly Hiring Manager"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "create failed: {}", session);
    session
}

fn guest_session(id: &str, created_at: &str) -> Value {
    json!({
        "id": id,
        "jobTitle": "Data Analyst",
        "jobDescription": "SQL",
        "createdAt": created_at,
        "status": "in-progress",
        "mode": "live",
        "persona": "Friendly Hiring Manager",
        "questions": [],
        "currentQuestionIndex": 0,
        "transcript": [{"speaker": "ai", "text": "Hello"}]
    })
}

#[tokio::test]
async fn test_health_is_public() {
    let (app, _) = test_app().await;
    let (status, body) = send(&app, Method::GET, "/api/health", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "rehearse-api");
}

#[tokio::test]
async fn test_session_routes_require_token() {
    let (app, _) = test_app().await;

    let (status, body) = send(&app, Method::GET, "/api/sessions", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");

    let (status, _) = send(&app, Method::GET, "/api/sessions", Some("forged"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let request = Request::builder()
        .uri("/api/sessions")
        .header(header::AUTHORIZATION, "Basic YWxpY2U6cHc=")
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_provider_outage_is_503() {
    let (app, _) = test_app().await;
    let (status, body) = send(&app, Method::GET, "/api/sessions", Some(OFFLINE), None).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"]["code"], "IDENTITY_UNAVAILABLE");
}

#[tokio::test]
async fn test_create_classic_session() {
    let (app, _) = test_app().await;
    let session = create(&app, ALICE, "classic").await;

    assert_eq!(session["questions"].as_array().unwrap().len(), 10);
    assert_eq!(session["currentQuestionIndex"], 0);
    assert_eq!(session["status"], "in-progress");
    assert_eq!(session["userId"], "alice");
    assert!(!session["id"].as_str().unwrap().is_empty());

    let uri = format!("/api/sessions/{}", session["id"].as_str().unwrap());
    let (status, fetched) = send(&app, Method::GET, &uri, Some(ALICE), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched, session);
}

#[tokio::test]
async fn test_create_live_session_skips_generation() {
    let (app, model) = test_app().await;
    let session = create(&app, ALICE, "live").await;

    assert!(session["questions"].as_array().unwrap().is_empty());
    assert_eq!(model.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_create_validation_and_generation_errors() {
    let (app, _) = test_app().await;
    let (status, body) = send(
        &app,
        Method::POST,
        "/api/sessions",
        Some(ALICE),
        Some(json!({"jobTitle": "  ", "jobDescription": "x", "mode": "classic"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "BAD_REQUEST");

    let failing = test_app_with(Arc::new(CannedModel {
        calls: AtomicUsize::new(0),
        fail: true,
        delay: None,
    }))
    .await;
    let (status, body) = send(
        &failing,
        Method::POST,
        "/api/sessions",
        Some(ALICE),
        Some(json!({"jobTitle": "SRE", "jobDescription": "x", "mode": "classic"})),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"]["code"], "GENERATION_ERROR");
}

#[tokio::test]
async fn test_sessions_are_private() {
    let (app, _) = test_app().await;
    let session = create(&app, ALICE, "classic").await;
    let uri = format!("/api/sessions/{}", session["id"].as_str().unwrap());

    let (status, _) = send(&app, Method::GET, &uri, Some(BOB), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, list) = send(&app, Method::GET, "/api/sessions", Some(BOB), None).await;
    assert!(list.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_submit_answer_advances() {
    let (app, _) = test_app().await;
    let session = create(&app, ALICE, "classic").await;
    let uri = format!("/api/sessions/{}/answer", session["id"].as_str().unwrap());

    let (status, updated) = send(
        &app,
        Method::POST,
        &uri,
        Some(ALICE),
        Some(json!({"questionIndex": 0, "answer": "I profiled the service first."})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let score = updated["questions"][0]["feedback"]["overall_score"].as_u64().unwrap();
    assert!((1..=10).contains(&score));
    assert_eq!(updated["currentQuestionIndex"], 1);
    assert_eq!(updated["status"], "in-progress");

    // Answered questions are closed
    let (status, body) = send(
        &app,
        Method::POST,
        &uri,
        Some(ALICE),
        Some(json!({"questionIndex": 0, "answer": "again"})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "CONFLICT");

    // Skipping ahead is rejected
    let (status, _) = send(
        &app,
        Method::POST,
        &uri,
        Some(ALICE),
        Some(json!({"questionIndex": 5, "answer": "skip"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        Method::POST,
        &uri,
        Some(ALICE),
        Some(json!({"questionIndex": 1, "answer": "   "})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_last_answer_completes_session() {
    let (app, _) = test_app().await;
    let session = create(&app, ALICE, "classic").await;
    let uri = format!("/api/sessions/{}/answer", session["id"].as_str().unwrap());

    let mut last = Value::Null;
    for index in 0..10 {
        let (status, body) = send(
            &app,
            Method::POST,
            &uri,
            Some(ALICE),
            Some(json!({"questionIndex": index, "answer": format!("answer {}", index)})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        last = body;
    }

    assert_eq!(last["status"], "completed");
    assert_eq!(last["averageScore"], 7.0);
    assert_eq!(last["currentQuestionIndex"], 9);
}

#[tokio::test]
async fn test_finish_classic_twice_conflicts() {
    let (app, _) = test_app().await;
    let session = create(&app, ALICE, "classic").await;
    let id = session["id"].as_str().unwrap();

    send(
        &app,
        Method::POST,
        &format!("/api/sessions/{}/answer", id),
        Some(ALICE),
        Some(json!({"questionIndex": 0, "answer": "first"})),
    )
    .await;

    let uri = format!("/api/sessions/{}/finish", id);
    let (status, finished) = send(&app, Method::POST, &uri, Some(ALICE), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(finished["status"], "completed");
    assert_eq!(finished["averageScore"], 7.0);

    let (status, body) = send(&app, Method::POST, &uri, Some(ALICE), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "CONFLICT");
}

#[tokio::test]
async fn test_finish_classic_without_answers_scores_zero() {
    let (app, _) = test_app().await;
    let session = create(&app, ALICE, "classic").await;
    let uri = format!("/api/sessions/{}/finish", session["id"].as_str().unwrap());

    let (status, finished) = send(&app, Method::POST, &uri, Some(ALICE), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(finished["averageScore"], 0.0);
}

#[tokio::test]
async fn test_finish_live_with_empty_transcript() {
    let (app, model) = test_app().await;
    let session = create(&app, ALICE, "live").await;
    let uri = format!("/api/sessions/{}/finish", session["id"].as_str().unwrap());

    let (status, finished) = send(
        &app,
        Method::POST,
        &uri,
        Some(ALICE),
        Some(json!({"transcript": []})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(finished["status"], "completed");

    let review = &finished["liveSessionFeedback"];
    assert_eq!(review["summary"], EMPTY_SESSION_SUMMARY);
    assert!(review["strengths"].as_array().unwrap().is_empty());
    assert!(review["improvements"].as_array().unwrap().is_empty());
    assert_eq!(model.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_finish_live_reviews_transcript() {
    let (app, _) = test_app().await;
    let session = create(&app, ALICE, "live").await;
    let uri = format!("/api/sessions/{}/finish", session["id"].as_str().unwrap());

    let transcript = json!([
        {"speaker": "ai", "text": "Tell me about yourself."},
        {"speaker": "user", "text": "I build backend systems."}
    ]);
    let (status, finished) = send(
        &app,
        Method::POST,
        &uri,
        Some(ALICE),
        Some(json!({ "transcript": transcript })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(finished["transcript"], transcript);
    assert_eq!(finished["liveSessionFeedback"]["summary"], "Solid conversation");
    assert!(finished.get("averageScore").is_none());
}

#[tokio::test]
async fn test_import_preserves_id_and_takes_ownership() {
    let (app, _) = test_app().await;
    let mut guest = guest_session("guest-123", "2025-03-01T10:00:00Z");
    guest["userId"] = json!("someone-else");

    let (status, imported) = send(
        &app,
        Method::POST,
        "/api/sessions/import",
        Some(ALICE),
        Some(json!({ "session": guest })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(imported["id"], "guest-123");
    assert_eq!(imported["userId"], "alice");

    let (status, fetched) =
        send(&app, Method::GET, "/api/sessions/guest-123", Some(ALICE), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["transcript"][0]["text"], "Hello");
}

#[tokio::test]
async fn test_import_rejects_inconsistent_session() {
    let (app, _) = test_app().await;
    let mut guest = guest_session("guest-bad", "2025-03-01T10:00:00Z");
    guest["currentQuestionIndex"] = json!(4);

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/sessions/import",
        Some(ALICE),
        Some(json!({ "session": guest })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_list_newest_first() {
    let (app, _) = test_app().await;
    for (id, created_at) in [
        ("older", "2024-05-01T09:00:00Z"),
        ("newest", "2025-02-01T09:00:00Z"),
        ("middle", "2024-11-20T18:45:00Z"),
    ] {
        let (status, _) = send(
            &app,
            Method::POST,
            "/api/sessions/import",
            Some(ALICE),
            Some(json!({ "session": guest_session(id, created_at) })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, list) = send(&app, Method::GET, "/api/sessions", Some(ALICE), None).await;
    assert_eq!(status, StatusCode::OK);
    let ids: Vec<&str> = list
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["newest", "middle", "older"]);
}

#[tokio::test]
async fn test_update_merges_and_validates() {
    let (app, _) = test_app().await;
    let session = create(&app, ALICE, "live").await;
    let uri = format!("/api/sessions/{}", session["id"].as_str().unwrap());

    let (status, updated) = send(
        &app,
        Method::PUT,
        &uri,
        Some(ALICE),
        Some(json!({"transcript": [{"speaker": "ai", "text": "Welcome"}]})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["transcript"][0]["text"], "Welcome");
    assert_eq!(updated["jobTitle"], "Backend Engineer");

    let (status, body) = send(&app, Method::PUT, &uri, Some(ALICE), Some(json!({"mode": "classic"})))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "BAD_REQUEST");

    let (status, _) = send(&app, Method::PUT, &uri, Some(ALICE), Some(json!({"userId": "bob"})))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        Method::PUT,
        "/api/sessions/missing",
        Some(ALICE),
        Some(json!({"persona": "x"})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_update_cannot_reopen_completed_session() {
    let (app, _) = test_app().await;
    let session = create(&app, ALICE, "classic").await;
    let id = session["id"].as_str().unwrap();

    send(
        &app,
        Method::POST,
        &format!("/api/sessions/{}/finish", id),
        Some(ALICE),
        None,
    )
    .await;

    let (status, _) = send(
        &app,
        Method::PUT,
        &format!("/api/sessions/{}", id),
        Some(ALICE),
        Some(json!({"status": "in-progress"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_update_cannot_forge_results() {
    let (app, _) = test_app().await;
    let classic = create(&app, ALICE, "classic").await;
    let uri = format!("/api/sessions/{}", classic["id"].as_str().unwrap());

    let (status, body) = send(
        &app,
        Method::PUT,
        &uri,
        Some(ALICE),
        Some(json!({"status": "completed", "averageScore": 9.7})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "BAD_REQUEST");

    let mut questions = classic["questions"].clone();
    questions[0]["userAnswer"] = json!("Flawless answer");
    questions[0]["feedback"] = json!({
        "overall_score": 200,
        "strengths": [],
        "improvements": [],
        "missed_points": [],
        "suggested_structure": ""
    });
    let (status, _) = send(
        &app,
        Method::PUT,
        &uri,
        Some(ALICE),
        Some(json!({"questions": questions, "currentQuestionIndex": 1})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let live = create(&app, ALICE, "live").await;
    let (status, _) = send(
        &app,
        Method::PUT,
        &format!("/api/sessions/{}", live["id"].as_str().unwrap()),
        Some(ALICE),
        Some(json!({"liveSessionFeedback": {"summary": "Outstanding"}})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Nothing was written; finishing still computes the real average
    let (status, finished) = send(
        &app,
        Method::POST,
        &format!("{}/finish", uri),
        Some(ALICE),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(finished["averageScore"], 0.0);
    assert!(finished["questions"][0].get("userAnswer").is_none());
}

#[tokio::test]
async fn test_import_rejects_forged_results() {
    let (app, _) = test_app().await;
    let question = |answered: bool| {
        let mut q = json!({
            "text": "Why us?",
            "category": "behavioral",
            "difficulty": "easy",
            "expectedDuration": 2
        });
        if answered {
            q["userAnswer"] = json!("Because");
            q["feedback"] = json!({"overall_score": 6});
        }
        q
    };
    let classic = |id: &str| {
        let mut session = guest_session(id, "2025-03-01T10:00:00Z");
        session["mode"] = json!("classic");
        session["transcript"] = json!([]);
        session["questions"] = json!([question(true), question(false)]);
        session["currentQuestionIndex"] = json!(1);
        session
    };

    let mut inflated = classic("guest-inflated");
    inflated["status"] = json!("completed");
    inflated["averageScore"] = json!(9.7);

    let mut out_of_range = classic("guest-out-of-range");
    out_of_range["questions"][0]["feedback"]["overall_score"] = json!(200);

    let mut unevaluated = classic("guest-unevaluated");
    unevaluated["questions"][0]
        .as_object_mut()
        .unwrap()
        .remove("feedback");

    for forged in [inflated, out_of_range, unevaluated] {
        let id = forged["id"].clone();
        let (status, _) = send(
            &app,
            Method::POST,
            "/api/sessions/import",
            Some(ALICE),
            Some(json!({ "session": forged })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "accepted {}", id);
    }

    let mut honest = classic("guest-honest");
    honest["status"] = json!("completed");
    honest["averageScore"] = json!(6.0);
    let (status, _) = send(
        &app,
        Method::POST,
        "/api/sessions/import",
        Some(ALICE),
        Some(json!({ "session": honest })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_import_never_overwrites_stored_session() {
    let (app, _) = test_app().await;
    let created = create(&app, ALICE, "live").await;
    let id = created["id"].as_str().unwrap();
    let (status, _) = send(
        &app,
        Method::POST,
        &format!("/api/sessions/{}/finish", id),
        Some(ALICE),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    // An in-progress copy must not replace the completed session
    let (status, body) = send(
        &app,
        Method::POST,
        "/api/sessions/import",
        Some(ALICE),
        Some(json!({ "session": created })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "CONFLICT");

    let (_, stored) = send(&app, Method::GET, &format!("/api/sessions/{}", id), Some(ALICE), None)
        .await;
    assert_eq!(stored["status"], "completed");

    // Repeating an import that already landed succeeds
    let guest = guest_session("guest-again", "2025-03-01T10:00:00Z");
    for _ in 0..2 {
        let (status, imported) = send(
            &app,
            Method::POST,
            "/api/sessions/import",
            Some(ALICE),
            Some(json!({ "session": guest })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(imported["id"], "guest-again");
    }
}

#[tokio::test]
async fn test_answer_racing_finish_does_not_reopen_session() {
    let model = Arc::new(CannedModel {
        delay: Some(Duration::from_millis(300)),
        ..CannedModel::default()
    });
    let app = test_app_with(model).await;
    let session = create(&app, ALICE, "classic").await;
    let id = session["id"].as_str().unwrap();
    let answer_uri = format!("/api/sessions/{}/answer", id);
    let finish_uri = format!("/api/sessions/{}/finish", id);

    let answer = send(
        &app,
        Method::POST,
        &answer_uri,
        Some(ALICE),
        Some(json!({"questionIndex": 0, "answer": "Slow to evaluate"})),
    );
    let finish = async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        send(&app, Method::POST, &finish_uri, Some(ALICE), None).await
    };
    let ((answer_status, answer_body), (finish_status, _)) = tokio::join!(answer, finish);

    assert_eq!(finish_status, StatusCode::OK);
    assert_eq!(answer_status, StatusCode::CONFLICT);
    assert_eq!(answer_body["error"]["code"], "CONFLICT");

    let (_, stored) = send(&app, Method::GET, &format!("/api/sessions/{}", id), Some(ALICE), None)
        .await;
    assert_eq!(stored["status"], "completed");
    assert_eq!(stored["averageScore"], 0.0);
    assert!(stored["questions"][0].get("userAnswer").is_none());
}

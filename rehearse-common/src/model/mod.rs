//! Prompt/model client
//!
//! [`InterviewModel`] implements the three model-backed operations (question
//! generation, answer evaluation, live-session review) on top of any
//! [`GenerativeModel`] transport. Each operation builds a prompt, calls the
//! model with a fixed response schema and parses the JSON it returns. There is
//! no retry: one failed call is one [`Error::Generation`].

pub mod gemini;
pub mod prompts;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info};

use crate::models::{
    Feedback, InterviewSession, LiveSessionFeedback, Question, SessionSetup, TranscriptEntry,
};
use crate::session::QUESTIONS_PER_SESSION;
use crate::{Error, Result};

pub use gemini::GeminiClient;

/// Summary returned when a live session produced no transcript
pub const EMPTY_SESSION_SUMMARY: &str = "The session was empty, so no review could be generated.";

/// Schema-constrained text generation
#[async_trait]
pub trait GenerativeModel: Send + Sync {
    /// Generate a JSON document conforming to `schema`, returned as raw text
    async fn generate_json(&self, prompt: &str, schema: &Value) -> Result<String>;
}

/// Review returned for a live session without any transcript
pub fn empty_session_review() -> LiveSessionFeedback {
    LiveSessionFeedback {
        summary: EMPTY_SESSION_SUMMARY.to_string(),
        strengths: Vec::new(),
        improvements: Vec::new(),
        next_steps: Vec::new(),
    }
}

/// Strip a surrounding Markdown code fence, if any
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

fn parse_output<T: DeserializeOwned>(operation: &str, text: &str) -> Result<T> {
    serde_json::from_str(strip_code_fence(text)).map_err(|e| {
        Error::Generation(format!("{}: model returned unparseable output: {}", operation, e))
    })
}

/// Evaluation as the model returns it; the score may be fractional or out of range
#[derive(Debug, Deserialize)]
struct ModelFeedback {
    overall_score: f64,
    #[serde(default)]
    strengths: Vec<String>,
    #[serde(default)]
    improvements: Vec<String>,
    #[serde(default)]
    missed_points: Vec<String>,
    #[serde(default)]
    suggested_structure: String,
}

impl ModelFeedback {
    fn into_feedback(self) -> Feedback {
        Feedback {
            overall_score: self.overall_score.round().clamp(1.0, 10.0) as u8,
            strengths: self.strengths,
            improvements: self.improvements,
            missed_points: self.missed_points,
            suggested_structure: self.suggested_structure,
        }
    }
}

/// Interview operations backed by a generative model
#[derive(Clone)]
pub struct InterviewModel {
    backend: Arc<dyn GenerativeModel>,
}

impl InterviewModel {
    pub fn new(backend: Arc<dyn GenerativeModel>) -> Self {
        Self { backend }
    }

    /// Generate the question set for a classic session
    pub async fn generate_questions(&self, setup: &SessionSetup) -> Result<Vec<Question>> {
        let prompt = prompts::question_generation_prompt(setup);
        let text = self
            .backend
            .generate_json(&prompt, &prompts::question_schema())
            .await?;

        let mut questions: Vec<Question> = parse_output("question generation", &text)?;
        if questions.is_empty() {
            return Err(Error::Generation(
                "question generation: model returned no questions".to_string(),
            ));
        }
        questions.truncate(QUESTIONS_PER_SESSION);
        for question in &mut questions {
            question.user_answer = None;
            question.feedback = None;
        }

        info!(
            job_title = %setup.job_title,
            count = questions.len(),
            "Generated interview questions"
        );
        Ok(questions)
    }

    /// Evaluate one answer; the score is clamped into 1..=10
    pub async fn evaluate_answer(
        &self,
        session: &InterviewSession,
        question: &Question,
        answer: &str,
    ) -> Result<Feedback> {
        let prompt = prompts::evaluation_prompt(session, question, answer);
        let text = self
            .backend
            .generate_json(&prompt, &prompts::feedback_schema())
            .await?;

        let feedback = parse_output::<ModelFeedback>("answer evaluation", &text)?.into_feedback();

        debug!(session_id = %session.id, score = feedback.overall_score, "Evaluated answer");
        Ok(feedback)
    }

    /// Review a live session transcript
    ///
    /// An empty transcript short-circuits to [`empty_session_review`] without
    /// calling the model.
    pub async fn review_live_session(
        &self,
        session: &InterviewSession,
        transcript: &[TranscriptEntry],
    ) -> Result<LiveSessionFeedback> {
        if transcript.iter().all(|entry| entry.text.trim().is_empty()) {
            info!(session_id = %session.id, "Live session transcript is empty, skipping review");
            return Ok(empty_session_review());
        }

        let prompt = prompts::live_review_prompt(session, transcript);
        let text = self
            .backend
            .generate_json(&prompt, &prompts::live_review_schema())
            .await?;

        parse_output("live session review", &text)
    }
}

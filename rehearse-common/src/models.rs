//! Interview session data model
//!
//! Session documents are serialized with camelCase field names; feedback
//! objects keep the snake_case names the model is asked to produce.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Session lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SessionStatus {
    InProgress,
    Completed,
}

/// Interview mode, fixed at creation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionMode {
    /// Turn-based text Q&A with per-answer feedback
    Classic,
    /// Streamed audio/video conversation with an end-of-session review
    Live,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QuestionCategory {
    Technical,
    Behavioral,
    Situational,
    RoleSpecific,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

/// Evaluation of a single answer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feedback {
    /// Score from 1 to 10
    pub overall_score: u8,
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub improvements: Vec<String>,
    #[serde(default)]
    pub missed_points: Vec<String>,
    #[serde(default)]
    pub suggested_structure: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub text: String,
    pub category: QuestionCategory,
    pub difficulty: Difficulty,
    /// Expected answer length in minutes
    pub expected_duration: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_answer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback: Option<Feedback>,
}

impl Question {
    pub fn is_answered(&self) -> bool {
        self.user_answer.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    User,
    Ai,
}

/// One speaker turn of a live session transcript
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptEntry {
    pub speaker: Speaker,
    pub text: String,
}

impl TranscriptEntry {
    pub fn new(speaker: Speaker, text: impl Into<String>) -> Self {
        Self {
            speaker,
            text: text.into(),
        }
    }
}

/// Holistic review of a live session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiveSessionFeedback {
    pub summary: String,
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub improvements: Vec<String>,
    #[serde(default)]
    pub next_steps: Vec<String>,
}

/// Caller-supplied parameters for starting a session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSetup {
    pub job_title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(default)]
    pub job_description: String,
    pub mode: SessionMode,
    #[serde(default = "default_persona")]
    pub persona: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resume_text: Option<String>,
}

fn default_persona() -> String {
    "Friendly Hiring Manager".to_string()
}

/// One interview practice attempt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterviewSession {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub job_title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(default)]
    pub job_description: String,
    pub created_at: DateTime<Utc>,
    pub status: SessionStatus,
    pub mode: SessionMode,
    pub persona: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resume_text: Option<String>,
    #[serde(default)]
    pub questions: Vec<Question>,
    #[serde(default)]
    pub current_question_index: usize,
    #[serde(default)]
    pub transcript: Vec<TranscriptEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub live_session_feedback: Option<LiveSessionFeedback>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub average_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl InterviewSession {
    pub fn is_completed(&self) -> bool {
        self.status == SessionStatus::Completed
    }

    /// The question currently awaiting an answer (classic mode)
    pub fn current_question(&self) -> Option<&Question> {
        self.questions.get(self.current_question_index)
    }

    pub fn answered_count(&self) -> usize {
        self.questions.iter().filter(|q| q.is_answered()).count()
    }
}

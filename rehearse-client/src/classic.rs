//! Classic (question-by-question) session controller
//!
//! ```text
//! Idle -> QuestionActive(i) -> AnswerSubmitted(i) -> FeedbackShown(i)
//!      -> QuestionActive(i + 1) | Completed
//! ```
//!
//! Navigation only moves forward; an answered question is never reopened.

use rehearse_common::models::{Feedback, InterviewSession, Question, SessionMode, SessionSetup};
use std::sync::Arc;
use tracing::{debug, info};

use crate::backend::SessionBackend;
use crate::error::{ClientError, ClientResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassicState {
    Idle,
    QuestionActive(usize),
    AnswerSubmitted(usize),
    FeedbackShown(usize),
    Completed,
}

pub struct ClassicController {
    backend: Arc<dyn SessionBackend>,
    session: Option<InterviewSession>,
    state: ClassicState,
}

impl ClassicController {
    pub fn new(backend: Arc<dyn SessionBackend>) -> Self {
        Self {
            backend,
            session: None,
            state: ClassicState::Idle,
        }
    }

    pub fn state(&self) -> ClassicState {
        self.state
    }

    pub fn session(&self) -> Option<&InterviewSession> {
        self.session.as_ref()
    }

    /// Question awaiting an answer, or whose feedback is on screen
    pub fn current_question(&self) -> Option<&Question> {
        let index = match self.state {
            ClassicState::QuestionActive(i)
            | ClassicState::AnswerSubmitted(i)
            | ClassicState::FeedbackShown(i) => i,
            _ => return None,
        };
        self.session.as_ref()?.questions.get(index)
    }

    fn adopt(&mut self, session: InterviewSession) -> ClientResult<&InterviewSession> {
        if session.mode != SessionMode::Classic {
            return Err(ClientError::InvalidState(format!(
                "session {} is not a classic session",
                session.id
            )));
        }
        self.state = if session.is_completed() {
            ClassicState::Completed
        } else {
            ClassicState::QuestionActive(session.current_question_index)
        };
        Ok(self.session.insert(session))
    }

    /// Create a classic session and show its first question
    pub async fn start(&mut self, mut setup: SessionSetup) -> ClientResult<&InterviewSession> {
        self.require_idle()?;
        setup.mode = SessionMode::Classic;
        let session = self.backend.create(setup).await?;
        info!(
            session_id = %session.id,
            questions = session.questions.len(),
            "Classic session started"
        );
        self.adopt(session)
    }

    /// Continue an existing session at its active question
    pub async fn resume(&mut self, id: &str) -> ClientResult<&InterviewSession> {
        self.require_idle()?;
        let session = self.backend.get(id).await?;
        self.adopt(session)
    }

    fn require_idle(&self) -> ClientResult<()> {
        if self.state != ClassicState::Idle {
            return Err(ClientError::InvalidState(format!(
                "a session is already loaded ({:?})",
                self.state
            )));
        }
        Ok(())
    }

    /// Submit an answer to the active question and return its feedback
    ///
    /// On failure the question stays active so the answer can be retried.
    pub async fn submit_answer(&mut self, answer: &str) -> ClientResult<&Feedback> {
        let ClassicState::QuestionActive(index) = self.state else {
            return Err(ClientError::InvalidState(format!(
                "no question is awaiting an answer ({:?})",
                self.state
            )));
        };
        if answer.trim().is_empty() {
            return Err(ClientError::InvalidState("answer must not be empty".to_string()));
        }
        let id = match &self.session {
            Some(session) => session.id.clone(),
            None => return Err(ClientError::InvalidState("no session loaded".to_string())),
        };

        self.state = ClassicState::AnswerSubmitted(index);
        let updated = match self.backend.submit_answer(&id, index, answer).await {
            Ok(updated) => updated,
            Err(e) => {
                self.state = ClassicState::QuestionActive(index);
                return Err(e);
            }
        };

        debug!(session_id = %id, question = index, "Answer evaluated");
        self.state = ClassicState::FeedbackShown(index);
        self.session
            .insert(updated)
            .questions
            .get(index)
            .and_then(|q| q.feedback.as_ref())
            .ok_or_else(|| ClientError::InvalidState(format!("question {} has no feedback", index)))
    }

    /// Leave the feedback view: next question, or done after the last one
    pub fn next(&mut self) -> ClientResult<ClassicState> {
        let ClassicState::FeedbackShown(_) = self.state else {
            return Err(ClientError::InvalidState(format!(
                "feedback is not being shown ({:?})",
                self.state
            )));
        };
        let session = self
            .session
            .as_ref()
            .ok_or_else(|| ClientError::InvalidState("no session loaded".to_string()))?;

        self.state = if session.is_completed() {
            ClassicState::Completed
        } else {
            ClassicState::QuestionActive(session.current_question_index)
        };
        Ok(self.state)
    }

    /// End the session early, or return it once the last answer completed it
    pub async fn finish(&mut self) -> ClientResult<&InterviewSession> {
        match self.state {
            ClassicState::QuestionActive(_) | ClassicState::FeedbackShown(_) => {}
            ClassicState::Completed => {
                return self
                    .session
                    .as_ref()
                    .ok_or_else(|| ClientError::InvalidState("no session loaded".to_string()));
            }
            other => {
                return Err(ClientError::InvalidState(format!(
                    "cannot finish from {:?}",
                    other
                )))
            }
        }
        let session = self
            .session
            .take()
            .ok_or_else(|| ClientError::InvalidState("no session loaded".to_string()))?;

        let finished = if session.is_completed() {
            session
        } else {
            match self.backend.finish(&session.id, None).await {
                Ok(finished) => finished,
                Err(e) => {
                    self.session = Some(session);
                    return Err(e);
                }
            }
        };

        info!(
            session_id = %finished.id,
            average_score = ?finished.average_score,
            "Classic session completed"
        );
        self.state = ClassicState::Completed;
        Ok(self.session.insert(finished))
    }
}

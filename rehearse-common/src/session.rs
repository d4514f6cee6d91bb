//! Session lifecycle rules
//!
//! Every mutation of an [`InterviewSession`], whether performed by the API
//! service or by a guest client, goes through these functions so the
//! lifecycle invariants hold on both paths:
//!
//! - `mode` never changes after creation
//! - `status` moves `in-progress → completed` once
//! - `currentQuestionIndex` only moves forward and stays within the question list
//! - completion sets `averageScore` (classic) or `liveSessionFeedback` (live), never both

use chrono::Utc;

use crate::models::{
    Feedback, InterviewSession, LiveSessionFeedback, Question, SessionMode, SessionSetup,
    SessionStatus, Speaker, TranscriptEntry,
};
use crate::{Error, Result};

/// Number of questions generated for a classic session
pub const QUESTIONS_PER_SESSION: usize = 10;

/// Build a fresh in-progress session
///
/// Classic sessions keep at most [`QUESTIONS_PER_SESSION`] questions; live
/// sessions carry none.
pub fn new_session(
    id: String,
    setup: SessionSetup,
    mut questions: Vec<Question>,
    user_id: Option<String>,
) -> InterviewSession {
    match setup.mode {
        SessionMode::Classic => questions.truncate(QUESTIONS_PER_SESSION),
        SessionMode::Live => questions.clear(),
    }

    InterviewSession {
        id,
        user_id,
        job_title: setup.job_title,
        company: setup.company,
        job_description: setup.job_description,
        created_at: Utc::now(),
        status: SessionStatus::InProgress,
        mode: setup.mode,
        persona: setup.persona,
        resume_text: setup.resume_text,
        questions,
        current_question_index: 0,
        transcript: Vec::new(),
        live_session_feedback: None,
        average_score: None,
        completed_at: None,
    }
}

/// Check that an answer may be recorded for `index`
///
/// Only the active, unanswered question of an in-progress classic session
/// accepts an answer.
pub fn check_answerable(session: &InterviewSession, index: usize) -> Result<&Question> {
    if session.mode != SessionMode::Classic {
        return Err(Error::InvalidTransition(
            "answers can only be submitted in classic mode".to_string(),
        ));
    }
    if session.is_completed() {
        return Err(Error::InvalidTransition(
            "session is already completed".to_string(),
        ));
    }

    let question = session
        .questions
        .get(index)
        .ok_or_else(|| Error::NotFound(format!("question {} does not exist", index)))?;

    if question.is_answered() {
        return Err(Error::InvalidTransition(format!(
            "question {} has already been answered",
            index
        )));
    }
    if index != session.current_question_index {
        return Err(Error::InvalidInput(format!(
            "question {} is not the active question (active is {})",
            index, session.current_question_index
        )));
    }

    Ok(question)
}

/// Store an answer with its feedback and advance the session
///
/// Advances `currentQuestionIndex` by one; answering the final question
/// completes the session with its average score instead.
pub fn record_answer(
    session: &mut InterviewSession,
    index: usize,
    answer: String,
    mut feedback: Feedback,
) -> Result<()> {
    check_answerable(session, index)?;

    feedback.overall_score = feedback.overall_score.clamp(1, 10);
    let question = &mut session.questions[index];
    question.user_answer = Some(answer);
    question.feedback = Some(feedback);

    if index + 1 < session.questions.len() {
        session.current_question_index = index + 1;
        Ok(())
    } else {
        complete_classic(session)
    }
}

/// Mean `overall_score` over answered questions, 0 when nothing was answered
pub fn average_score(questions: &[Question]) -> f64 {
    let scores: Vec<f64> = questions
        .iter()
        .filter(|q| q.is_answered())
        .filter_map(|q| q.feedback.as_ref())
        .map(|f| f64::from(f.overall_score))
        .collect();

    if scores.is_empty() {
        0.0
    } else {
        scores.iter().sum::<f64>() / scores.len() as f64
    }
}

fn ensure_finishable(session: &InterviewSession, mode: SessionMode) -> Result<()> {
    if session.is_completed() {
        return Err(Error::InvalidTransition(
            "session is already completed".to_string(),
        ));
    }
    if session.mode != mode {
        return Err(Error::InvalidTransition(format!(
            "session is in {:?} mode",
            session.mode
        )));
    }
    Ok(())
}

/// Complete a classic session with its average score
pub fn complete_classic(session: &mut InterviewSession) -> Result<()> {
    ensure_finishable(session, SessionMode::Classic)?;
    session.average_score = Some(average_score(&session.questions));
    session.status = SessionStatus::Completed;
    session.completed_at = Some(Utc::now());
    Ok(())
}

/// Complete a live session with its final transcript and review
pub fn complete_live(
    session: &mut InterviewSession,
    transcript: Vec<TranscriptEntry>,
    review: LiveSessionFeedback,
) -> Result<()> {
    ensure_finishable(session, SessionMode::Live)?;
    session.transcript = transcript;
    session.live_session_feedback = Some(review);
    session.status = SessionStatus::Completed;
    session.completed_at = Some(Utc::now());
    Ok(())
}

/// Append streamed text to a transcript
///
/// A chunk from the same speaker as the last entry continues that entry;
/// a speaker change starts a new one. Empty chunks are ignored.
pub fn append_transcript(entries: &mut Vec<TranscriptEntry>, speaker: Speaker, text: &str) {
    if text.is_empty() {
        return;
    }
    match entries.last_mut() {
        Some(last) if last.speaker == speaker => last.text.push_str(text),
        _ => entries.push(TranscriptEntry::new(speaker, text)),
    }
}

/// Whether `after` only extends `before` by appending text or entries
fn is_transcript_extension(before: &[TranscriptEntry], after: &[TranscriptEntry]) -> bool {
    if after.len() < before.len() {
        return false;
    }
    let Some((last, settled)) = before.split_last() else {
        return true;
    };
    if after[..settled.len()] != *settled {
        return false;
    }
    let candidate = &after[settled.len()];
    candidate.speaker == last.speaker && candidate.text.starts_with(&last.text)
}

/// Check the invariants a stored session must satisfy on its own
///
/// Used for sessions arriving whole from a client (guest import) and as the
/// final step of [`validate_update`].
pub fn check_invariants(session: &InterviewSession) -> Result<()> {
    let reject = |msg: &str| Err(Error::InvalidTransition(msg.to_string()));

    if session.id.trim().is_empty() {
        return reject("session id is required");
    }
    if session.mode == SessionMode::Live && !session.questions.is_empty() {
        return reject("live sessions do not carry questions");
    }
    let in_range = if session.questions.is_empty() {
        session.current_question_index == 0
    } else {
        session.current_question_index < session.questions.len()
    };
    if !in_range {
        return reject("question index is out of range");
    }

    for (i, question) in session.questions.iter().enumerate() {
        match (&question.user_answer, &question.feedback) {
            (None, None) => {}
            (Some(_), Some(feedback)) => {
                if !(1..=10).contains(&feedback.overall_score) {
                    return reject("feedback scores must be between 1 and 10");
                }
                let reached = if session.is_completed() {
                    i <= session.current_question_index
                } else {
                    i < session.current_question_index
                };
                if !reached {
                    return reject("only questions already reached can carry an answer");
                }
            }
            _ => return reject("answers and feedback are recorded together"),
        }
    }

    if session.is_completed() {
        let consistent = match session.mode {
            SessionMode::Classic => {
                session.live_session_feedback.is_none()
                    && session.average_score.is_some_and(|score| {
                        (score - average_score(&session.questions)).abs() < 1e-9
                    })
            }
            SessionMode::Live => {
                session.live_session_feedback.is_some() && session.average_score.is_none()
            }
        };
        if !consistent {
            return reject("completion must carry exactly the result for its mode");
        }
    } else if session.average_score.is_some()
        || session.live_session_feedback.is_some()
        || session.completed_at.is_some()
    {
        return reject("results are only set when the session completes");
    }

    Ok(())
}

/// Validate a client-supplied replacement of a stored session
pub fn validate_update(before: &InterviewSession, after: &InterviewSession) -> Result<()> {
    let reject = |msg: &str| Err(Error::InvalidTransition(msg.to_string()));

    if after.id != before.id || after.user_id != before.user_id {
        return reject("session identity cannot change");
    }
    if after.mode != before.mode {
        return reject("session mode cannot change after creation");
    }
    if after.created_at != before.created_at {
        return reject("creation time cannot change");
    }
    if before.is_completed() {
        if after != before {
            return reject("completed sessions cannot be modified");
        }
        return Ok(());
    }

    // Results only come from record_answer, complete_classic and complete_live
    if after.status != before.status
        || after.average_score != before.average_score
        || after.live_session_feedback != before.live_session_feedback
        || after.completed_at != before.completed_at
    {
        return reject("sessions are completed through finish, not by update");
    }

    if after.current_question_index < before.current_question_index {
        return reject("question index cannot move backwards");
    }
    if after.questions != before.questions {
        return reject("questions and answers change only through answer submission");
    }
    if !is_transcript_extension(&before.transcript, &after.transcript) {
        return reject("transcript entries can only be appended");
    }

    check_invariants(after)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Difficulty, QuestionCategory};

    fn question(n: usize) -> Question {
        Question {
            text: format!("Question {}", n),
            category: QuestionCategory::Technical,
            difficulty: Difficulty::Medium,
            expected_duration: 2,
            user_answer: None,
            feedback: None,
        }
    }

    fn feedback(score: u8) -> Feedback {
        Feedback {
            overall_score: score,
            strengths: vec!["clear".to_string()],
            improvements: vec![],
            missed_points: vec![],
            suggested_structure: "STAR".to_string(),
        }
    }

    fn setup(mode: SessionMode) -> SessionSetup {
        SessionSetup {
            job_title: "Backend Engineer".to_string(),
            company: None,
            job_description: "Build APIs".to_string(),
            mode,
            persona: "Friendly Hiring Manager".to_string(),
            resume_text: None,
        }
    }

    fn classic(n: usize) -> InterviewSession {
        new_session(
            "s1".to_string(),
            setup(SessionMode::Classic),
            (0..n).map(question).collect(),
            None,
        )
    }

    #[test]
    fn test_new_classic_session_truncates_to_ten() {
        let session = classic(14);
        assert_eq!(session.questions.len(), QUESTIONS_PER_SESSION);
        assert_eq!(session.current_question_index, 0);
        assert_eq!(session.status, SessionStatus::InProgress);
    }

    #[test]
    fn test_new_live_session_has_no_questions() {
        let session = new_session(
            "s2".to_string(),
            setup(SessionMode::Live),
            vec![question(0)],
            Some("u1".to_string()),
        );
        assert!(session.questions.is_empty());
        assert_eq!(session.user_id.as_deref(), Some("u1"));
    }

    #[test]
    fn test_record_answer_advances_by_one() {
        let mut session = classic(3);
        record_answer(&mut session, 0, "answer".to_string(), feedback(8)).unwrap();
        assert_eq!(session.current_question_index, 1);
        assert_eq!(session.status, SessionStatus::InProgress);
        assert_eq!(session.questions[0].user_answer.as_deref(), Some("answer"));
    }

    #[test]
    fn test_record_answer_on_last_question_completes() {
        let mut session = classic(2);
        record_answer(&mut session, 0, "a".to_string(), feedback(6)).unwrap();
        record_answer(&mut session, 1, "b".to_string(), feedback(9)).unwrap();
        assert_eq!(session.current_question_index, 1);
        assert!(session.is_completed());
        assert_eq!(session.average_score, Some(7.5));
        assert!(session.live_session_feedback.is_none());
    }

    #[test]
    fn test_record_answer_rejects_revisit_and_skips() {
        let mut session = classic(3);
        record_answer(&mut session, 0, "a".to_string(), feedback(5)).unwrap();
        assert!(matches!(
            record_answer(&mut session, 0, "again".to_string(), feedback(5)),
            Err(Error::InvalidTransition(_))
        ));
        assert!(matches!(
            record_answer(&mut session, 2, "skip".to_string(), feedback(5)),
            Err(Error::InvalidInput(_))
        ));
        assert!(matches!(
            record_answer(&mut session, 7, "none".to_string(), feedback(5)),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn test_score_is_clamped() {
        let mut session = classic(2);
        record_answer(&mut session, 0, "a".to_string(), feedback(0)).unwrap();
        assert_eq!(session.questions[0].feedback.as_ref().unwrap().overall_score, 1);
    }

    #[test]
    fn test_average_ignores_unanswered() {
        let mut session = classic(4);
        record_answer(&mut session, 0, "a".to_string(), feedback(4)).unwrap();
        record_answer(&mut session, 1, "b".to_string(), feedback(8)).unwrap();
        assert_eq!(average_score(&session.questions), 6.0);
    }

    #[test]
    fn test_finish_without_answers_scores_zero() {
        let mut session = classic(3);
        complete_classic(&mut session).unwrap();
        assert_eq!(session.average_score, Some(0.0));
    }

    #[test]
    fn test_completion_happens_once() {
        let mut session = classic(3);
        complete_classic(&mut session).unwrap();
        assert!(matches!(
            complete_classic(&mut session),
            Err(Error::InvalidTransition(_))
        ));
    }

    #[test]
    fn test_complete_live_rejects_classic() {
        let mut session = classic(1);
        let review = LiveSessionFeedback {
            summary: "ok".to_string(),
            strengths: vec![],
            improvements: vec![],
            next_steps: vec![],
        };
        assert!(complete_live(&mut session, vec![], review).is_err());
    }

    #[test]
    fn test_append_transcript_concatenates_same_speaker() {
        let mut entries = Vec::new();
        append_transcript(&mut entries, Speaker::Ai, "Tell me ");
        append_transcript(&mut entries, Speaker::Ai, "about yourself.");
        append_transcript(&mut entries, Speaker::User, "I build");
        append_transcript(&mut entries, Speaker::User, "");
        append_transcript(&mut entries, Speaker::User, " services.");
        append_transcript(&mut entries, Speaker::Ai, "Nice.");

        assert_eq!(
            entries,
            vec![
                TranscriptEntry::new(Speaker::Ai, "Tell me about yourself."),
                TranscriptEntry::new(Speaker::User, "I build services."),
                TranscriptEntry::new(Speaker::Ai, "Nice."),
            ]
        );
    }

    #[test]
    fn test_validate_update_rules() {
        let before = classic(3);

        let mut moved = before.clone();
        moved.current_question_index = 1;
        assert!(validate_update(&before, &moved).is_ok());

        let mut mode = before.clone();
        mode.mode = SessionMode::Live;
        assert!(validate_update(&before, &mode).is_err());

        let mut out_of_range = before.clone();
        out_of_range.current_question_index = 3;
        assert!(validate_update(&before, &out_of_range).is_err());

        assert!(validate_update(&moved, &before).is_err());

        let mut done = before.clone();
        done.status = SessionStatus::Completed;
        assert!(validate_update(&before, &done).is_err());
        done.average_score = Some(0.0);
        assert!(validate_update(&before, &done).is_err());

        let mut finished = before.clone();
        complete_classic(&mut finished).unwrap();
        let mut reopened = finished.clone();
        reopened.status = SessionStatus::InProgress;
        reopened.average_score = None;
        reopened.completed_at = None;
        assert!(validate_update(&finished, &reopened).is_err());
    }

    #[test]
    fn test_validate_update_rejects_forged_results() {
        let before = classic(3);

        let mut scored = before.clone();
        scored.status = SessionStatus::Completed;
        scored.average_score = Some(9.7);
        scored.completed_at = Some(Utc::now());
        assert!(matches!(
            validate_update(&before, &scored),
            Err(Error::InvalidTransition(_))
        ));

        let mut self_graded = before.clone();
        self_graded.questions[0].user_answer = Some("perfect".to_string());
        self_graded.questions[0].feedback = Some(feedback(10));
        self_graded.current_question_index = 1;
        assert!(validate_update(&before, &self_graded).is_err());

        let mut live = new_session("l1".to_string(), setup(SessionMode::Live), vec![], None);
        let reviewed_before = live.clone();
        live.live_session_feedback = Some(LiveSessionFeedback {
            summary: "Outstanding".to_string(),
            strengths: vec![],
            improvements: vec![],
            next_steps: vec![],
        });
        assert!(validate_update(&reviewed_before, &live).is_err());
    }

    #[test]
    fn test_check_invariants() {
        let mut session = classic(2);
        assert!(check_invariants(&session).is_ok());

        session.current_question_index = 2;
        assert!(check_invariants(&session).is_err());
        session.current_question_index = 1;

        session.average_score = Some(5.0);
        assert!(check_invariants(&session).is_err());

        session.id = " ".to_string();
        session.average_score = None;
        assert!(check_invariants(&session).is_err());
    }

    #[test]
    fn test_check_invariants_rejects_forged_answers() {
        let mut answered = classic(3);
        record_answer(&mut answered, 0, "a".to_string(), feedback(6)).unwrap();
        assert!(check_invariants(&answered).is_ok());

        let mut out_of_range = answered.clone();
        out_of_range.questions[0].feedback = Some(feedback(200));
        assert!(check_invariants(&out_of_range).is_err());

        let mut without_feedback = answered.clone();
        without_feedback.questions[1].user_answer = Some("b".to_string());
        assert!(check_invariants(&without_feedback).is_err());

        let mut ahead = answered.clone();
        ahead.questions[2].user_answer = Some("c".to_string());
        ahead.questions[2].feedback = Some(feedback(7));
        assert!(check_invariants(&ahead).is_err());

        let mut completed = answered.clone();
        complete_classic(&mut completed).unwrap();
        assert!(check_invariants(&completed).is_ok());
        completed.average_score = Some(9.7);
        assert!(check_invariants(&completed).is_err());
    }

    #[test]
    fn test_validate_update_transcript_append_only() {
        let mut before = new_session(
            "l1".to_string(),
            setup(SessionMode::Live),
            vec![],
            None,
        );
        append_transcript(&mut before.transcript, Speaker::Ai, "Hello");

        let mut extended = before.clone();
        append_transcript(&mut extended.transcript, Speaker::Ai, " there");
        append_transcript(&mut extended.transcript, Speaker::User, "Hi");
        assert!(validate_update(&before, &extended).is_ok());

        let mut rewritten = before.clone();
        rewritten.transcript[0].text = "Goodbye".to_string();
        assert!(validate_update(&before, &rewritten).is_err());
    }
}

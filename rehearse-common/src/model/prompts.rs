//! Prompt templates and response schemas
//!
//! Schemas use the hosted model's OpenAPI subset (upper-case type names).

use serde_json::{json, Value};

use crate::models::{InterviewSession, Question, SessionSetup, Speaker, TranscriptEntry};
use crate::session::QUESTIONS_PER_SESSION;

fn company_clause(company: Option<&str>) -> String {
    match company {
        Some(company) if !company.trim().is_empty() => format!(" at {}", company.trim()),
        _ => String::new(),
    }
}

fn resume_block(resume: Option<&str>) -> String {
    match resume {
        Some(resume) if !resume.trim().is_empty() => format!(
            "\n\nCandidate resume (tailor questions to this background where relevant):\n{}",
            resume.trim()
        ),
        _ => String::new(),
    }
}

pub fn question_generation_prompt(setup: &SessionSetup) -> String {
    format!(
        "You are acting as an interviewer with the persona \"{persona}\".\n\
         Generate exactly {count} interview questions for a {title} role{company}.\n\n\
         Job description:\n{description}{resume}\n\n\
         Mix the categories technical, behavioral, situational and role-specific, \
         and vary difficulty between easy, medium and hard. \
         For each question give the expected answer length in minutes as expectedDuration. \
         Phrase every question the way your persona would ask it.",
        persona = setup.persona,
        count = QUESTIONS_PER_SESSION,
        title = setup.job_title,
        company = company_clause(setup.company.as_deref()),
        description = setup.job_description.trim(),
        resume = resume_block(setup.resume_text.as_deref()),
    )
}

pub fn question_schema() -> Value {
    json!({
        "type": "ARRAY",
        "items": {
            "type": "OBJECT",
            "properties": {
                "text": { "type": "STRING" },
                "category": {
                    "type": "STRING",
                    "enum": ["technical", "behavioral", "situational", "role-specific"]
                },
                "difficulty": { "type": "STRING", "enum": ["easy", "medium", "hard"] },
                "expectedDuration": { "type": "INTEGER" }
            },
            "required": ["text", "category", "difficulty", "expectedDuration"]
        }
    })
}

pub fn evaluation_prompt(session: &InterviewSession, question: &Question, answer: &str) -> String {
    format!(
        "You are an interviewer with the persona \"{persona}\" evaluating a candidate \
         for a {title} role{company}.\n\n\
         Job description:\n{description}\n\n\
         Question ({category:?}, {difficulty:?}):\n{question}\n\n\
         Candidate answer:\n{answer}\n\n\
         Score the answer from 1 (poor) to 10 (excellent) as overall_score. \
         List concrete strengths, improvements and missed_points, \
         and describe in suggested_structure how a strong answer would be organized.",
        persona = session.persona,
        title = session.job_title,
        company = company_clause(session.company.as_deref()),
        description = session.job_description.trim(),
        category = question.category,
        difficulty = question.difficulty,
        question = question.text,
        answer = answer.trim(),
    )
}

pub fn feedback_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "overall_score": { "type": "INTEGER" },
            "strengths": { "type": "ARRAY", "items": { "type": "STRING" } },
            "improvements": { "type": "ARRAY", "items": { "type": "STRING" } },
            "missed_points": { "type": "ARRAY", "items": { "type": "STRING" } },
            "suggested_structure": { "type": "STRING" }
        },
        "required": [
            "overall_score",
            "strengths",
            "improvements",
            "missed_points",
            "suggested_structure"
        ]
    })
}

/// Render a transcript as `Interviewer:` / `Candidate:` lines
pub fn render_transcript(transcript: &[TranscriptEntry]) -> String {
    transcript
        .iter()
        .map(|entry| {
            let who = match entry.speaker {
                Speaker::Ai => "Interviewer",
                Speaker::User => "Candidate",
            };
            format!("{}: {}", who, entry.text.trim())
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn live_review_prompt(session: &InterviewSession, transcript: &[TranscriptEntry]) -> String {
    format!(
        "You conducted a live mock interview as \"{persona}\" for a {title} role{company}.\n\n\
         Job description:\n{description}\n\n\
         Full transcript:\n{transcript}\n\n\
         Review the candidate's performance. Give a short summary, \
         then lists of strengths, improvements and next_steps.",
        persona = session.persona,
        title = session.job_title,
        company = company_clause(session.company.as_deref()),
        description = session.job_description.trim(),
        transcript = render_transcript(transcript),
    )
}

pub fn live_review_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "summary": { "type": "STRING" },
            "strengths": { "type": "ARRAY", "items": { "type": "STRING" } },
            "improvements": { "type": "ARRAY", "items": { "type": "STRING" } },
            "next_steps": { "type": "ARRAY", "items": { "type": "STRING" } }
        },
        "required": ["summary", "strengths", "improvements", "next_steps"]
    })
}

/// System instruction that opens a live streaming interview
pub fn live_system_instruction(session: &InterviewSession) -> String {
    format!(
        "You are \"{persona}\", interviewing a candidate for a {title} role{company}. \
         Job description: {description}{resume}\n\n\
         Conduct a realistic spoken interview: greet the candidate, ask one question at a time, \
         follow up on vague answers, and keep your turns short. \
         Do not give feedback during the interview.",
        persona = session.persona,
        title = session.job_title,
        company = company_clause(session.company.as_deref()),
        description = session.job_description.trim(),
        resume = resume_block(session.resume_text.as_deref()),
    )
}

//! # Rehearse Common Library
//!
//! Shared code for the Rehearse API service and client including:
//! - Interview session data model and lifecycle rules
//! - Prompt construction and the generative model client
//! - API request/response types
//! - Configuration loading

pub mod api;
pub mod config;
pub mod error;
pub mod model;
pub mod models;
pub mod session;

pub use error::{Error, Result};
pub use models::{
    Difficulty, Feedback, InterviewSession, LiveSessionFeedback, Question, QuestionCategory,
    SessionMode, SessionSetup, SessionStatus, Speaker, TranscriptEntry,
};

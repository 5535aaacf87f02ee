use chrono::NaiveDate;
use reqwest::StatusCode;
use thiserror::Error;

use crate::lifecycle::ActionKind;
use crate::models::{Lesson, LessonStatus};

/// Input problems caught before anything is sent to the server.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("end time {end} must be after start time {start}")]
    EndNotAfterStart { start: String, end: String },

    #[error("missing required field: {0}")]
    MissingField(&'static str),

    #[error("invalid date: {0}")]
    InvalidDate(String),

    #[error("invalid time: {0}")]
    InvalidTime(String),
}

#[derive(Debug, Error)]
pub enum LessonError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Lesson not found: {0}")]
    NotFound(String),

    #[error("Unauthorized ({status}): {body}")]
    Unauthorized { status: StatusCode, body: String },

    #[error("API error {status}: {body}")]
    Http { status: StatusCode, body: String },

    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Cannot {action} a lesson that is {from}")]
    InvalidTransition { from: LessonStatus, action: ActionKind },

    #[error("Recurring batch aborted on {date} after {} lessons: {source}", .created.len())]
    BatchAborted {
        date: NaiveDate,
        created: Vec<Lesson>,
        #[source]
        source: Box<LessonError>,
    },

    #[error("Recurring batch cancelled after {} lessons", .created.len())]
    Cancelled { created: Vec<Lesson> },

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl LessonError {
    /// Builds the error for a non-2xx response, keeping 401/403 apart.
    pub fn from_status(status: StatusCode, body: String) -> Self {
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            LessonError::Unauthorized { status, body }
        } else {
            LessonError::Http { status, body }
        }
    }

    /// True when the caller should drop its session and ask for a new login.
    pub fn is_auth_failure(&self) -> bool {
        match self {
            LessonError::Unauthorized { .. } => true,
            LessonError::BatchAborted { source, .. } => source.is_auth_failure(),
            _ => false,
        }
    }

    pub fn status(&self) -> Option<StatusCode> {
        match self {
            LessonError::Unauthorized { status, .. } | LessonError::Http { status, .. } => {
                Some(*status)
            }
            LessonError::Transport(e) => e.status(),
            LessonError::BatchAborted { source, .. } => source.status(),
            _ => None,
        }
    }
}

use std::fmt;

use serde::{Deserialize, Serialize};

/// Status stored on the server for a lesson.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LessonStatus {
    #[default]
    Svolta,
    Rimandata,
    Annullata,
}

impl LessonStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LessonStatus::Svolta => "svolta",
            LessonStatus::Rimandata => "rimandata",
            LessonStatus::Annullata => "annullata",
        }
    }

    /// No action leads out of `annullata`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, LessonStatus::Annullata)
    }
}

impl fmt::Display for LessonStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Label shown to users. `Riprogrammata` is derived, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayState {
    Svolta,
    Rimandata,
    Annullata,
    Riprogrammata,
}

impl DisplayState {
    pub fn derive(status: LessonStatus, rescheduled: bool, has_history: bool) -> Self {
        match status {
            LessonStatus::Rimandata if rescheduled && has_history => DisplayState::Riprogrammata,
            LessonStatus::Rimandata => DisplayState::Rimandata,
            LessonStatus::Svolta => DisplayState::Svolta,
            LessonStatus::Annullata => DisplayState::Annullata,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DisplayState::Svolta => "svolta",
            DisplayState::Rimandata => "rimandata",
            DisplayState::Annullata => "annullata",
            DisplayState::Riprogrammata => "riprogrammata",
        }
    }
}

impl fmt::Display for DisplayState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

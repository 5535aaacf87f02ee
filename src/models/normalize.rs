//! One entry point for the two shapes a lesson shows up in.
//!
//! API records carry `data`/`ora_inizio`/`ora_fine`; calendar events only carry
//! ISO `start`/`end` timestamps. Both are turned into a [`LessonCandidate`]
//! before any matching or state change happens.

use std::fmt;

use serde::Deserialize;
use serde_json::Value;

use super::lesson::{Lesson, LessonId};
use super::wire;

/// (date, start, end, student, room) as plain strings. Stands in for the id
/// when the id is not known; two lessons with the same key are treated as one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct NaturalKey {
    pub date: String,
    pub start_time: String,
    pub end_time: String,
    pub student_id: String,
    pub room: String,
}

impl fmt::Display for NaturalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}-{} allievo={} aula={}",
            self.date, self.start_time, self.end_time, self.student_id, self.room
        )
    }
}

impl Lesson {
    pub fn natural_key(&self) -> NaturalKey {
        NaturalKey {
            date: self.date.format(wire::DATE_FORMAT).to_string(),
            start_time: self.start_time.format(wire::TIME_FORMAT).to_string(),
            end_time: self.end_time.format(wire::TIME_FORMAT).to_string(),
            student_id: self.student_id.to_string(),
            room: self.room.clone(),
        }
    }

    pub fn candidate(&self) -> LessonCandidate {
        LessonCandidate {
            id: self.id,
            teacher_id: Some(self.teacher_id),
            key: self.natural_key(),
        }
    }
}

/// Any lesson-shaped JSON object, API record or calendar event.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LessonLike {
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub id_insegnante: Option<Value>,
    #[serde(default)]
    pub id_allievo: Option<Value>,
    #[serde(default)]
    pub data: Option<String>,
    #[serde(default)]
    pub ora_inizio: Option<String>,
    #[serde(default)]
    pub ora_fine: Option<String>,
    #[serde(default)]
    pub start: Option<String>,
    #[serde(default)]
    pub end: Option<String>,
    #[serde(default)]
    pub aula: Option<Value>,
}

/// What is known about a lesson the caller wants to act on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LessonCandidate {
    pub id: Option<LessonId>,
    pub teacher_id: Option<i64>,
    pub key: NaturalKey,
}

impl LessonLike {
    pub fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }

    /// Record fields win; event timestamps fill the gaps. Missing pieces
    /// become empty strings rather than errors.
    pub fn normalize(&self) -> LessonCandidate {
        let date = non_empty(&self.data)
            .or(non_empty(&self.start))
            .map(|raw| wire::date_part(raw).to_string())
            .unwrap_or_default();
        let start_time = match non_empty(&self.ora_inizio) {
            Some(raw) => wire::time_part(raw).to_string(),
            None => non_empty(&self.start)
                .map(|raw| wire::timestamp_time_part(raw).to_string())
                .unwrap_or_default(),
        };
        let end_time = match non_empty(&self.ora_fine) {
            Some(raw) => wire::time_part(raw).to_string(),
            None => non_empty(&self.end)
                .map(|raw| wire::timestamp_time_part(raw).to_string())
                .unwrap_or_default(),
        };

        LessonCandidate {
            id: self.id.as_ref().and_then(wire::loose_i64).map(LessonId),
            teacher_id: self.id_insegnante.as_ref().and_then(wire::loose_i64),
            key: NaturalKey {
                date,
                start_time,
                end_time,
                student_id: wire::loose_string(self.id_allievo.as_ref()),
                room: wire::loose_string(self.aula.as_ref()),
            },
        }
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}

impl From<&Lesson> for LessonCandidate {
    fn from(lesson: &Lesson) -> Self {
        lesson.candidate()
    }
}

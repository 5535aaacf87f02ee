use std::fmt;

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Deserializer, Serialize};

use super::status::{DisplayState, LessonStatus};
use super::wire;
use crate::error::ValidationError;

/// Server-assigned lesson identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct LessonId(pub i64);

impl<'de> Deserialize<'de> for LessonId {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let raw = serde_json::Value::deserialize(d)?;
        wire::loose_i64(&raw)
            .map(LessonId)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid lesson id: {raw}")))
    }
}

impl fmt::Display for LessonId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A previous date/time/room of a lesson, kept when it gets rescheduled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleSnapshot {
    #[serde(rename = "data", with = "wire::date")]
    pub date: NaiveDate,
    #[serde(rename = "ora_inizio", with = "wire::time")]
    pub start_time: NaiveTime,
    #[serde(rename = "ora_fine", with = "wire::time")]
    pub end_time: NaiveTime,
    #[serde(rename = "aula")]
    pub room: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lesson {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<LessonId>,
    #[serde(rename = "id_insegnante")]
    pub teacher_id: i64,
    #[serde(rename = "id_allievo")]
    pub student_id: i64,
    #[serde(rename = "data", with = "wire::date")]
    pub date: NaiveDate,
    #[serde(rename = "ora_inizio", with = "wire::time")]
    pub start_time: NaiveTime,
    #[serde(rename = "ora_fine", with = "wire::time")]
    pub end_time: NaiveTime,
    #[serde(rename = "aula")]
    pub room: String,
    #[serde(rename = "stato", default)]
    pub status: LessonStatus,
    #[serde(
        rename = "riprogrammata",
        default,
        deserialize_with = "wire::flag::deserialize"
    )]
    pub rescheduled: bool,
    #[serde(rename = "motivazione", default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(rename = "storico", default, skip_serializing_if = "Vec::is_empty")]
    pub history: Vec<ScheduleSnapshot>,
}

impl Lesson {
    pub fn display_state(&self) -> DisplayState {
        DisplayState::derive(self.status, self.rescheduled, !self.history.is_empty())
    }

    pub fn schedule(&self) -> ScheduleSnapshot {
        ScheduleSnapshot {
            date: self.date,
            start_time: self.start_time,
            end_time: self.end_time,
            room: self.room.clone(),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_window(self.start_time, self.end_time)?;
        validate_room(&self.room)
    }
}

/// Every lesson field except the date; one lesson per recurrence date is built from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LessonTemplate {
    pub teacher_id: i64,
    pub student_id: i64,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub room: String,
    pub reason: Option<String>,
    pub status: LessonStatus,
}

impl LessonTemplate {
    pub fn new(
        teacher_id: i64,
        student_id: i64,
        start_time: NaiveTime,
        end_time: NaiveTime,
        room: impl Into<String>,
    ) -> Self {
        Self {
            teacher_id,
            student_id,
            start_time,
            end_time,
            room: room.into(),
            reason: None,
            status: LessonStatus::default(),
        }
    }

    /// Parses `HH:MM` form input and checks it.
    pub fn parse(
        teacher_id: i64,
        student_id: i64,
        start_time: &str,
        end_time: &str,
        room: &str,
    ) -> Result<Self, ValidationError> {
        if start_time.trim().is_empty() {
            return Err(ValidationError::MissingField("ora_inizio"));
        }
        if end_time.trim().is_empty() {
            return Err(ValidationError::MissingField("ora_fine"));
        }
        let template = Self::new(
            teacher_id,
            student_id,
            wire::parse_time(start_time)?,
            wire::parse_time(end_time)?,
            room.trim(),
        );
        template.validate()?;
        Ok(template)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_window(self.start_time, self.end_time)?;
        validate_room(&self.room)
    }

    /// The creation payload for one date.
    pub fn at(&self, date: NaiveDate) -> Lesson {
        Lesson {
            id: None,
            teacher_id: self.teacher_id,
            student_id: self.student_id,
            date,
            start_time: self.start_time,
            end_time: self.end_time,
            room: self.room.clone(),
            status: self.status,
            rescheduled: false,
            reason: self.reason.clone(),
            history: Vec::new(),
        }
    }
}

pub(crate) fn validate_window(start: NaiveTime, end: NaiveTime) -> Result<(), ValidationError> {
    if end <= start {
        return Err(ValidationError::EndNotAfterStart {
            start: start.format(wire::TIME_FORMAT).to_string(),
            end: end.format(wire::TIME_FORMAT).to_string(),
        });
    }
    Ok(())
}

pub(crate) fn validate_room(room: &str) -> Result<(), ValidationError> {
    if room.trim().is_empty() {
        return Err(ValidationError::MissingField("aula"));
    }
    Ok(())
}

//! Lesson status transitions.
//!
//! | from                     | action     | to          |
//! |--------------------------|------------|-------------|
//! | `svolta`                 | postpone   | `rimandata` |
//! | `svolta` / `rimandata`   | cancel     | `annullata` |
//! | `rimandata`              | reschedule | `rimandata` (flagged, history grows) |
//! | any                      | edit       | unchanged unless overridden |
//!
//! Nothing leaves `annullata`. Everything here is pure: the service layer
//! decides when the result is shown locally and when it is sent.

use std::fmt;

use chrono::{NaiveDate, NaiveTime};

use crate::error::LessonError;
use crate::models::lesson::{validate_room, validate_window};
use crate::models::{Lesson, LessonStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    Postpone,
    Cancel,
    Reschedule,
    Edit,
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ActionKind::Postpone => "postpone",
            ActionKind::Cancel => "cancel",
            ActionKind::Reschedule => "reschedule",
            ActionKind::Edit => "edit",
        })
    }
}

/// New date, time window and room for a lesson.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleChange {
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub room: String,
}

/// Full overwrite of the caller-owned fields. `status` and `teacher_id`
/// stay as they are when `None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LessonEdit {
    pub schedule: ScheduleChange,
    pub student_id: i64,
    pub reason: Option<String>,
    pub status: Option<LessonStatus>,
    pub teacher_id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LessonAction {
    Postpone { reason: String },
    Cancel { reason: String },
    Reschedule { schedule: ScheduleChange, reason: Option<String> },
    Edit(LessonEdit),
}

impl LessonAction {
    pub fn kind(&self) -> ActionKind {
        match self {
            LessonAction::Postpone { .. } => ActionKind::Postpone,
            LessonAction::Cancel { .. } => ActionKind::Cancel,
            LessonAction::Reschedule { .. } => ActionKind::Reschedule,
            LessonAction::Edit(_) => ActionKind::Edit,
        }
    }
}

/// Status an action moves to from `from`, or `None` if the move is not allowed.
pub fn next_status(from: LessonStatus, action: &LessonAction) -> Option<LessonStatus> {
    use LessonStatus::*;

    match (from, action) {
        (Svolta, LessonAction::Postpone { .. }) => Some(Rimandata),
        (Svolta | Rimandata, LessonAction::Cancel { .. }) => Some(Annullata),
        (Rimandata, LessonAction::Reschedule { .. }) => Some(Rimandata),
        (Annullata, LessonAction::Edit(edit)) => match edit.status {
            None | Some(Annullata) => Some(Annullata),
            Some(_) => None,
        },
        (current, LessonAction::Edit(edit)) => Some(edit.status.unwrap_or(current)),
        _ => None,
    }
}

/// Returns the lesson as it looks after `action`, leaving the input untouched.
pub fn apply(lesson: &Lesson, action: &LessonAction) -> Result<Lesson, LessonError> {
    let to = next_status(lesson.status, action).ok_or(LessonError::InvalidTransition {
        from: lesson.status,
        action: action.kind(),
    })?;

    let mut next = lesson.clone();
    next.status = to;

    match action {
        LessonAction::Postpone { reason } | LessonAction::Cancel { reason } => {
            next.rescheduled = false;
            next.reason = Some(reason.clone());
        }
        LessonAction::Reschedule { schedule, reason } => {
            check_schedule(schedule)?;
            next.history.push(lesson.schedule());
            write_schedule(&mut next, schedule);
            next.rescheduled = true;
            if reason.is_some() {
                next.reason = reason.clone();
            }
        }
        LessonAction::Edit(edit) => {
            check_schedule(&edit.schedule)?;
            write_schedule(&mut next, &edit.schedule);
            next.student_id = edit.student_id;
            next.reason = edit.reason.clone();
            if let Some(teacher_id) = edit.teacher_id {
                next.teacher_id = teacher_id;
            }
        }
    }

    Ok(next)
}

fn check_schedule(schedule: &ScheduleChange) -> Result<(), LessonError> {
    validate_window(schedule.start_time, schedule.end_time)?;
    validate_room(&schedule.room)?;
    Ok(())
}

fn write_schedule(lesson: &mut Lesson, schedule: &ScheduleChange) {
    lesson.date = schedule.date;
    lesson.start_time = schedule.start_time;
    lesson.end_time = schedule.end_time;
    lesson.room = schedule.room.clone();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ValidationError;
    use crate::models::{DisplayState, LessonId, LessonTemplate};

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn lesson() -> Lesson {
        let mut lesson = LessonTemplate::new(1, 2, t(10, 0), t(11, 0), "A1").at(d(2024, 5, 1));
        lesson.id = Some(LessonId(5));
        lesson
    }

    fn move_to_friday() -> ScheduleChange {
        ScheduleChange {
            date: d(2024, 5, 3),
            start_time: t(16, 0),
            end_time: t(17, 0),
            room: "B2".to_string(),
        }
    }

    #[test]
    fn postpone_then_cancel_never_reads_as_riprogrammata() {
        let postponed = apply(&lesson(), &LessonAction::Postpone {
            reason: "malattia".to_string(),
        })
        .unwrap();
        assert_eq!(postponed.status, LessonStatus::Rimandata);
        assert!(!postponed.rescheduled);
        assert_eq!(postponed.reason.as_deref(), Some("malattia"));

        let cancelled = apply(&postponed, &LessonAction::Cancel {
            reason: "ritirato".to_string(),
        })
        .unwrap();
        assert_eq!(cancelled.status, LessonStatus::Annullata);
        assert!(cancelled.history.is_empty());
        assert_ne!(cancelled.display_state(), DisplayState::Riprogrammata);
        assert_eq!(cancelled.display_state(), DisplayState::Annullata);
    }

    #[test]
    fn reschedule_records_previous_slot() {
        let postponed = apply(&lesson(), &LessonAction::Postpone {
            reason: String::new(),
        })
        .unwrap();
        let moved = apply(&postponed, &LessonAction::Reschedule {
            schedule: move_to_friday(),
            reason: None,
        })
        .unwrap();

        assert_eq!(moved.status, LessonStatus::Rimandata);
        assert!(moved.rescheduled);
        assert_eq!(moved.date, d(2024, 5, 3));
        assert_eq!(moved.room, "B2");
        assert_eq!(moved.history, vec![lesson().schedule()]);
        assert_eq!(moved.display_state(), DisplayState::Riprogrammata);
    }

    #[test]
    fn reschedule_requires_postponed_lesson() {
        let err = apply(&lesson(), &LessonAction::Reschedule {
            schedule: move_to_friday(),
            reason: None,
        })
        .unwrap_err();

        assert!(matches!(
            err,
            LessonError::InvalidTransition {
                from: LessonStatus::Svolta,
                action: ActionKind::Reschedule
            }
        ));
    }

    #[test]
    fn annullata_is_terminal() {
        let mut cancelled = lesson();
        cancelled.status = LessonStatus::Annullata;

        for action in [
            LessonAction::Postpone { reason: String::new() },
            LessonAction::Cancel { reason: String::new() },
            LessonAction::Reschedule { schedule: move_to_friday(), reason: None },
        ] {
            assert_eq!(next_status(LessonStatus::Annullata, &action), None);
        }

        let revive = LessonAction::Edit(LessonEdit {
            schedule: move_to_friday(),
            student_id: 2,
            reason: None,
            status: Some(LessonStatus::Svolta),
            teacher_id: None,
        });
        assert!(apply(&cancelled, &revive).is_err());
    }

    #[test]
    fn postpone_twice_is_rejected() {
        let postponed = apply(&lesson(), &LessonAction::Postpone { reason: String::new() }).unwrap();
        assert!(apply(&postponed, &LessonAction::Postpone { reason: String::new() }).is_err());
    }

    #[test]
    fn edit_keeps_status_unless_overridden() {
        let edit = LessonEdit {
            schedule: move_to_friday(),
            student_id: 8,
            reason: Some("cambio aula".to_string()),
            status: None,
            teacher_id: None,
        };
        let edited = apply(&lesson(), &LessonAction::Edit(edit.clone())).unwrap();
        assert_eq!(edited.status, LessonStatus::Svolta);
        assert_eq!(edited.student_id, 8);
        assert_eq!(edited.teacher_id, 1);
        assert!(edited.history.is_empty());

        let overridden = apply(&lesson(), &LessonAction::Edit(LessonEdit {
            status: Some(LessonStatus::Rimandata),
            teacher_id: Some(4),
            ..edit
        }))
        .unwrap();
        assert_eq!(overridden.status, LessonStatus::Rimandata);
        assert_eq!(overridden.teacher_id, 4);
    }

    #[test]
    fn invalid_window_is_a_validation_error() {
        let mut schedule = move_to_friday();
        schedule.end_time = t(15, 0);
        let err = apply(&lesson(), &LessonAction::Edit(LessonEdit {
            schedule,
            student_id: 2,
            reason: None,
            status: None,
            teacher_id: None,
        }))
        .unwrap_err();

        assert!(matches!(
            err,
            LessonError::Validation(ValidationError::EndNotAfterStart { .. })
        ));
    }
}

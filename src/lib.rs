pub mod calendar;
pub mod client;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod models;
pub mod recurrence;
pub mod resolver;
pub mod services;
pub mod session;

pub use calendar::LessonCalendar;
pub use client::{HttpLessonApi, InMemoryLessonApi, LessonApi};
pub use config::ApiConfig;
pub use error::{LessonError, ValidationError};
pub use recurrence::{BatchOutcome, FailurePolicy, RecurrenceExpander, RecurrenceRequest, WeeklyRecurrence};
pub use services::LessonService;
pub use session::{Mode, Session};

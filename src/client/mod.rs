pub mod http;
pub mod memory;

use async_trait::async_trait;

use crate::error::LessonError;
use crate::models::{Lesson, LessonId};
use crate::session::Session;

pub use http::HttpLessonApi;
pub use memory::{InMemoryLessonApi, Operation};

/// The remote lessons API. Non-2xx answers come back as
/// [`LessonError::Unauthorized`] or [`LessonError::Http`] with status and body.
#[async_trait]
pub trait LessonApi: Send + Sync {
    /// Every lesson of a teacher, fetched fresh (never served from a cache).
    async fn list_lessons(&self, session: &Session, teacher_id: i64)
        -> Result<Vec<Lesson>, LessonError>;

    /// `Ok(None)` when the server answers 404.
    async fn get_lesson(&self, session: &Session, id: LessonId)
        -> Result<Option<Lesson>, LessonError>;

    async fn create_lesson(&self, session: &Session, lesson: &Lesson) -> Result<Lesson, LessonError>;

    /// Full-record replace: every field of `lesson` is sent.
    async fn replace_lesson(
        &self,
        session: &Session,
        id: LessonId,
        lesson: &Lesson,
    ) -> Result<Lesson, LessonError>;

    async fn postpone_lesson(
        &self,
        session: &Session,
        id: LessonId,
        reason: &str,
    ) -> Result<Lesson, LessonError>;

    async fn cancel_lesson(
        &self,
        session: &Session,
        id: LessonId,
        reason: &str,
    ) -> Result<Lesson, LessonError>;

    async fn delete_lesson(&self, session: &Session, id: LessonId) -> Result<(), LessonError>;
}

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::StatusCode;

use super::LessonApi;
use crate::error::LessonError;
use crate::models::{Lesson, LessonId, LessonStatus};
use crate::session::Session;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    List,
    Get,
    Create,
    Replace,
    Postpone,
    Cancel,
    Delete,
}

#[derive(Default)]
struct Store {
    lessons: Vec<Lesson>,
    next_id: i64,
    calls: HashMap<Operation, usize>,
    create_attempts: Vec<NaiveDate>,
    failing_dates: HashSet<NaiveDate>,
    failing_ops: HashMap<Operation, StatusCode>,
}

/// Lessons API kept in memory. Behaves like the server for the operations
/// the core uses, counts every call and can be told to fail.
pub struct InMemoryLessonApi {
    store: Mutex<Store>,
    token: Option<String>,
}

impl Default for InMemoryLessonApi {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryLessonApi {
    pub fn new() -> Self {
        Self {
            store: Mutex::new(Store {
                next_id: 1,
                ..Store::default()
            }),
            token: None,
        }
    }

    /// Rejects with 401 any call whose session does not carry `token`.
    pub fn require_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Stores a lesson as the server would, assigning an id when it has none.
    pub fn insert(&self, mut lesson: Lesson) -> Lesson {
        let mut store = self.lock();
        match lesson.id {
            Some(LessonId(id)) => store.next_id = store.next_id.max(id + 1),
            None => {
                lesson.id = Some(LessonId(store.next_id));
                store.next_id += 1;
            }
        }
        store.lessons.push(lesson.clone());
        lesson
    }

    /// Creating a lesson on `date` answers 409.
    pub fn fail_create_on(&self, date: NaiveDate) {
        self.lock().failing_dates.insert(date);
    }

    pub fn fail_operation(&self, op: Operation, status: StatusCode) {
        self.lock().failing_ops.insert(op, status);
    }

    pub fn clear_failure(&self, op: Operation) {
        self.lock().failing_ops.remove(&op);
    }

    pub fn calls(&self, op: Operation) -> usize {
        self.lock().calls.get(&op).copied().unwrap_or(0)
    }

    /// Dates of every create call, in arrival order, failed ones included.
    pub fn create_attempts(&self) -> Vec<NaiveDate> {
        self.lock().create_attempts.clone()
    }

    pub fn lessons(&self) -> Vec<Lesson> {
        self.lock().lessons.clone()
    }

    pub fn lesson(&self, id: LessonId) -> Option<Lesson> {
        self.lock().lessons.iter().find(|l| l.id == Some(id)).cloned()
    }

    fn lock(&self) -> MutexGuard<'_, Store> {
        self.store.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn enter(&self, session: &Session, op: Operation) -> Result<MutexGuard<'_, Store>, LessonError> {
        let mut store = self.lock();
        *store.calls.entry(op).or_insert(0) += 1;

        if let Some(expected) = &self.token {
            if session.token() != Some(expected.as_str()) {
                return Err(LessonError::from_status(
                    StatusCode::UNAUTHORIZED,
                    "token non valido".to_string(),
                ));
            }
        }
        if let Some(status) = store.failing_ops.get(&op) {
            return Err(LessonError::from_status(*status, format!("{:?} failed", op)));
        }
        Ok(store)
    }

    fn update(
        &self,
        session: &Session,
        op: Operation,
        id: LessonId,
        change: impl FnOnce(&mut Lesson),
    ) -> Result<Lesson, LessonError> {
        let mut store = self.enter(session, op)?;
        let lesson = store
            .lessons
            .iter_mut()
            .find(|l| l.id == Some(id))
            .ok_or_else(|| LessonError::from_status(StatusCode::NOT_FOUND, "Not Found".to_string()))?;
        change(lesson);
        Ok(lesson.clone())
    }
}

#[async_trait]
impl LessonApi for InMemoryLessonApi {
    async fn list_lessons(
        &self,
        session: &Session,
        teacher_id: i64,
    ) -> Result<Vec<Lesson>, LessonError> {
        let store = self.enter(session, Operation::List)?;
        Ok(store
            .lessons
            .iter()
            .filter(|l| l.teacher_id == teacher_id)
            .cloned()
            .collect())
    }

    async fn get_lesson(
        &self,
        session: &Session,
        id: LessonId,
    ) -> Result<Option<Lesson>, LessonError> {
        let store = self.enter(session, Operation::Get)?;
        Ok(store.lessons.iter().find(|l| l.id == Some(id)).cloned())
    }

    async fn create_lesson(&self, session: &Session, lesson: &Lesson) -> Result<Lesson, LessonError> {
        {
            let mut store = self.enter(session, Operation::Create)?;
            store.create_attempts.push(lesson.date);
            if store.failing_dates.contains(&lesson.date) {
                return Err(LessonError::from_status(
                    StatusCode::CONFLICT,
                    format!("aula occupata il {}", lesson.date),
                ));
            }
        }
        let mut created = lesson.clone();
        created.id = None;
        Ok(self.insert(created))
    }

    async fn replace_lesson(
        &self,
        session: &Session,
        id: LessonId,
        lesson: &Lesson,
    ) -> Result<Lesson, LessonError> {
        self.update(session, Operation::Replace, id, |stored| {
            *stored = Lesson {
                id: Some(id),
                ..lesson.clone()
            };
        })
    }

    async fn postpone_lesson(
        &self,
        session: &Session,
        id: LessonId,
        reason: &str,
    ) -> Result<Lesson, LessonError> {
        self.update(session, Operation::Postpone, id, |stored| {
            stored.status = LessonStatus::Rimandata;
            stored.rescheduled = false;
            stored.reason = Some(reason.to_string());
        })
    }

    async fn cancel_lesson(
        &self,
        session: &Session,
        id: LessonId,
        reason: &str,
    ) -> Result<Lesson, LessonError> {
        self.update(session, Operation::Cancel, id, |stored| {
            stored.status = LessonStatus::Annullata;
            stored.rescheduled = false;
            stored.reason = Some(reason.to_string());
        })
    }

    async fn delete_lesson(&self, session: &Session, id: LessonId) -> Result<(), LessonError> {
        let mut store = self.enter(session, Operation::Delete)?;
        let before = store.lessons.len();
        store.lessons.retain(|l| l.id != Some(id));
        if store.lessons.len() == before {
            return Err(LessonError::from_status(StatusCode::NOT_FOUND, "Not Found".to_string()));
        }
        Ok(())
    }
}

use std::sync::Arc;

use tracing::{info, warn};

use crate::calendar::LessonCalendar;
use crate::client::LessonApi;
use crate::error::LessonError;
use crate::lifecycle::{self, LessonAction, LessonEdit, ScheduleChange};
use crate::models::{Lesson, LessonCandidate, LessonId, LessonTemplate};
use crate::recurrence::{
    BatchOutcome, FailurePolicy, RecurrenceExpander, RecurrenceRequest, WeeklyRecurrence,
};
use crate::resolver::resolve_lesson_id;
use crate::session::{Mode, Session};

#[derive(Debug, Clone, Copy)]
enum StatusEndpoint {
    Postpone,
    Cancel,
}

impl StatusEndpoint {
    fn action(self, reason: &str) -> LessonAction {
        let reason = reason.to_string();
        match self {
            StatusEndpoint::Postpone => LessonAction::Postpone { reason },
            StatusEndpoint::Cancel => LessonAction::Cancel { reason },
        }
    }
}

/// Runs lesson actions for one user against the API, keeping a
/// [`LessonCalendar`] in step with the server.
pub struct LessonService {
    api: Arc<dyn LessonApi>,
    session: Session,
    mode: Mode,
    failure_policy: FailurePolicy,
}

impl LessonService {
    pub fn new(api: Arc<dyn LessonApi>, session: Session, mode: Mode) -> Self {
        Self {
            api,
            session,
            failure_policy: mode.default_failure_policy(),
            mode,
        }
    }

    /// Overrides the recurring-batch policy the mode would pick.
    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Reloads the calendar from the server.
    pub async fn refresh(&self, calendar: &mut LessonCalendar) -> Result<u64, LessonError> {
        let ticket = calendar.begin_refetch();
        let lessons = self
            .api
            .list_lessons(&self.session, calendar.teacher_id())
            .await?;
        Ok(calendar.complete_refetch(ticket, lessons))
    }

    pub async fn create(
        &self,
        calendar: &mut LessonCalendar,
        lesson: &Lesson,
    ) -> Result<Lesson, LessonError> {
        lesson.validate()?;
        let created = self.api.create_lesson(&self.session, lesson).await?;
        info!("Created lesson {:?} on {}", created.id, created.date);
        self.resync(calendar).await;
        Ok(created)
    }

    /// Creates one lesson per week from `recurrence`, then reloads the calendar.
    pub async fn create_weekly(
        &self,
        calendar: &mut LessonCalendar,
        recurrence: WeeklyRecurrence,
        template: LessonTemplate,
    ) -> Result<BatchOutcome, LessonError> {
        let request = RecurrenceRequest::new(recurrence, template);
        let result = self
            .expander()
            .create_all(&self.session, &request)
            .await;
        self.resync(calendar).await;
        result
    }

    pub fn expander(&self) -> RecurrenceExpander {
        RecurrenceExpander::new(self.api.clone(), self.failure_policy)
    }

    pub async fn postpone(
        &self,
        calendar: &mut LessonCalendar,
        candidate: &LessonCandidate,
        reason: &str,
    ) -> Result<Lesson, LessonError> {
        self.change_status(calendar, candidate, StatusEndpoint::Postpone, reason)
            .await
    }

    pub async fn cancel(
        &self,
        calendar: &mut LessonCalendar,
        candidate: &LessonCandidate,
        reason: &str,
    ) -> Result<Lesson, LessonError> {
        self.change_status(calendar, candidate, StatusEndpoint::Cancel, reason)
            .await
    }

    /// Moves a postponed lesson to a new slot. Sent as a full replace.
    pub async fn reschedule(
        &self,
        calendar: &mut LessonCalendar,
        candidate: &LessonCandidate,
        schedule: ScheduleChange,
        reason: Option<String>,
    ) -> Result<Lesson, LessonError> {
        let action = LessonAction::Reschedule { schedule, reason };
        self.replace(calendar, candidate, action).await
    }

    pub async fn edit(
        &self,
        calendar: &mut LessonCalendar,
        candidate: &LessonCandidate,
        edit: LessonEdit,
    ) -> Result<Lesson, LessonError> {
        if edit.teacher_id.is_some_and(|t| t != calendar.teacher_id()) && !self.mode.can_reassign()
        {
            return Err(LessonError::Forbidden(
                "moving a lesson to another teacher".to_string(),
            ));
        }
        self.replace(calendar, candidate, LessonAction::Edit(edit)).await
    }

    pub async fn delete(
        &self,
        calendar: &mut LessonCalendar,
        candidate: &LessonCandidate,
    ) -> Result<LessonId, LessonError> {
        if !self.mode.can_delete() {
            return Err(LessonError::Forbidden("deleting lessons".to_string()));
        }

        let result = async {
            let id = self.resolve(calendar, candidate).await?;
            self.api.delete_lesson(&self.session, id).await?;
            info!("Deleted lesson {}", id);
            Ok::<_, LessonError>(id)
        }
        .await;

        self.resync(calendar).await;
        result
    }

    /// Postpone and cancel: optimistic local patch, dedicated endpoint,
    /// then a re-fetch whatever the outcome.
    async fn change_status(
        &self,
        calendar: &mut LessonCalendar,
        candidate: &LessonCandidate,
        endpoint: StatusEndpoint,
        reason: &str,
    ) -> Result<Lesson, LessonError> {
        let action = endpoint.action(reason);
        let previous = calendar.find(candidate).cloned();
        if let Some(local) = &previous {
            let guess = lifecycle::apply(local, &action)?;
            calendar.patch_by_key(&local.natural_key(), guess);
        }

        let result = async {
            let id = self.resolve(calendar, candidate).await?;
            let updated = match endpoint {
                StatusEndpoint::Postpone => {
                    self.api.postpone_lesson(&self.session, id, reason).await?
                }
                StatusEndpoint::Cancel => self.api.cancel_lesson(&self.session, id, reason).await?,
            };
            info!("Lesson {} is now {}", id, updated.status);
            Ok::<_, LessonError>(updated)
        }
        .await;

        if let Err(e) = &result {
            warn!("{} failed, reverting to server state: {}", action.kind(), e);
        }
        let reloaded = self.resync(calendar).await;
        if result.is_err() && !reloaded {
            if let Some(local) = previous {
                calendar.patch_by_key(&local.natural_key(), local);
            }
        }
        result
    }

    /// Reschedule and edit: full-record replace of the current lesson.
    async fn replace(
        &self,
        calendar: &mut LessonCalendar,
        candidate: &LessonCandidate,
        action: LessonAction,
    ) -> Result<Lesson, LessonError> {
        let id = self.resolve(calendar, candidate).await?;

        let current = match calendar.find(candidate) {
            Some(local) if local.id.is_none_or(|local_id| local_id == id) => local.clone(),
            _ => self
                .api
                .get_lesson(&self.session, id)
                .await?
                .ok_or_else(|| LessonError::NotFound(format!("lesson {}", id)))?,
        };

        let mut next = lifecycle::apply(&current, &action)?;
        next.id = Some(id);

        let result = self.api.replace_lesson(&self.session, id, &next).await;
        match &result {
            Ok(updated) => info!("Lesson {} replaced ({})", id, updated.display_state()),
            Err(e) => warn!("{} of lesson {} failed: {}", action.kind(), id, e),
        }
        self.resync(calendar).await;
        result
    }

    async fn resolve(
        &self,
        calendar: &LessonCalendar,
        candidate: &LessonCandidate,
    ) -> Result<LessonId, LessonError> {
        let teacher_id = candidate.teacher_id.unwrap_or(calendar.teacher_id());
        resolve_lesson_id(self.api.as_ref(), &self.session, teacher_id, candidate).await
    }

    /// A failed re-fetch leaves the calendar as it is and returns false; the
    /// action's own result is what the caller gets.
    async fn resync(&self, calendar: &mut LessonCalendar) -> bool {
        match self.refresh(calendar).await {
            Ok(_) => true,
            Err(e) => {
                warn!("Failed to reload lessons: {}", e);
                false
            }
        }
    }
}

//! Weekly recurring lessons.
//!
//! Dates are plain calendar dates (`NaiveDate`): adding a week never goes
//! through a timezone, so DST changes cannot shift an occurrence.

use std::iter::FusedIterator;
use std::sync::Arc;

use chrono::{Days, NaiveDate};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, info, info_span, warn};
use uuid::Uuid;

use crate::client::LessonApi;
use crate::error::{LessonError, ValidationError};
use crate::models::wire;
use crate::models::{Lesson, LessonTemplate};
use crate::session::Session;

const CADENCE_DAYS: u64 = 7;

/// Every `CADENCE_DAYS` from `start` up to and including `until`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeeklyRecurrence {
    start: NaiveDate,
    until: NaiveDate,
}

impl WeeklyRecurrence {
    pub fn new(start: NaiveDate, until: NaiveDate) -> Self {
        Self { start, until }
    }

    /// Parses two `YYYY-MM-DD` form values.
    pub fn parse(start: &str, until: &str) -> Result<Self, ValidationError> {
        if start.trim().is_empty() {
            return Err(ValidationError::MissingField("data"));
        }
        if until.trim().is_empty() {
            return Err(ValidationError::MissingField("data_fine"));
        }
        Ok(Self::new(wire::parse_date(start)?, wire::parse_date(until)?))
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn until(&self) -> NaiveDate {
        self.until
    }

    /// A fresh iterator each call, so the sequence can be walked again.
    pub fn dates(&self) -> Occurrences {
        Occurrences {
            next: (self.start <= self.until).then_some(self.start),
            until: self.until,
        }
    }

    /// Same number `dates()` yields, without walking it.
    pub fn occurrence_count(&self) -> usize {
        if self.until < self.start {
            return 0;
        }
        let days = (self.until - self.start).num_days().unsigned_abs();
        (days / CADENCE_DAYS) as usize + 1
    }

    /// Confirmation sentence for the form.
    pub fn preview_text(&self) -> String {
        match self.occurrence_count() {
            0 => "Nessuna lezione verrà creata".to_string(),
            1 => format!("Verrà creata 1 lezione il {}", self.start.format("%d/%m/%Y")),
            n => format!(
                "Verranno create {} lezioni settimanali dal {} al {}",
                n,
                self.start.format("%d/%m/%Y"),
                self.until.format("%d/%m/%Y")
            ),
        }
    }
}

impl IntoIterator for &WeeklyRecurrence {
    type Item = NaiveDate;
    type IntoIter = Occurrences;

    fn into_iter(self) -> Occurrences {
        self.dates()
    }
}

#[derive(Debug, Clone)]
pub struct Occurrences {
    next: Option<NaiveDate>,
    until: NaiveDate,
}

impl Iterator for Occurrences {
    type Item = NaiveDate;

    fn next(&mut self) -> Option<NaiveDate> {
        let current = self.next?;
        self.next = current
            .checked_add_days(Days::new(CADENCE_DAYS))
            .filter(|d| *d <= self.until);
        Some(current)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self
            .next
            .map(|next| WeeklyRecurrence::new(next, self.until).occurrence_count())
            .unwrap_or(0);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Occurrences {}

impl FusedIterator for Occurrences {}

/// A batch to create: one lesson per date of `recurrence`, built from `template`.
#[derive(Debug, Clone)]
pub struct RecurrenceRequest {
    pub recurrence: WeeklyRecurrence,
    pub template: LessonTemplate,
}

impl RecurrenceRequest {
    pub fn new(recurrence: WeeklyRecurrence, template: LessonTemplate) -> Self {
        Self {
            recurrence,
            template,
        }
    }

    pub fn payloads(&self) -> impl Iterator<Item = Lesson> + '_ {
        self.recurrence.dates().map(|date| self.template.at(date))
    }
}

/// What happens when one occurrence cannot be created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Record the failure and go on with the next date.
    ContinueOnError,
    /// Stop and return [`LessonError::BatchAborted`]; lessons already created stay.
    AbortOnError,
}

#[derive(Debug)]
pub struct OccurrenceFailure {
    pub date: NaiveDate,
    pub error: LessonError,
}

#[derive(Debug)]
pub struct BatchOutcome {
    pub batch_id: Uuid,
    pub requested: usize,
    pub created: Vec<Lesson>,
    pub failures: Vec<OccurrenceFailure>,
}

impl BatchOutcome {
    /// How many occurrences were asked for but not created.
    pub fn shortfall(&self) -> usize {
        self.requested - self.created.len()
    }

    pub fn is_complete(&self) -> bool {
        self.failures.is_empty() && self.created.len() == self.requested
    }

    /// Set when one of the swallowed failures was a 401/403.
    pub fn auth_failure(&self) -> Option<&LessonError> {
        self.failures
            .iter()
            .map(|f| &f.error)
            .find(|e| e.is_auth_failure())
    }
}

/// Creates recurring lessons one at a time, in date order.
pub struct RecurrenceExpander {
    api: Arc<dyn LessonApi>,
    policy: FailurePolicy,
}

impl RecurrenceExpander {
    pub fn new(api: Arc<dyn LessonApi>, policy: FailurePolicy) -> Self {
        Self { api, policy }
    }

    pub fn policy(&self) -> FailurePolicy {
        self.policy
    }

    pub async fn create_all(
        &self,
        session: &Session,
        request: &RecurrenceRequest,
    ) -> Result<BatchOutcome, LessonError> {
        self.create_all_with_cancel(session, request, &CancellationToken::new())
            .await
    }

    /// Like [`create_all`](Self::create_all), checking `cancel` before each
    /// occurrence. Lessons created before cancellation are not rolled back.
    pub async fn create_all_with_cancel(
        &self,
        session: &Session,
        request: &RecurrenceRequest,
        cancel: &CancellationToken,
    ) -> Result<BatchOutcome, LessonError> {
        request.template.validate()?;

        let batch_id = Uuid::new_v4();
        let requested = request.recurrence.occurrence_count();
        let span = info_span!("recurring_batch", %batch_id, requested, policy = ?self.policy);

        async move {
            info!(
                "Creating {} weekly lessons from {} to {}",
                requested,
                request.recurrence.start(),
                request.recurrence.until()
            );

            let mut created = Vec::with_capacity(requested);
            let mut failures = Vec::new();

            for payload in request.payloads() {
                if cancel.is_cancelled() {
                    warn!("Batch cancelled after {} lessons", created.len());
                    return Err(LessonError::Cancelled { created });
                }

                let date = payload.date;
                match self.api.create_lesson(session, &payload).await {
                    Ok(lesson) => created.push(lesson),
                    Err(error) => match self.policy {
                        FailurePolicy::ContinueOnError => {
                            warn!("Failed to create lesson on {}: {}", date, error);
                            failures.push(OccurrenceFailure { date, error });
                        }
                        FailurePolicy::AbortOnError => {
                            warn!("Aborting batch on {}: {}", date, error);
                            return Err(LessonError::BatchAborted {
                                date,
                                created,
                                source: Box::new(error),
                            });
                        }
                    },
                }
            }

            info!(
                "Batch finished: {} created, {} failed",
                created.len(),
                failures.len()
            );

            Ok(BatchOutcome {
                batch_id,
                requested,
                created,
                failures,
            })
        }
        .instrument(span)
        .await
    }
}

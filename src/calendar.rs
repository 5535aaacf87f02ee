use tracing::debug;

use crate::models::{Lesson, LessonCandidate, NaturalKey};

/// Handed out when a re-fetch starts; given back with its result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefetchTicket {
    issued: u64,
}

/// A teacher's lessons as the caller currently shows them.
///
/// Changed only by optimistic patches and by whole-list replacement after a
/// re-fetch. The re-fetch that completes last wins, whenever it was issued.
#[derive(Debug, Clone)]
pub struct LessonCalendar {
    teacher_id: i64,
    lessons: Vec<Lesson>,
    issued: u64,
    revision: u64,
    applied_ticket: Option<u64>,
}

impl LessonCalendar {
    pub fn new(teacher_id: i64) -> Self {
        Self {
            teacher_id,
            lessons: Vec::new(),
            issued: 0,
            revision: 0,
            applied_ticket: None,
        }
    }

    pub fn teacher_id(&self) -> i64 {
        self.teacher_id
    }

    pub fn lessons(&self) -> &[Lesson] {
        &self.lessons
    }

    /// Bumped on every change, optimistic or authoritative.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn find_by_key(&self, key: &NaturalKey) -> Option<&Lesson> {
        self.lessons.iter().find(|l| &l.natural_key() == key)
    }

    /// Looks `candidate` up by natural key, then by id.
    pub fn find(&self, candidate: &LessonCandidate) -> Option<&Lesson> {
        self.find_by_key(&candidate.key).or_else(|| {
            let id = candidate.id?;
            self.lessons.iter().find(|l| l.id == Some(id))
        })
    }

    /// Replaces the first lesson matching `key`. Returns false when none does.
    pub fn patch_by_key(&mut self, key: &NaturalKey, patched: Lesson) -> bool {
        match self.lessons.iter_mut().find(|l| &l.natural_key() == key) {
            Some(slot) => {
                *slot = patched;
                self.revision += 1;
                true
            }
            None => false,
        }
    }

    pub fn begin_refetch(&mut self) -> RefetchTicket {
        self.issued += 1;
        RefetchTicket {
            issued: self.issued,
        }
    }

    /// Takes the fetched list as the new truth, dropping any optimistic patch.
    pub fn complete_refetch(&mut self, ticket: RefetchTicket, lessons: Vec<Lesson>) -> u64 {
        if let Some(previous) = self.applied_ticket {
            if previous > ticket.issued {
                debug!(
                    "Re-fetch #{} completed after #{}; it replaces the newer one",
                    ticket.issued, previous
                );
            }
        }
        self.lessons = lessons;
        self.applied_ticket = Some(ticket.issued);
        self.revision += 1;
        self.revision
    }

    pub fn replace_all(&mut self, lessons: Vec<Lesson>) -> u64 {
        let ticket = self.begin_refetch();
        self.complete_refetch(ticket, lessons)
    }
}

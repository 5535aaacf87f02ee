use tracing::{debug, info};

use crate::client::LessonApi;
use crate::error::LessonError;
use crate::models::{LessonCandidate, LessonId};
use crate::session::Session;

/// Finds the server id of `candidate`.
///
/// A known id that the server still has is trusted as is. Otherwise (no id, or
/// 404) the teacher's lessons are scanned for the first one with the same
/// natural key. The by-id lookup always finishes before the scan starts.
pub async fn resolve_lesson_id(
    api: &dyn LessonApi,
    session: &Session,
    teacher_id: i64,
    candidate: &LessonCandidate,
) -> Result<LessonId, LessonError> {
    if let Some(id) = candidate.id {
        if api.get_lesson(session, id).await?.is_some() {
            debug!("Lesson {} confirmed by id", id);
            return Ok(id);
        }
        info!("Lesson {} not found by id, matching on {}", id, candidate.key);
    }

    let lessons = api.list_lessons(session, teacher_id).await?;
    let matched = lessons
        .iter()
        .find(|lesson| lesson.natural_key() == candidate.key)
        .ok_or_else(|| LessonError::NotFound(candidate.key.to_string()))?;
    matched
        .id
        .ok_or_else(|| LessonError::NotFound(format!("{} (server record has no id)", candidate.key)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{InMemoryLessonApi, Operation};
    use crate::models::{Lesson, LessonLike, LessonTemplate};
    use async_trait::async_trait;
    use chrono::{NaiveDate, NaiveTime};
    use reqwest::StatusCode;
    use serde_json::json;

    fn seeded() -> (InMemoryLessonApi, LessonId) {
        let api = InMemoryLessonApi::new();
        api.insert(
            LessonTemplate::new(
                1,
                9,
                NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
                NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
                "A2",
            )
            .at(NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()),
        );
        let target = api.insert(
            LessonTemplate::new(
                1,
                9,
                NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
                NaiveTime::from_hms_opt(11, 0, 0).unwrap(),
                "A2",
            )
            .at(NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()),
        );
        (api, target.id.unwrap())
    }

    fn event(id: Option<i64>) -> LessonCandidate {
        LessonLike::from_value(json!({
            "id": id,
            "start": "2024-05-01T10:00:00",
            "end": "2024-05-01T11:00:00",
            "id_allievo": 9,
            "aula": "A2"
        }))
        .unwrap()
        .normalize()
    }

    #[tokio::test]
    async fn known_id_skips_the_scan() {
        let (api, id) = seeded();
        let session = Session::bearer("t", 1);

        let resolved = resolve_lesson_id(&api, &session, 1, &event(Some(id.0))).await.unwrap();

        assert_eq!(resolved, id);
        assert_eq!(api.calls(Operation::Get), 1);
        assert_eq!(api.calls(Operation::List), 0);
    }

    #[tokio::test]
    async fn trusted_id_is_not_revalidated_against_fields() {
        let (api, _) = seeded();
        let mut candidate = event(Some(1));
        candidate.key.room = "altrove".to_string();

        let resolved = resolve_lesson_id(&api, &Session::bearer("t", 1), 1, &candidate)
            .await
            .unwrap();

        assert_eq!(resolved, LessonId(1));
        assert_eq!(api.calls(Operation::List), 0);
    }

    #[tokio::test]
    async fn stale_id_falls_back_to_natural_key() {
        let (api, id) = seeded();

        let resolved = resolve_lesson_id(&api, &Session::bearer("t", 1), 1, &event(Some(999)))
            .await
            .unwrap();

        assert_eq!(resolved, id);
        assert_eq!(api.calls(Operation::Get), 1);
        assert_eq!(api.calls(Operation::List), 1);
    }

    #[tokio::test]
    async fn missing_id_matches_by_key() {
        let (api, id) = seeded();

        let resolved = resolve_lesson_id(&api, &Session::bearer("t", 1), 1, &event(None))
            .await
            .unwrap();

        assert_eq!(resolved, id);
        assert_eq!(api.calls(Operation::Get), 0);
    }

    #[tokio::test]
    async fn no_match_is_not_found() {
        let (api, _) = seeded();
        let mut candidate = event(None);
        candidate.key.start_time = "18:00".to_string();

        let err = resolve_lesson_id(&api, &Session::bearer("t", 1), 1, &candidate)
            .await
            .unwrap_err();

        assert!(matches!(err, LessonError::NotFound(_)));
    }

    /// Serves a fixed lesson list; nothing else is expected.
    struct FixedList(Vec<Lesson>);

    #[async_trait]
    impl LessonApi for FixedList {
        async fn list_lessons(&self, _: &Session, _: i64) -> Result<Vec<Lesson>, LessonError> {
            Ok(self.0.clone())
        }

        async fn get_lesson(&self, _: &Session, _: LessonId) -> Result<Option<Lesson>, LessonError> {
            Ok(None)
        }

        async fn create_lesson(&self, _: &Session, _: &Lesson) -> Result<Lesson, LessonError> {
            Err(LessonError::from_status(StatusCode::METHOD_NOT_ALLOWED, String::new()))
        }

        async fn replace_lesson(
            &self,
            _: &Session,
            _: LessonId,
            _: &Lesson,
        ) -> Result<Lesson, LessonError> {
            Err(LessonError::from_status(StatusCode::METHOD_NOT_ALLOWED, String::new()))
        }

        async fn postpone_lesson(&self, _: &Session, _: LessonId, _: &str) -> Result<Lesson, LessonError> {
            Err(LessonError::from_status(StatusCode::METHOD_NOT_ALLOWED, String::new()))
        }

        async fn cancel_lesson(&self, _: &Session, _: LessonId, _: &str) -> Result<Lesson, LessonError> {
            Err(LessonError::from_status(StatusCode::METHOD_NOT_ALLOWED, String::new()))
        }

        async fn delete_lesson(&self, _: &Session, _: LessonId) -> Result<(), LessonError> {
            Err(LessonError::from_status(StatusCode::METHOD_NOT_ALLOWED, String::new()))
        }
    }

    #[tokio::test]
    async fn first_key_match_wins_even_without_id() {
        let lesson = LessonTemplate::new(
            1,
            9,
            NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
            NaiveTime::from_hms_opt(11, 0, 0).unwrap(),
            "A2",
        )
        .at(NaiveDate::from_ymd_opt(2024, 5, 1).unwrap());
        let duplicate = Lesson {
            id: Some(LessonId(5)),
            ..lesson.clone()
        };
        let api = FixedList(vec![lesson, duplicate]);

        let err = resolve_lesson_id(&api, &Session::bearer("t", 1), 1, &event(None))
            .await
            .unwrap_err();

        assert!(matches!(err, LessonError::NotFound(_)));
    }

    #[tokio::test]
    async fn server_errors_are_not_turned_into_not_found() {
        let (api, _) = seeded();
        api.fail_operation(Operation::Get, StatusCode::INTERNAL_SERVER_ERROR);

        let err = resolve_lesson_id(&api, &Session::bearer("t", 1), 1, &event(Some(2)))
            .await
            .unwrap_err();

        assert_eq!(err.status(), Some(StatusCode::INTERNAL_SERVER_ERROR));
        assert_eq!(api.calls(Operation::List), 0);
    }
}

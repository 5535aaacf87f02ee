use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, error};

use super::LessonApi;
use crate::config::ApiConfig;
use crate::error::LessonError;
use crate::models::{Lesson, LessonId};
use crate::session::Session;

#[derive(Debug, Serialize)]
struct ReasonRequest<'a> {
    motivazione: &'a str,
}

pub struct HttpLessonApi {
    client: Client,
    config: ApiConfig,
}

impl HttpLessonApi {
    pub fn new(config: ApiConfig) -> Result<Self, LessonError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| LessonError::Config(format!("Failed to build http client: {}", e)))?;
        Ok(Self { client, config })
    }

    fn authorized(&self, request: RequestBuilder, session: &Session) -> RequestBuilder {
        match session.token() {
            Some(token) => request.header("Authorization", format!("Bearer {}", token)),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder, session: &Session) -> Result<Response, LessonError> {
        let response = self.authorized(request, session).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            debug!("lessons API answered {}: {}", status, body);
            return Err(LessonError::from_status(status, body));
        }

        Ok(response)
    }

    async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, LessonError> {
        let body = response.text().await?;
        serde_json::from_str::<T>(&body).map_err(|e| {
            error!("Failed to parse lessons API response: {}", e);
            LessonError::Decode(e)
        })
    }

    async fn patch_reason(
        &self,
        session: &Session,
        id: LessonId,
        action: &str,
        reason: &str,
    ) -> Result<Lesson, LessonError> {
        let url = self.config.url(&format!("lezioni/{}/{}", id, action));
        debug!("PATCH {}", url);

        let request = self
            .client
            .patch(&url)
            .json(&ReasonRequest { motivazione: reason });
        let response = self.send(request, session).await?;
        Self::read_json(response).await
    }
}

#[async_trait]
impl LessonApi for HttpLessonApi {
    async fn list_lessons(
        &self,
        session: &Session,
        teacher_id: i64,
    ) -> Result<Vec<Lesson>, LessonError> {
        // the timestamp keeps intermediaries from serving a stale list
        let url = self.config.url(&format!(
            "lezioni/insegnante/{}?t={}",
            teacher_id,
            Utc::now().timestamp_millis()
        ));
        debug!("GET {}", url);

        let response = self.send(self.client.get(&url), session).await?;
        Self::read_json(response).await
    }

    async fn get_lesson(
        &self,
        session: &Session,
        id: LessonId,
    ) -> Result<Option<Lesson>, LessonError> {
        let url = self.config.url(&format!("lezioni/{}", id));
        debug!("GET {}", url);

        match self.send(self.client.get(&url), session).await {
            Ok(response) => Self::read_json(response).await.map(Some),
            Err(LessonError::Http { status, .. }) if status == StatusCode::NOT_FOUND => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn create_lesson(&self, session: &Session, lesson: &Lesson) -> Result<Lesson, LessonError> {
        let url = self.config.url("lezioni");
        debug!("POST {} data={}", url, lesson.date);

        let response = self.send(self.client.post(&url).json(lesson), session).await?;
        Self::read_json(response).await
    }

    async fn replace_lesson(
        &self,
        session: &Session,
        id: LessonId,
        lesson: &Lesson,
    ) -> Result<Lesson, LessonError> {
        let url = self.config.url(&format!("lezioni/{}", id));
        debug!("PUT {}", url);

        let response = self.send(self.client.put(&url).json(lesson), session).await?;
        Self::read_json(response).await
    }

    async fn postpone_lesson(
        &self,
        session: &Session,
        id: LessonId,
        reason: &str,
    ) -> Result<Lesson, LessonError> {
        self.patch_reason(session, id, "rimanda", reason).await
    }

    async fn cancel_lesson(
        &self,
        session: &Session,
        id: LessonId,
        reason: &str,
    ) -> Result<Lesson, LessonError> {
        self.patch_reason(session, id, "annulla", reason).await
    }

    async fn delete_lesson(&self, session: &Session, id: LessonId) -> Result<(), LessonError> {
        let url = self.config.url(&format!("lezioni/{}", id));
        debug!("DELETE {}", url);

        self.send(self.client.delete(&url), session).await?;
        Ok(())
    }
}

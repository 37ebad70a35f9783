//! The exam service the attempt lifecycle talks to.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ServiceError;
use crate::model::{AnswerMap, AttemptResult, AttemptSnapshot, PublishedExam};

/// Operations the portal exposes to a member taking an exam.
#[async_trait]
pub trait ExamService: Send + Sync {
    /// Starts the member's attempt, or resumes it when one is already open.
    async fn acquire_attempt(&self, exam_id: &str) -> Result<AttemptSnapshot, ServiceError>;

    async fn save_progress(&self, attempt_id: &str, answers: &AnswerMap)
        -> Result<(), ServiceError>;

    /// Finalizes the attempt.
    async fn submit_attempt(
        &self,
        attempt_id: &str,
        answers: &AnswerMap,
    ) -> Result<(), ServiceError>;

    async fn published_exams(&self) -> Result<Vec<PublishedExam>, ServiceError>;

    async fn my_results(&self) -> Result<Vec<AttemptResult>, ServiceError>;
}

/// `ExamService` over the portal's JSON REST API.
#[derive(Clone)]
pub struct HttpExamService {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl HttpExamService {
    pub fn new(
        base_url: &str,
        token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, ServiceError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        debug!(%method, %url, "exam service request");
        let builder = self.client.request(method, url);
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send_ack(&self, builder: RequestBuilder) -> Result<(), ServiceError> {
        let response = builder.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_failure(status.as_u16(), &body));
        }
        Ok(())
    }

    async fn fetch<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, ServiceError> {
        let response = builder.send().await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(classify_failure(status.as_u16(), &body));
        }
        decode_envelope(&body)
    }
}

#[async_trait]
impl ExamService for HttpExamService {
    async fn acquire_attempt(&self, exam_id: &str) -> Result<AttemptSnapshot, ServiceError> {
        let builder = self.request(Method::POST, &format!("exams/{}/attempt", exam_id));
        self.fetch(builder).await
    }

    async fn save_progress(
        &self,
        attempt_id: &str,
        answers: &AnswerMap,
    ) -> Result<(), ServiceError> {
        let builder = self
            .request(Method::PATCH, "exams/save")
            .json(&AnswersRequest { attempt_id, answers });
        self.send_ack(builder).await
    }

    async fn submit_attempt(
        &self,
        attempt_id: &str,
        answers: &AnswerMap,
    ) -> Result<(), ServiceError> {
        let builder = self
            .request(Method::POST, "exams/submit")
            .json(&AnswersRequest { attempt_id, answers });
        self.send_ack(builder).await
    }

    async fn published_exams(&self) -> Result<Vec<PublishedExam>, ServiceError> {
        let list: ExamList = self.fetch(self.request(Method::GET, "exams/published")).await?;
        Ok(list.exams)
    }

    async fn my_results(&self) -> Result<Vec<AttemptResult>, ServiceError> {
        let list: ResultList = self.fetch(self.request(Method::GET, "results/my")).await?;
        Ok(list.results)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AnswersRequest<'a> {
    attempt_id: &'a str,
    answers: &'a AnswerMap,
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: T,
}

#[derive(Debug, Deserialize)]
struct ExamList {
    #[serde(default)]
    exams: Vec<PublishedExam>,
}

#[derive(Debug, Deserialize)]
struct ResultList {
    #[serde(default)]
    results: Vec<AttemptResult>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
    error: Option<String>,
}

fn decode_envelope<T: DeserializeOwned>(body: &str) -> Result<T, ServiceError> {
    serde_json::from_str::<Envelope<T>>(body)
        .map(|e| e.data)
        .map_err(|e| ServiceError::Decode(e.to_string()))
}

/// Maps a non-success response onto the error taxonomy.
///
/// The portal reports a finished attempt only through its message text
/// ("already taken", "already submitted"), whatever the status code.
pub fn classify_failure(status: u16, body: &str) -> ServiceError {
    let message = serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.message.or(b.error))
        .unwrap_or_else(|| format!("HTTP {}", status));

    let lowered = message.to_lowercase();
    if lowered.contains("already taken") || lowered.contains("submitted") {
        ServiceError::AlreadyCompleted(message)
    } else if status == 401 {
        ServiceError::Unauthorized(message)
    } else {
        ServiceError::Rejected { status, message }
    }
}

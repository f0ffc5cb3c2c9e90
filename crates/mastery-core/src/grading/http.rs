//! HTTP client for the external evaluation service.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::TaskDescriptor;

use super::{Grade, Grader, GraderError};

#[derive(Debug, Serialize)]
struct GradeRequest<'a> {
    task: &'a str,
    max_score: u32,
    input: &'a str,
}

#[derive(Debug, Deserialize)]
struct GradeResponse {
    score: f64,
    #[serde(default)]
    feedback: Option<String>,
}

/// Grader backed by a remote evaluation endpoint.
///
/// Sends `POST {url}` with `{task, max_score, input}` and expects
/// `{score, feedback}`. Fractional scores are rounded down.
pub struct HttpGrader {
    url: String,
    http_client: reqwest::Client,
}

impl HttpGrader {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, GraderError> {
        let http_client = reqwest::Client::builder()
            .user_agent(concat!("mastery-core/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(|e| GraderError::Unavailable(e.to_string()))?;
        Ok(Self {
            url: url.into(),
            http_client,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl Grader for HttpGrader {
    async fn grade(&self, task: &TaskDescriptor, input: &str) -> Result<Grade, GraderError> {
        let request = GradeRequest {
            task: &task.id,
            max_score: task.max_score,
            input,
        };
        let response = self
            .http_client
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .map_err(|e| GraderError::Unavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(GraderError::Unavailable(format!("HTTP {status}")));
        }

        let body: GradeResponse = response
            .json()
            .await
            .map_err(|e| GraderError::InvalidResponse(e.to_string()))?;
        debug!(task_id = %task.id, score = body.score, "Grader responded");

        if !body.score.is_finite() || body.score < 0.0 {
            return Err(GraderError::InvalidResponse(format!(
                "score {} is not a non-negative number",
                body.score
            )));
        }
        let score = body.score.floor() as u32;
        if score > task.max_score {
            return Err(GraderError::OutOfRange {
                score,
                max_score: task.max_score,
            });
        }
        Ok(Grade {
            score,
            feedback: body.feedback.unwrap_or_default(),
        })
    }
}

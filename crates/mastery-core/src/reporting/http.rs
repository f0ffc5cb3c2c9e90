//! HTTP delivery of completion records.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

use super::{CompletionSink, DeliveryAck, DeliveryError, FinalScores, TaskCompletion};

/// Default path of the per-task logging endpoint.
pub const DEFAULT_TASK_ENDPOINT: &str = "/api/progress/task";

/// Default path of the final-score endpoint.
pub const DEFAULT_FINAL_ENDPOINT: &str = "/api/progress/final";

/// Posts completion records as JSON to the backend of record.
pub struct HttpCompletionSink {
    base_url: String,
    task_endpoint: String,
    final_endpoint: String,
    http_client: reqwest::Client,
}

impl HttpCompletionSink {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, DeliveryError> {
        let http_client = reqwest::Client::builder()
            .user_agent(concat!("mastery-core/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(|e| DeliveryError::Transport(e.to_string()))?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            task_endpoint: DEFAULT_TASK_ENDPOINT.to_string(),
            final_endpoint: DEFAULT_FINAL_ENDPOINT.to_string(),
            http_client,
        })
    }

    /// Override the endpoint paths.
    pub fn with_endpoints(mut self, task: impl Into<String>, final_scores: impl Into<String>) -> Self {
        self.task_endpoint = task.into();
        self.final_endpoint = final_scores.into();
        self
    }

    pub fn task_url(&self) -> String {
        format!("{}{}", self.base_url, self.task_endpoint)
    }

    pub fn final_url(&self) -> String {
        format!("{}{}", self.base_url, self.final_endpoint)
    }

    async fn post<T: Serialize + Sync>(
        &self,
        url: String,
        body: &T,
    ) -> Result<DeliveryAck, DeliveryError> {
        let response = self
            .http_client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| DeliveryError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DeliveryError::Status(status.as_u16()));
        }

        let ack: DeliveryAck = response
            .json()
            .await
            .map_err(|e| DeliveryError::Malformed(e.to_string()))?;
        if !ack.success {
            return Err(DeliveryError::Rejected);
        }
        Ok(ack)
    }
}

#[async_trait]
impl CompletionSink for HttpCompletionSink {
    async fn task_completed(&self, record: &TaskCompletion) -> Result<DeliveryAck, DeliveryError> {
        self.post(self.task_url(), record).await
    }

    async fn session_completed(
        &self,
        record: &FinalScores,
    ) -> Result<DeliveryAck, DeliveryError> {
        self.post(self.final_url(), record).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    use mastery_store::UnitKey;

    use crate::domain::TaskDescriptor;

    fn completion() -> TaskCompletion {
        let unit = UnitKey::new("phase1", "step1", "B1").unwrap();
        TaskCompletion::new(&unit, &TaskDescriptor::new("taskA", 0, 10), 7)
    }

    async fn deliver_task(status: usize, body: &str) -> Result<DeliveryAck, DeliveryError> {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", DEFAULT_TASK_ENDPOINT)
            .match_body(mockito::Matcher::PartialJson(serde_json::json!({
                "phase": "phase1",
                "level": "B1",
                "task": "taskA",
                "score": 7,
                "completed": true,
            })))
            .with_status(status)
            .with_header("content-type", "application/json")
            .with_body(body)
            .create_async()
            .await;

        let sink = HttpCompletionSink::new(server.url(), Duration::from_secs(2)).unwrap();
        let result = sink.task_completed(&completion()).await;
        mock.assert_async().await;
        result
    }

    #[tokio::test]
    async fn test_successful_ack_is_returned() {
        let ack = deliver_task(200, r#"{"success": true, "data": {"id": 12}}"#)
            .await
            .unwrap();
        assert!(ack.success);
        assert_eq!(ack.data, Some(serde_json::json!({"id": 12})));
    }

    #[tokio::test]
    async fn test_unsuccessful_ack_is_rejected() {
        let err = deliver_task(200, r#"{"success": false}"#).await.unwrap_err();
        assert!(matches!(err, DeliveryError::Rejected));
    }

    #[tokio::test]
    async fn test_error_status_is_reported() {
        let err = deliver_task(500, r#"{"success": true}"#).await.unwrap_err();
        assert!(matches!(err, DeliveryError::Status(500)));
    }

    #[tokio::test]
    async fn test_malformed_ack_is_reported() {
        let err = deliver_task(200, "<html>ok</html>").await.unwrap_err();
        assert!(matches!(err, DeliveryError::Malformed(_)));
    }

    #[tokio::test]
    async fn test_final_scores_go_to_final_endpoint() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/log/final")
            .match_body(mockito::Matcher::PartialJson(serde_json::json!({
                "level": "C1",
                "total": 17,
                "passed": true,
            })))
            .with_status(201)
            .with_body(r#"{"success": true}"#)
            .create_async()
            .await;

        let sink = HttpCompletionSink::new(server.url(), Duration::from_secs(2))
            .unwrap()
            .with_endpoints("/log/task", "/log/final");
        let record = FinalScores {
            phase: "phase4".to_string(),
            step: "step2".to_string(),
            level: "C1".to_string(),
            attempt: "attempt-1".to_string(),
            scores: BTreeMap::from([("taskA".to_string(), 17)]),
            total: 17,
            max_total: 18,
            passed: true,
        };
        let ack = sink.session_completed(&record).await.unwrap();
        assert!(ack.success);
        mock.assert_async().await;
    }

    #[test]
    fn test_urls_join_without_double_slash() {
        let sink = HttpCompletionSink::new("https://lms.example.org/", Duration::from_secs(5))
            .unwrap()
            .with_endpoints("/log/task", "/log/final");
        assert_eq!(sink.task_url(), "https://lms.example.org/log/task");
        assert_eq!(sink.final_url(), "https://lms.example.org/log/final");
    }

    #[test]
    fn test_default_endpoints() {
        let sink = HttpCompletionSink::new("http://localhost:8000", Duration::from_secs(5)).unwrap();
        assert_eq!(sink.task_url(), "http://localhost:8000/api/progress/task");
        assert_eq!(sink.final_url(), "http://localhost:8000/api/progress/final");
    }
}

//! Reporting of task and session outcomes to the backend of record.
//!
//! Delivery is best-effort and at-most-once: a failed write is logged on
//! the diagnostic channel and dropped. Nothing here ever gates navigation.

pub mod http;
pub mod logger;

use std::collections::BTreeMap;

use async_trait::async_trait;
use mastery_store::UnitKey;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::domain::{Outcome, TaskDescriptor};

pub use http::HttpCompletionSink;
pub use logger::{CompletionLogger, DeliveryHandle};

/// Per-task completion payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskCompletion {
    pub phase: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step: Option<String>,
    pub level: String,
    pub task: String,
    pub score: u32,
    pub max_score: u32,
    pub completed: bool,
}

impl TaskCompletion {
    pub fn new(unit: &UnitKey, task: &TaskDescriptor, score: u32) -> Self {
        Self {
            phase: unit.phase().to_string(),
            step: Some(unit.step().to_string()),
            level: unit.level().to_string(),
            task: task.id.clone(),
            score,
            max_score: task.max_score,
            completed: true,
        }
    }
}

/// Final-score payload of one attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalScores {
    pub phase: String,
    pub step: String,
    pub level: String,
    pub attempt: String,
    pub scores: BTreeMap<String, u32>,
    pub total: u32,
    pub max_total: u32,
    pub passed: bool,
}

impl From<&Outcome> for FinalScores {
    fn from(outcome: &Outcome) -> Self {
        Self {
            phase: outcome.unit.phase().to_string(),
            step: outcome.unit.step().to_string(),
            level: outcome.unit.level().to_string(),
            attempt: outcome.attempt.to_string(),
            scores: outcome.per_task.clone(),
            total: outcome.total,
            max_total: outcome.max_total,
            passed: outcome.passed,
        }
    }
}

/// Backend acknowledgement: `{success, data?}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryAck {
    pub success: bool,
    #[serde(default)]
    pub data: Option<serde_json::Value>,
}

impl DeliveryAck {
    pub fn ok() -> Self {
        Self {
            success: true,
            data: None,
        }
    }
}

/// Reasons a completion record did not reach the backend.
#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("backend answered HTTP {0}")]
    Status(u16),

    #[error("backend rejected the record")]
    Rejected,

    #[error("malformed acknowledgement: {0}")]
    Malformed(String),
}

/// Destination of completion records.
#[async_trait]
pub trait CompletionSink: Send + Sync {
    async fn task_completed(&self, record: &TaskCompletion) -> Result<DeliveryAck, DeliveryError>;

    async fn session_completed(&self, record: &FinalScores)
        -> Result<DeliveryAck, DeliveryError>;
}

/// Sink used when no backend is configured: records go to the log only.
#[derive(Debug, Default)]
pub struct TracingSink;

#[async_trait]
impl CompletionSink for TracingSink {
    async fn task_completed(&self, record: &TaskCompletion) -> Result<DeliveryAck, DeliveryError> {
        info!(
            event = "completion.task",
            level = %record.level,
            task = %record.task,
            score = record.score,
            max_score = record.max_score,
        );
        Ok(DeliveryAck::ok())
    }

    async fn session_completed(
        &self,
        record: &FinalScores,
    ) -> Result<DeliveryAck, DeliveryError> {
        info!(
            event = "completion.session",
            level = %record.level,
            total = record.total,
            passed = record.passed,
        );
        Ok(DeliveryAck::ok())
    }
}

//! In-memory fakes for the grading and reporting seams (testing only)
//!
//! Provides `ScriptedGrader`, `FailingGrader` and `MemoryCompletionSink`
//! that satisfy the trait contracts without any network access.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;

use crate::domain::TaskDescriptor;
use crate::grading::{Grade, Grader, GraderError};
use crate::reporting::{CompletionSink, DeliveryAck, DeliveryError, FinalScores, TaskCompletion};

// ---------------------------------------------------------------------------
// Graders
// ---------------------------------------------------------------------------

/// Grader answering a fixed score per task id.
///
/// Tasks without a scripted score fail with `GraderError::Unavailable`.
#[derive(Debug, Default)]
pub struct ScriptedGrader {
    scores: HashMap<String, u32>,
    delay: Option<Duration>,
    calls: AtomicU64,
}

impl ScriptedGrader {
    pub fn new<'a>(scores: impl IntoIterator<Item = (&'a str, u32)>) -> Self {
        Self {
            scores: scores
                .into_iter()
                .map(|(id, score)| (id.to_string(), score))
                .collect(),
            delay: None,
            calls: AtomicU64::new(0),
        }
    }

    /// Sleep before answering, to exercise grader timeouts.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Grader for ScriptedGrader {
    async fn grade(&self, task: &TaskDescriptor, _input: &str) -> Result<Grade, GraderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.scores
            .get(&task.id)
            .map(|score| Grade {
                score: *score,
                feedback: format!("scripted score for {}", task.id),
            })
            .ok_or_else(|| GraderError::Unavailable(format!("no script for {}", task.id)))
    }
}

/// Grader that is always down.
#[derive(Debug, Default)]
pub struct FailingGrader {
    calls: AtomicU64,
}

impl FailingGrader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Grader for FailingGrader {
    async fn grade(&self, _task: &TaskDescriptor, _input: &str) -> Result<Grade, GraderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(GraderError::Unavailable("connection refused".to_string()))
    }
}

// ---------------------------------------------------------------------------
// MemoryCompletionSink
// ---------------------------------------------------------------------------

/// Sink recording every delivered payload; can be switched to failing.
///
/// Failed deliveries are not recorded.
#[derive(Debug, Default)]
pub struct MemoryCompletionSink {
    tasks: Mutex<Vec<TaskCompletion>>,
    sessions: Mutex<Vec<FinalScores>>,
    fail_tasks: AtomicBool,
    fail_sessions: AtomicBool,
}

impl MemoryCompletionSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make per-task deliveries fail with a transport error.
    pub fn fail_tasks(&self, fail: bool) {
        self.fail_tasks.store(fail, Ordering::SeqCst);
    }

    /// Make final-score deliveries fail with a transport error.
    pub fn fail_sessions(&self, fail: bool) {
        self.fail_sessions.store(fail, Ordering::SeqCst);
    }

    pub fn tasks(&self) -> Vec<TaskCompletion> {
        self.tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn sessions(&self) -> Vec<FinalScores> {
        self.sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl CompletionSink for MemoryCompletionSink {
    async fn task_completed(&self, record: &TaskCompletion) -> Result<DeliveryAck, DeliveryError> {
        if self.fail_tasks.load(Ordering::SeqCst) {
            return Err(DeliveryError::Transport("simulated network error".to_string()));
        }
        self.tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(record.clone());
        Ok(DeliveryAck::ok())
    }

    async fn session_completed(
        &self,
        record: &FinalScores,
    ) -> Result<DeliveryAck, DeliveryError> {
        if self.fail_sessions.load(Ordering::SeqCst) {
            return Err(DeliveryError::Transport("simulated network error".to_string()));
        }
        self.sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(record.clone());
        Ok(DeliveryAck::ok())
    }
}

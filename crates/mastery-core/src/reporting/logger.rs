//! Fire-and-forget completion logger.

use std::sync::Arc;

use tokio::task::JoinHandle;

use super::{CompletionSink, DeliveryAck, DeliveryError, FinalScores, TaskCompletion};
use crate::metrics::METRICS;
use crate::obs;

/// Outcome of a spawned delivery. Dropping it detaches the delivery.
pub struct DeliveryHandle {
    inner: JoinHandle<bool>,
}

impl DeliveryHandle {
    /// Wait for the delivery to settle; `true` when the backend accepted it.
    pub async fn delivered(self) -> bool {
        self.inner.await.unwrap_or(false)
    }
}

/// Reports task and session completions without ever blocking the caller.
///
/// Each call spawns one delivery attempt: no retry, failures are logged as
/// `delivery.failed` and counted, never returned.
#[derive(Clone)]
pub struct CompletionLogger {
    sink: Arc<dyn CompletionSink>,
}

impl CompletionLogger {
    pub fn new(sink: Arc<dyn CompletionSink>) -> Self {
        Self { sink }
    }

    /// Report a task that reached `Evaluated`.
    pub fn log_task(&self, record: TaskCompletion) -> DeliveryHandle {
        let sink = Arc::clone(&self.sink);
        let inner = tokio::spawn(async move {
            let result = sink.task_completed(&record).await;
            settle("task", &record.task, result)
        });
        DeliveryHandle { inner }
    }

    /// Report the final scores of an attempt.
    pub fn log_session(&self, record: FinalScores) -> DeliveryHandle {
        let sink = Arc::clone(&self.sink);
        let inner = tokio::spawn(async move {
            let result = sink.session_completed(&record).await;
            settle("session", &record.attempt, result)
        });
        DeliveryHandle { inner }
    }
}

fn settle(kind: &str, subject: &str, result: Result<DeliveryAck, DeliveryError>) -> bool {
    let failure = match result {
        Ok(ack) if ack.success => return true,
        Ok(_) => DeliveryError::Rejected,
        Err(e) => e,
    };
    METRICS.inc_deliveries_failed();
    obs::emit_delivery_failed(kind, subject, &failure);
    false
}

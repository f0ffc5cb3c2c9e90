//! Messages between the learner-facing surface and the engine.

use mastery_core::{GradeResult, Outcome};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::router::Transition;

/// Input from the learner. Task-directed signals name their task so a late
/// signal aimed at a previous task is ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LearnerSignal {
    /// Explicit submission.
    Submit { task_id: String, input: String },
    /// What the learner has typed so far; used if the timer expires.
    Draft { task_id: String, input: String },
    Skip { task_id: String },
    /// Cut the observation delay short.
    ContinueNow,
    /// Leave the unit; cancels the active task.
    Leave,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CountdownPurpose {
    AutoSubmit { task_id: String },
    Transition,
}

/// Notifications for the learner-facing surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EngineEvent {
    TaskPresented {
        task_id: String,
        order: u32,
        route: Option<String>,
        time_limit_secs: Option<u64>,
    },
    SubmissionRejected {
        task_id: String,
        reason: String,
    },
    TaskEvaluated {
        task_id: String,
        max_score: u32,
        result: GradeResult,
    },
    TaskSkipped {
        task_id: String,
    },
    Countdown {
        purpose: CountdownPurpose,
        remaining_secs: u64,
    },
    OutcomeReady {
        outcome: Outcome,
    },
    Navigated {
        transition: Transition,
    },
}

/// Optional, non-blocking event channel. A closed or missing receiver is
/// not an error.
#[derive(Debug, Clone, Default)]
pub struct EventSink {
    tx: Option<mpsc::UnboundedSender<EngineEvent>>,
}

impl EventSink {
    pub fn new(tx: mpsc::UnboundedSender<EngineEvent>) -> Self {
        Self { tx: Some(tx) }
    }

    /// Sink that drops every event.
    pub fn disabled() -> Self {
        Self::default()
    }

    /// Create a sink together with its receiving end.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<EngineEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }

    pub fn emit(&self, event: EngineEvent) {
        if let Some(tx) = &self.tx {
            tx.send(event).ok();
        }
    }
}

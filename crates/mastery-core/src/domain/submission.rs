//! Learner input handed to a task runner.

use serde::{Deserialize, Serialize};

/// What caused a task to move into submission.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SubmitTrigger {
    /// Explicit learner submission.
    Learner,
    /// The task-local timer expired.
    Timeout,
}

/// Raw learner input for one task.
///
/// Multi-answer exercises (quizzes, matching) put one answer per line.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Submission {
    pub input: String,
    pub trigger: SubmitTrigger,
}

impl Submission {
    pub fn learner(input: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            trigger: SubmitTrigger::Learner,
        }
    }

    /// Auto-submission carrying whatever the learner had typed so far.
    pub fn timeout(input: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            trigger: SubmitTrigger::Timeout,
        }
    }

    pub fn is_blank(&self) -> bool {
        self.input.trim().is_empty()
    }

    pub fn word_count(&self) -> usize {
        self.input.split_whitespace().count()
    }
}

//! Grading seam.
//!
//! The external grader is an opaque capability: it may fail, and when it
//! does the submission is scored by a local deterministic heuristic
//! instead. A learner always gets a score; correctness of that score is
//! best-effort.

pub mod heuristic;
pub mod http;

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::{Submission, TaskDescriptor};
use crate::metrics::METRICS;
use crate::obs;

pub use heuristic::LocalHeuristic;
pub use http::HttpGrader;

/// A score with learner-facing feedback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grade {
    pub score: u32,
    pub feedback: String,
}

/// Errors surfaced by an external grader.
#[derive(Debug, thiserror::Error)]
pub enum GraderError {
    #[error("grader unavailable: {0}")]
    Unavailable(String),

    #[error("grader timed out after {0:?}")]
    Timeout(Duration),

    #[error("grader returned an invalid response: {0}")]
    InvalidResponse(String),

    #[error("grader score {score} outside 0..={max_score}")]
    OutOfRange { score: u32, max_score: u32 },
}

/// External grading capability.
///
/// Implementations must be deterministic for identical input.
#[async_trait]
pub trait Grader: Send + Sync {
    async fn grade(&self, task: &TaskDescriptor, input: &str) -> Result<Grade, GraderError>;
}

/// How a task's score was produced. Every variant must be handled by the
/// task runner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GradeResult {
    /// Scored by the external grader.
    Graded { score: u32, feedback: String },
    /// Scored by the local heuristic.
    Fallback { score: u32, feedback: String },
    /// No score could be produced; the task counts as 0.
    Failed { reason: String },
}

impl GradeResult {
    /// Score to record. `Failed` records a real zero.
    pub fn score(&self) -> u32 {
        match self {
            GradeResult::Graded { score, .. } | GradeResult::Fallback { score, .. } => *score,
            GradeResult::Failed { .. } => 0,
        }
    }

    pub fn feedback(&self) -> &str {
        match self {
            GradeResult::Graded { feedback, .. } | GradeResult::Fallback { feedback, .. } => {
                feedback
            }
            GradeResult::Failed { reason } => reason,
        }
    }

    pub fn source(&self) -> &'static str {
        match self {
            GradeResult::Graded { .. } => "grader",
            GradeResult::Fallback { .. } => "fallback",
            GradeResult::Failed { .. } => "failed",
        }
    }
}

/// Score a submission, falling back to [`LocalHeuristic`] when the grader
/// is absent, fails, times out or answers out of range.
///
/// Blank input never reaches the grader and always scores 0.
pub async fn grade_submission(
    grader: Option<&dyn Grader>,
    task: &TaskDescriptor,
    submission: &Submission,
    timeout: Duration,
) -> GradeResult {
    if let (Some(grader), false) = (grader, submission.is_blank()) {
        match tokio::time::timeout(timeout, grader.grade(task, &submission.input)).await {
            Ok(Ok(grade)) if grade.score <= task.max_score => {
                return GradeResult::Graded {
                    score: grade.score,
                    feedback: grade.feedback,
                };
            }
            Ok(Ok(grade)) => obs::emit_grader_unavailable(
                &task.id,
                &GraderError::OutOfRange {
                    score: grade.score,
                    max_score: task.max_score,
                },
            ),
            Ok(Err(e)) => obs::emit_grader_unavailable(&task.id, &e),
            Err(_) => obs::emit_grader_unavailable(&task.id, &GraderError::Timeout(timeout)),
        }
    }

    match LocalHeuristic::score(task, &submission.input) {
        Some(grade) => {
            METRICS.inc_fallback_grades();
            GradeResult::Fallback {
                score: grade.score,
                feedback: grade.feedback,
            }
        }
        None => GradeResult::Failed {
            reason: format!("no usable offline heuristic for task {}", task.id),
        },
    }
}

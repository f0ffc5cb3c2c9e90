//! Task runner: lifecycle of one task within an attempt.
//!
//! `Presented → Submitting → Evaluated → Advancing`. A learner submission
//! and a timer expiry converge on the same evaluation path, and every
//! evaluation writes the store exactly once.

use std::sync::Arc;
use std::time::Duration;

use mastery_core::obs;
use mastery_core::{
    grade_submission, CompletionLogger, GradeResult, Grader, Submission, SubmitTrigger,
    TaskCompletion, TaskDescriptor, METRICS,
};
use mastery_store::{ScoreStore, SessionHandle, StoreError};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::debug;

use crate::signal::{CountdownPurpose, EngineEvent, EventSink, LearnerSignal};
use crate::timer::Countdown;

/// Result type for task operations
pub type TaskResult<T> = std::result::Result<T, TaskError>;

#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    /// The submission was refused; the task stays presented.
    #[error("submission for {task_id} rejected: {reason}")]
    MalformedSubmission { task_id: String, reason: String },

    #[error("task {task_id} cannot accept this in state {state:?}")]
    InvalidState { task_id: String, state: TaskState },

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    Presented,
    Submitting,
    Evaluated,
    Advancing,
}

/// How a driven task finished.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskExit {
    Completed(GradeResult),
    Skipped,
    /// The learner left the unit.
    Left,
}

/// Collaborators shared by every task of an attempt.
#[derive(Clone)]
pub struct TaskContext {
    pub store: Arc<dyn ScoreStore>,
    pub grader: Option<Arc<dyn Grader>>,
    pub logger: CompletionLogger,
    pub grader_timeout: Duration,
    pub events: EventSink,
}

pub struct TaskRunner {
    task: TaskDescriptor,
    session: SessionHandle,
    ctx: TaskContext,
    state: TaskState,
    timer: Option<Countdown>,
    draft: String,
    result: Option<GradeResult>,
}

impl TaskRunner {
    /// Make the task visible and start its auto-submit timer, if any.
    pub fn present(task: TaskDescriptor, session: SessionHandle, ctx: TaskContext) -> Self {
        obs::emit_task_presented(&task.id, task.order, task.time_limit_secs);
        ctx.events.emit(EngineEvent::TaskPresented {
            task_id: task.id.clone(),
            order: task.order,
            route: task.route.clone(),
            time_limit_secs: task.time_limit_secs,
        });

        let timer = task.time_limit_secs.map(|secs| {
            let events = ctx.events.clone();
            let task_id = task.id.clone();
            Countdown::start(Duration::from_secs(secs), move |remaining_secs| {
                events.emit(EngineEvent::Countdown {
                    purpose: CountdownPurpose::AutoSubmit {
                        task_id: task_id.clone(),
                    },
                    remaining_secs,
                })
            })
        });

        Self {
            task,
            session,
            ctx,
            state: TaskState::Presented,
            timer,
            draft: String::new(),
            result: None,
        }
    }

    pub fn task(&self) -> &TaskDescriptor {
        &self.task
    }

    pub fn state(&self) -> TaskState {
        self.state
    }

    /// Latest evaluation, if the task reached `Evaluated`.
    pub fn result(&self) -> Option<&GradeResult> {
        self.result.as_ref()
    }

    pub fn has_timer(&self) -> bool {
        self.timer.is_some()
    }

    /// Remember partial input for a timeout submission.
    pub fn set_draft(&mut self, input: impl Into<String>) {
        self.draft = input.into();
    }

    /// Evaluate a submission and record its score.
    ///
    /// Allowed while `Presented`, or while `Evaluated` as a resubmission
    /// that overwrites the previous score.
    pub async fn submit(&mut self, submission: Submission) -> TaskResult<GradeResult> {
        let previous = self.state;
        if !matches!(previous, TaskState::Presented | TaskState::Evaluated) {
            return Err(self.invalid_state());
        }
        if submission.trigger == SubmitTrigger::Learner {
            self.check(&submission)?;
        }

        self.cancel_timer();
        self.state = TaskState::Submitting;

        let result = grade_submission(
            self.ctx.grader.as_deref(),
            &self.task,
            &submission,
            self.ctx.grader_timeout,
        )
        .await;
        let score = result.score();

        if let Err(e) = self.ctx.store.write(&self.session, &self.task.id, score).await {
            obs::emit_score_write_failed(&self.task.id, &e);
            self.state = previous;
            return Err(e.into());
        }

        self.state = TaskState::Evaluated;
        self.result = Some(result.clone());
        METRICS.inc_tasks_evaluated();
        obs::emit_task_evaluated(&self.task.id, score, self.task.max_score, result.source());

        // Detached: the learner never waits on the backend.
        self.ctx.logger.log_task(TaskCompletion::new(
            &self.session.unit,
            &self.task,
            score,
        ));
        self.ctx.events.emit(EngineEvent::TaskEvaluated {
            task_id: self.task.id.clone(),
            max_score: self.task.max_score,
            result: result.clone(),
        });
        Ok(result)
    }

    /// Auto-submit whatever the learner has typed so far.
    pub async fn expire(&mut self) -> TaskResult<GradeResult> {
        if self.state != TaskState::Presented {
            return Err(self.invalid_state());
        }
        METRICS.inc_auto_submits();
        obs::emit_task_auto_submitted(&self.task.id);
        let draft = std::mem::take(&mut self.draft);
        self.submit(Submission::timeout(draft)).await
    }

    /// Move on without a record; the task counts as 0.
    pub fn skip(&mut self) -> TaskResult<()> {
        if self.state != TaskState::Presented {
            return Err(self.invalid_state());
        }
        self.cancel_timer();
        self.state = TaskState::Advancing;
        obs::emit_task_skipped(&self.task.id);
        self.ctx.events.emit(EngineEvent::TaskSkipped {
            task_id: self.task.id.clone(),
        });
        Ok(())
    }

    pub fn advance(&mut self) -> TaskResult<()> {
        if self.state != TaskState::Evaluated {
            return Err(self.invalid_state());
        }
        self.state = TaskState::Advancing;
        Ok(())
    }

    /// Cancel the timer when the task is torn down early.
    pub fn teardown(&mut self) {
        self.cancel_timer();
    }

    /// Wait for learner signals or timer expiry until the task finishes.
    ///
    /// Signals naming another task are ignored. A closed signal channel
    /// leaves a timed task to its timer and ends an untimed one as `Left`.
    pub async fn drive(
        &mut self,
        signals: &mut mpsc::Receiver<LearnerSignal>,
    ) -> TaskResult<TaskExit> {
        let mut closed = false;
        loop {
            if closed && self.timer.is_none() {
                self.teardown();
                return Ok(TaskExit::Left);
            }

            let wake = tokio::select! {
                fired = timer_expired(&mut self.timer) => Wake::Timer(fired),
                signal = signals.recv(), if !closed => Wake::Signal(signal),
            };

            match wake {
                Wake::Timer(true) => {
                    self.timer = None;
                    let result = self.expire().await?;
                    self.advance()?;
                    return Ok(TaskExit::Completed(result));
                }
                Wake::Timer(false) => self.timer = None,
                Wake::Signal(None) => closed = true,
                Wake::Signal(Some(signal)) => {
                    if let Some(exit) = self.on_signal(signal).await? {
                        return Ok(exit);
                    }
                }
            }
        }
    }

    async fn on_signal(&mut self, signal: LearnerSignal) -> TaskResult<Option<TaskExit>> {
        match signal {
            LearnerSignal::Submit { task_id, input } if task_id == self.task.id => {
                match self.submit(Submission::learner(input)).await {
                    Ok(result) => {
                        self.advance()?;
                        Ok(Some(TaskExit::Completed(result)))
                    }
                    Err(TaskError::MalformedSubmission { .. }) => Ok(None),
                    Err(e) => Err(e),
                }
            }
            LearnerSignal::Draft { task_id, input } if task_id == self.task.id => {
                self.set_draft(input);
                Ok(None)
            }
            LearnerSignal::Skip { task_id } if task_id == self.task.id => {
                self.skip()?;
                Ok(Some(TaskExit::Skipped))
            }
            LearnerSignal::Leave => {
                self.teardown();
                Ok(Some(TaskExit::Left))
            }
            other => {
                debug!(task_id = %self.task.id, signal = ?other, "Ignoring signal");
                Ok(None)
            }
        }
    }

    fn check(&self, submission: &Submission) -> TaskResult<()> {
        let reason = if submission.is_blank() {
            Some("empty submission".to_string())
        } else if submission.word_count() < self.task.min_words as usize {
            Some(format!(
                "needs at least {} words, got {}",
                self.task.min_words,
                submission.word_count()
            ))
        } else {
            None
        };
        match reason {
            None => Ok(()),
            Some(reason) => {
                obs::emit_task_rejected(&self.task.id, &reason);
                self.ctx.events.emit(EngineEvent::SubmissionRejected {
                    task_id: self.task.id.clone(),
                    reason: reason.clone(),
                });
                Err(TaskError::MalformedSubmission {
                    task_id: self.task.id.clone(),
                    reason,
                })
            }
        }
    }

    fn cancel_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.cancel();
        }
    }

    fn invalid_state(&self) -> TaskError {
        TaskError::InvalidState {
            task_id: self.task.id.clone(),
            state: self.state,
        }
    }
}

impl Drop for TaskRunner {
    fn drop(&mut self) {
        self.cancel_timer();
    }
}

enum Wake {
    Timer(bool),
    Signal(Option<LearnerSignal>),
}

async fn timer_expired(timer: &mut Option<Countdown>) -> bool {
    match timer {
        Some(countdown) => countdown.expired().await,
        None => std::future::pending().await,
    }
}

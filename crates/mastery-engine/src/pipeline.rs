//! Unit pipeline: one full attempt at a curriculum unit.
//!
//! open session → drive each task in order → aggregate and gate → report
//! final scores → route. Reporting never gates navigation.

use std::sync::Arc;
use std::time::Duration;

use mastery_core::obs;
use mastery_core::{
    CompletionLogger, CompletionSink, DeliveryError, EngineConfig, FinalScores, Grader,
    GraderError, HttpCompletionSink, HttpGrader, Outcome, TracingSink, Unit,
};
use mastery_store::{ScoreStore, SessionHandle, StoreError, UnitKey};
use tokio::sync::mpsc;
use tracing::{info, Instrument};

use crate::router::{Navigator, Router, Transition};
use crate::runner::{TaskContext, TaskError, TaskExit, TaskRunner};
use crate::signal::{EngineEvent, EventSink, LearnerSignal};

/// Result type for engine operations
pub type EngineResult<T> = std::result::Result<T, EngineError>;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("score store error: {0}")]
    Store(#[from] StoreError),

    #[error("task error: {0}")]
    Task(#[from] TaskError),

    #[error("grader setup failed: {0}")]
    Grader(#[from] GraderError),

    #[error("completion sink setup failed: {0}")]
    Delivery(#[from] DeliveryError),
}

/// What happened to one task of an attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskReport {
    pub task_id: String,
    pub exit: TaskExit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptReport {
    /// Every task was reached, the outcome settled and the learner routed.
    Finished {
        outcome: Outcome,
        transition: Transition,
        tasks: Vec<TaskReport>,
    },
    /// The learner left before the last task; no outcome exists.
    Abandoned {
        unit: UnitKey,
        completed: Vec<TaskReport>,
    },
}

impl AttemptReport {
    pub fn outcome(&self) -> Option<&Outcome> {
        match self {
            AttemptReport::Finished { outcome, .. } => Some(outcome),
            AttemptReport::Abandoned { .. } => None,
        }
    }

    pub fn transition(&self) -> Option<&Transition> {
        match self {
            AttemptReport::Finished { transition, .. } => Some(transition),
            AttemptReport::Abandoned { .. } => None,
        }
    }

    pub fn passed(&self) -> bool {
        self.outcome().is_some_and(|o| o.passed)
    }
}

pub struct UnitPipeline {
    store: Arc<dyn ScoreStore>,
    grader: Option<Arc<dyn Grader>>,
    logger: CompletionLogger,
    navigator: Arc<dyn Navigator>,
    events: EventSink,
    observation_delay: Duration,
    grader_timeout: Duration,
}

impl UnitPipeline {
    pub fn new(
        store: Arc<dyn ScoreStore>,
        logger: CompletionLogger,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        let defaults = EngineConfig::offline();
        Self {
            store,
            grader: None,
            logger,
            navigator,
            events: EventSink::disabled(),
            observation_delay: defaults.observation_delay,
            grader_timeout: defaults.grader_timeout,
        }
    }

    /// Wire the external grader and backend named in `config`. Without a
    /// backend, completions go to the log only.
    pub fn from_config(
        config: &EngineConfig,
        store: Arc<dyn ScoreStore>,
        navigator: Arc<dyn Navigator>,
    ) -> EngineResult<Self> {
        let sink: Arc<dyn CompletionSink> = match &config.backend_url {
            Some(url) => Arc::new(
                HttpCompletionSink::new(url.as_str(), config.delivery_timeout)?
                    .with_endpoints(config.task_endpoint.as_str(), config.final_endpoint.as_str()),
            ),
            None => Arc::new(TracingSink),
        };
        let mut pipeline = Self::new(store, CompletionLogger::new(sink), navigator)
            .with_observation_delay(config.observation_delay)
            .with_grader_timeout(config.grader_timeout);
        if let Some(url) = &config.grader_url {
            pipeline = pipeline.with_grader(Arc::new(HttpGrader::new(
                url.as_str(),
                config.grader_timeout,
            )?));
        }
        Ok(pipeline)
    }

    pub fn with_grader(mut self, grader: Arc<dyn Grader>) -> Self {
        self.grader = Some(grader);
        self
    }

    pub fn with_events(mut self, events: EventSink) -> Self {
        self.events = events;
        self
    }

    pub fn with_observation_delay(mut self, delay: Duration) -> Self {
        self.observation_delay = delay;
        self
    }

    pub fn with_grader_timeout(mut self, timeout: Duration) -> Self {
        self.grader_timeout = timeout;
        self
    }

    pub fn has_grader(&self) -> bool {
        self.grader.is_some()
    }

    /// Run one attempt at `unit`, driven by learner `signals`.
    pub async fn run_attempt(
        &self,
        unit: &Unit,
        signals: &mut mpsc::Receiver<LearnerSignal>,
    ) -> EngineResult<AttemptReport> {
        let session = self.store.open_session(unit.key()).await?;
        let span = obs::attempt_span(&unit.key().to_string(), &session.attempt.to_string());
        self.attempt(unit, session, signals).instrument(span).await
    }

    async fn attempt(
        &self,
        unit: &Unit,
        session: SessionHandle,
        signals: &mut mpsc::Receiver<LearnerSignal>,
    ) -> EngineResult<AttemptReport> {
        obs::emit_session_opened(
            &unit.key().to_string(),
            &session.attempt.to_string(),
            unit.tasks().len(),
        );

        let ctx = TaskContext {
            store: Arc::clone(&self.store),
            grader: self.grader.clone(),
            logger: self.logger.clone(),
            grader_timeout: self.grader_timeout,
            events: self.events.clone(),
        };

        let mut tasks = Vec::with_capacity(unit.tasks().len());
        for task in unit.tasks() {
            let mut runner = TaskRunner::present(task.clone(), session.clone(), ctx.clone());
            let exit = runner.drive(signals).await?;
            if exit == TaskExit::Left {
                info!(unit = %unit.key(), task_id = %task.id, "Learner left the unit");
                return Ok(AttemptReport::Abandoned {
                    unit: unit.key().clone(),
                    completed: tasks,
                });
            }
            tasks.push(TaskReport {
                task_id: task.id.clone(),
                exit,
            });
        }

        let sheet = self.store.read_all(&session, &unit.task_ids()).await;
        let outcome = Outcome::settle(unit, session.attempt.clone(), &sheet);
        obs::emit_outcome(
            &unit.key().to_string(),
            outcome.total,
            outcome.pass_threshold,
            outcome.passed,
        );
        self.events.emit(EngineEvent::OutcomeReady {
            outcome: outcome.clone(),
        });
        // Detached: the final log never holds up routing.
        self.logger.log_session(FinalScores::from(&outcome));

        let router = Router::new(
            Arc::clone(&self.store),
            Arc::clone(&self.navigator),
            self.observation_delay,
        )
        .with_events(self.events.clone());
        let transition = router
            .transition(&session, &outcome, unit.routes(), signals)
            .await;

        Ok(AttemptReport::Finished {
            outcome,
            transition,
            tasks,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mastery_store::MemoryScoreStore;

    use crate::router::HistoryNavigator;

    #[test]
    fn test_from_offline_config_has_no_grader() {
        let pipeline = UnitPipeline::from_config(
            &EngineConfig::offline(),
            Arc::new(MemoryScoreStore::new()),
            Arc::new(HistoryNavigator::new()),
        )
        .unwrap();
        assert!(!pipeline.has_grader());
        assert_eq!(pipeline.observation_delay, Duration::from_secs(5));
    }

    #[test]
    fn test_from_config_wires_grader() {
        let config = EngineConfig::offline()
            .with_grader("http://127.0.0.1:9/grade")
            .with_backend("http://127.0.0.1:9")
            .with_observation_delay(Duration::from_secs(2));
        let pipeline = UnitPipeline::from_config(
            &config,
            Arc::new(MemoryScoreStore::new()),
            Arc::new(HistoryNavigator::new()),
        )
        .unwrap();
        assert!(pipeline.has_grader());
        assert_eq!(pipeline.observation_delay, Duration::from_secs(2));
    }

    #[test]
    fn test_abandoned_report_has_no_outcome() {
        let report = AttemptReport::Abandoned {
            unit: UnitKey::new("phase1", "step1", "A1").unwrap(),
            completed: Vec::new(),
        };
        assert!(report.outcome().is_none());
        assert!(report.transition().is_none());
        assert!(!report.passed());
    }
}

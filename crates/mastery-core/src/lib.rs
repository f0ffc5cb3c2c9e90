//! Mastery Core Library
//!
//! Domain model and pure logic of mastery-gated progression:
//!
//! - `domain`: tasks, units, threshold policies, submissions, outcomes
//! - `aggregate` / `gate`: total of an attempt and its pass/fail decision
//! - `grading`: external grader seam with a deterministic offline fallback
//! - `reporting`: best-effort delivery of completions to the backend of record
//! - `curriculum`: loading and validating unit definitions

pub mod aggregate;
pub mod config;
pub mod curriculum;
pub mod domain;
pub mod fakes;
pub mod gate;
pub mod grading;
pub mod metrics;
pub mod obs;
pub mod reporting;
pub mod telemetry;

pub use aggregate::aggregate;
pub use config::{EngineConfig, DEFAULT_OBSERVATION_DELAY_SECS};
pub use curriculum::{Curriculum, CurriculumFile};
pub use domain::{
    DomainError, Heuristic, Outcome, PassRule, Result, Route, SubmitTrigger, Submission,
    TaskDescriptor, TaskKind, ThresholdPolicy, Unit, UnitConfig, UnitRoutes,
};
pub use gate::{decide, GateVerdict, ThresholdGate};
pub use grading::{
    grade_submission, Grade, GradeResult, Grader, GraderError, HttpGrader, LocalHeuristic,
};
pub use reporting::{
    CompletionLogger, CompletionSink, DeliveryAck, DeliveryError, DeliveryHandle, FinalScores,
    HttpCompletionSink, TaskCompletion, TracingSink,
};

pub use mastery_store::{
    AttemptId, MemoryScoreStore, ScoreRecord, ScoreSheet, ScoreStore, SessionHandle, StoreError,
    UnitKey,
};

pub use metrics::METRICS;
pub use obs::attempt_span;
pub use telemetry::init_tracing;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

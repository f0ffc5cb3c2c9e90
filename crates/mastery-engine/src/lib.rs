//! Mastery Engine - mastery-gated unit attempts
//!
//! Drives one attempt at a curriculum unit:
//! - Presents tasks in order, auto-submitting on timer expiry
//! - Records each score in the session store and reports it
//! - Gates the total against the unit's threshold
//! - Routes forward on pass, back to the first task on fail

pub mod pipeline;
pub mod router;
pub mod runner;
pub mod signal;
pub mod timer;

// Re-export key types
pub use pipeline::{AttemptReport, EngineError, EngineResult, TaskReport, UnitPipeline};
pub use router::{HistoryNavigator, Navigator, Router, Transition, TransitionKind};
pub use runner::{TaskContext, TaskError, TaskExit, TaskRunner, TaskState};
pub use signal::{CountdownPurpose, EngineEvent, EventSink, LearnerSignal};
pub use timer::Countdown;

//! Domain models for mastery progression.
//!
//! Canonical definitions for the core entities:
//! - `TaskDescriptor`: one scorable task of a unit, immutable
//! - `Unit`: a validated `(phase, step, level)` unit with policy and routes
//! - `ThresholdPolicy`: maximum total and inclusive pass threshold
//! - `Submission`: learner input plus what triggered it
//! - `Outcome`: terminal verdict of one attempt

pub mod error;
pub mod outcome;
pub mod policy;
pub mod submission;
pub mod task;
pub mod unit;

pub use error::{DomainError, Result};
pub use outcome::Outcome;
pub use policy::{PassRule, ThresholdPolicy, DEFAULT_PASS_PERCENT};
pub use submission::{SubmitTrigger, Submission};
pub use task::{Heuristic, TaskDescriptor, TaskKind};
pub use unit::{Route, Unit, UnitConfig, UnitRoutes};

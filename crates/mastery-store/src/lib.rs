//! Mastery-Store: session-scoped score storage
//!
//! This crate holds the per-task scores of one learner attempt at a
//! curriculum unit. It is deliberately volatile: the store is a session
//! artifact, durable record-keeping of outcomes happens elsewhere.
//!
//! ## Layer 0 - Data
//!
//! Focus: one live record per `(unit, task)`, idempotent clearing, and
//! explicit attempt ownership.
//!
//! ## Key Components
//!
//! - `UnitKey`: the `(phase, step, level)` namespace of a session
//! - `SessionState`: the records of one attempt, with explicit open/close
//! - `ScoreStore`: async storage trait (`write` / `read_all` / `clear`)
//! - `MemoryScoreStore`: process-local implementation

mod error;
pub mod memory;
pub mod session;
pub mod storage_traits;

pub use error::StoreError;
pub use memory::MemoryScoreStore;
pub use session::SessionState;
pub use storage_traits::{
    AttemptId, ScoreRecord, ScoreSheet, ScoreStore, SessionHandle, SheetEntry, StoreResult,
    UnitKey,
};

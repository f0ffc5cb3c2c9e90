//! Error types for mastery-store

use thiserror::Error;

/// Errors that can occur in the score storage layer
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A unit key component or task id cannot be namespaced safely
    #[error("Invalid key: {reason}")]
    InvalidKey { reason: String },

    /// No session is open for the unit (never opened, or already cleared)
    #[error("No open session for unit {unit}")]
    SessionClosed { unit: String },

    /// The write carries an attempt that no longer owns the unit
    #[error("Attempt {attempt} for unit {unit} was superseded by {active}")]
    StaleAttempt {
        unit: String,
        attempt: String,
        active: String,
    },

    /// Backend-specific failure
    #[error("Storage backend failed: {0}")]
    Backend(String),
}

//! Domain-level error taxonomy.

use mastery_store::StoreError;

/// Errors produced while building or loading curriculum units.
#[derive(Debug, thiserror::Error)]
pub enum DomainError {
    #[error("invalid task {task_id}: {reason}")]
    InvalidTask { task_id: String, reason: String },

    #[error("invalid threshold policy: {0}")]
    InvalidPolicy(String),

    #[error("invalid unit {unit}: {reason}")]
    InvalidUnit { unit: String, reason: String },

    #[error("unit not found: {0}")]
    UnitNotFound(String),

    #[error("unsupported curriculum format: {0}")]
    UnsupportedFormat(String),

    #[error("key error: {0}")]
    Key(#[from] StoreError),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for domain operations.
pub type Result<T> = std::result::Result<T, DomainError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_error_display() {
        let err = DomainError::InvalidTask {
            task_id: "taskA".to_string(),
            reason: "max_score must be positive".to_string(),
        };
        assert!(err.to_string().contains("taskA"));
        assert!(err.to_string().contains("max_score"));

        let err = DomainError::UnitNotFound("phase1_step1_A1".to_string());
        assert!(err.to_string().contains("unit not found"));
    }

    #[test]
    fn test_store_error_converts() {
        let err: DomainError = StoreError::InvalidKey {
            reason: "level must not be empty".to_string(),
        }
        .into();
        assert!(matches!(err, DomainError::Key(_)));
    }
}

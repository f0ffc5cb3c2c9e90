//! Engine configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::reporting::http::{DEFAULT_FINAL_ENDPOINT, DEFAULT_TASK_ENDPOINT};

/// Default wait between showing an outcome and navigating.
pub const DEFAULT_OBSERVATION_DELAY_SECS: u64 = 5;

const DEFAULT_GRADER_TIMEOUT_SECS: u64 = 20;
const DEFAULT_DELIVERY_TIMEOUT_SECS: u64 = 10;

/// Runtime settings of a progression engine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EngineConfig {
    /// Backend of record; completions only go to the log when unset.
    pub backend_url: Option<String>,
    pub task_endpoint: String,
    pub final_endpoint: String,
    /// External grader; submissions are scored offline when unset.
    pub grader_url: Option<String>,
    pub observation_delay: Duration,
    pub grader_timeout: Duration,
    pub delivery_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            backend_url: env_string("MASTERY_BACKEND_URL"),
            task_endpoint: env_string("MASTERY_TASK_ENDPOINT")
                .unwrap_or_else(|| DEFAULT_TASK_ENDPOINT.to_string()),
            final_endpoint: env_string("MASTERY_FINAL_ENDPOINT")
                .unwrap_or_else(|| DEFAULT_FINAL_ENDPOINT.to_string()),
            grader_url: env_string("MASTERY_GRADER_URL"),
            observation_delay: env_secs(
                "MASTERY_OBSERVATION_DELAY_SECS",
                DEFAULT_OBSERVATION_DELAY_SECS,
            ),
            grader_timeout: env_secs("MASTERY_GRADER_TIMEOUT_SECS", DEFAULT_GRADER_TIMEOUT_SECS),
            delivery_timeout: env_secs(
                "MASTERY_DELIVERY_TIMEOUT_SECS",
                DEFAULT_DELIVERY_TIMEOUT_SECS,
            ),
        }
    }
}

impl EngineConfig {
    /// Create a config from environment variables
    pub fn from_env() -> Self {
        Self::default()
    }

    /// Config with no external services and default timings.
    pub fn offline() -> Self {
        EngineConfig {
            backend_url: None,
            task_endpoint: DEFAULT_TASK_ENDPOINT.to_string(),
            final_endpoint: DEFAULT_FINAL_ENDPOINT.to_string(),
            grader_url: None,
            observation_delay: Duration::from_secs(DEFAULT_OBSERVATION_DELAY_SECS),
            grader_timeout: Duration::from_secs(DEFAULT_GRADER_TIMEOUT_SECS),
            delivery_timeout: Duration::from_secs(DEFAULT_DELIVERY_TIMEOUT_SECS),
        }
    }

    pub fn with_backend(mut self, url: &str) -> Self {
        self.backend_url = Some(url.to_string());
        self
    }

    pub fn with_grader(mut self, url: &str) -> Self {
        self.grader_url = Some(url.to_string());
        self
    }

    pub fn with_observation_delay(mut self, delay: Duration) -> Self {
        self.observation_delay = delay;
        self
    }
}

fn env_string(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn env_secs(name: &str, default: u64) -> Duration {
    Duration::from_secs(
        std::env::var(name)
            .ok()
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(default),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offline_defaults() {
        let config = EngineConfig::offline();
        assert!(config.backend_url.is_none());
        assert!(config.grader_url.is_none());
        assert_eq!(config.observation_delay, Duration::from_secs(5));
        assert_eq!(config.task_endpoint, "/api/progress/task");
    }

    #[test]
    fn test_builders() {
        let config = EngineConfig::offline()
            .with_backend("http://localhost:8000")
            .with_grader("http://localhost:9000/grade")
            .with_observation_delay(Duration::from_secs(1));
        assert_eq!(config.backend_url.as_deref(), Some("http://localhost:8000"));
        assert_eq!(config.grader_url.as_deref(), Some("http://localhost:9000/grade"));
        assert_eq!(config.observation_delay, Duration::from_secs(1));
    }
}

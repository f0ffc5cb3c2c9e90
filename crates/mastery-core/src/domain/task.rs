//! Task descriptors and their offline scoring heuristics.

use serde::{Deserialize, Serialize};

use super::error::{DomainError, Result};

/// Exercise family of a task. Informational; grading is opaque.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    Quiz,
    Matching,
    Flashcard,
    Dialogue,
    #[default]
    Essay,
}

/// Local, deterministic scoring rule used when the grader is unavailable.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Heuristic {
    /// One expected answer per input line, compared positionally.
    AnswerKey { answers: Vec<String> },
    /// Fraction of keywords present anywhere in the text.
    Keywords { keywords: Vec<String> },
    /// Word count against a target length.
    WordCount { target_words: u32 },
}

impl Default for Heuristic {
    fn default() -> Self {
        Heuristic::WordCount { target_words: 50 }
    }
}

impl Heuristic {
    fn check(&self) -> std::result::Result<(), String> {
        match self {
            Heuristic::AnswerKey { answers } if answers.is_empty() => {
                Err("answer_key heuristic needs at least one answer".to_string())
            }
            Heuristic::Keywords { keywords } if keywords.is_empty() => {
                Err("keywords heuristic needs at least one keyword".to_string())
            }
            Heuristic::WordCount { target_words: 0 } => {
                Err("word_count heuristic needs a positive target".to_string())
            }
            _ => Ok(()),
        }
    }
}

/// One scorable task of a unit. Immutable once the unit is built.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TaskDescriptor {
    /// Task identifier, e.g. `taskA`.
    pub id: String,

    /// Position within the unit, contiguous from 0.
    pub order: u32,

    /// Highest score the task can produce. Must be positive.
    pub max_score: u32,

    #[serde(default)]
    pub kind: TaskKind,

    /// Auto-submit after this many seconds when set.
    #[serde(default)]
    pub time_limit_secs: Option<u64>,

    /// Learner submissions with fewer words are rejected as malformed.
    #[serde(default)]
    pub min_words: u32,

    /// Presentation route. Derived from the unit key when omitted.
    #[serde(default)]
    pub route: Option<String>,

    #[serde(default)]
    pub heuristic: Heuristic,
}

impl TaskDescriptor {
    pub fn new(id: impl Into<String>, order: u32, max_score: u32) -> Self {
        Self {
            id: id.into(),
            order,
            max_score,
            kind: TaskKind::default(),
            time_limit_secs: None,
            min_words: 0,
            route: None,
            heuristic: Heuristic::default(),
        }
    }

    pub fn with_kind(mut self, kind: TaskKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_time_limit(mut self, secs: u64) -> Self {
        self.time_limit_secs = Some(secs);
        self
    }

    pub fn with_min_words(mut self, min_words: u32) -> Self {
        self.min_words = min_words;
        self
    }

    pub fn with_route(mut self, route: impl Into<String>) -> Self {
        self.route = Some(route.into());
        self
    }

    pub fn with_heuristic(mut self, heuristic: Heuristic) -> Self {
        self.heuristic = heuristic;
        self
    }

    /// Check the per-task invariants.
    pub fn validate(&self) -> Result<()> {
        let invalid = |reason: String| DomainError::InvalidTask {
            task_id: self.id.clone(),
            reason,
        };
        if self.id.trim().is_empty() {
            return Err(invalid("id must not be empty".to_string()));
        }
        if self.max_score == 0 {
            return Err(invalid("max_score must be positive".to_string()));
        }
        if self.time_limit_secs == Some(0) {
            return Err(invalid("time_limit_secs must be positive".to_string()));
        }
        self.heuristic.check().map_err(invalid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_max_score_rejected() {
        let err = TaskDescriptor::new("taskA", 0, 0).validate().unwrap_err();
        assert!(err.to_string().contains("max_score"));
    }

    #[test]
    fn test_empty_answer_key_rejected() {
        let task = TaskDescriptor::new("taskA", 0, 4)
            .with_heuristic(Heuristic::AnswerKey { answers: vec![] });
        assert!(task.validate().is_err());
    }

    #[test]
    fn test_defaults_from_toml() {
        let task: TaskDescriptor = toml::from_str(
            r#"
            id = "taskB"
            order = 1
            max_score = 8
            "#,
        )
        .unwrap();
        assert_eq!(task.kind, TaskKind::Essay);
        assert_eq!(task.heuristic, Heuristic::WordCount { target_words: 50 });
        assert!(task.time_limit_secs.is_none());
        task.validate().unwrap();
    }

    #[test]
    fn test_tagged_heuristic_from_toml() {
        let task: TaskDescriptor = toml::from_str(
            r#"
            id = "taskA"
            order = 0
            max_score = 4
            kind = "quiz"
            time_limit_secs = 90

            [heuristic]
            type = "answer_key"
            answers = ["brand", "funnel", "reach", "churn"]
            "#,
        )
        .unwrap();
        assert_eq!(task.kind, TaskKind::Quiz);
        assert!(matches!(task.heuristic, Heuristic::AnswerKey { ref answers } if answers.len() == 4));
    }
}

//! Curriculum units: configuration form and validated form.

use std::collections::HashSet;

use mastery_store::UnitKey;
use serde::{Deserialize, Serialize};

use super::error::{DomainError, Result};
use super::policy::{PassRule, ThresholdPolicy};
use super::task::TaskDescriptor;

/// A navigation destination.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Route(pub String);

impl Route {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Transition table of a unit: one edge per verdict.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitRoutes {
    /// Entry route of the next curriculum unit.
    pub advance: Route,
    /// Presentation route of this unit's first task.
    pub restart: Route,
}

/// Unit as written in a curriculum file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UnitConfig {
    pub phase: String,
    pub step: String,
    pub level: String,

    #[serde(default)]
    pub title: Option<String>,

    pub tasks: Vec<TaskDescriptor>,

    /// Absolute threshold; takes precedence over `pass_percent`.
    #[serde(default)]
    pub pass_threshold: Option<u32>,

    #[serde(default)]
    pub pass_percent: Option<u32>,

    /// Entry route of the next unit.
    pub advance_route: String,
}

impl UnitConfig {
    fn pass_rule(&self) -> PassRule {
        match (self.pass_threshold, self.pass_percent) {
            (Some(threshold), _) => PassRule::Threshold(threshold),
            (None, Some(percent)) => PassRule::Percent(percent),
            (None, None) => PassRule::default(),
        }
    }

    /// Validate and turn the configuration into a [`Unit`].
    pub fn build(self) -> Result<Unit> {
        let key = UnitKey::new(&self.phase, &self.step, &self.level)?;
        let invalid = |reason: String| DomainError::InvalidUnit {
            unit: key.to_string(),
            reason,
        };

        if self.tasks.is_empty() {
            return Err(invalid("a unit needs at least one task".to_string()));
        }
        if self.advance_route.trim().is_empty() {
            return Err(invalid("advance_route must not be empty".to_string()));
        }

        let mut tasks = self.tasks.clone();
        tasks.sort_by_key(|t| t.order);

        let mut ids = HashSet::new();
        for (expected, task) in tasks.iter().enumerate() {
            task.validate()?;
            if task.order as usize != expected {
                return Err(invalid(format!(
                    "task orders must be unique and contiguous from 0; found {} at position {}",
                    task.order, expected
                )));
            }
            if !ids.insert(task.id.as_str()) {
                return Err(invalid(format!("duplicate task id {}", task.id)));
            }
        }

        for task in tasks.iter_mut() {
            if task.route.is_none() {
                task.route = Some(default_task_route(&key, &task.id));
            }
        }

        let policy = ThresholdPolicy::for_tasks(&tasks, self.pass_rule())
            .map_err(|e| invalid(e.to_string()))?;
        let restart = Route(tasks[0].route.clone().unwrap_or_default());

        Ok(Unit {
            key,
            title: self.title,
            tasks,
            policy,
            routes: UnitRoutes {
                advance: Route(self.advance_route),
                restart,
            },
        })
    }
}

fn default_task_route(key: &UnitKey, task_id: &str) -> String {
    format!("/{}/{}/{}/{}", key.phase(), key.step(), key.level(), task_id)
}

/// A validated unit: ordered tasks, threshold policy and route pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Unit {
    key: UnitKey,
    title: Option<String>,
    tasks: Vec<TaskDescriptor>,
    policy: ThresholdPolicy,
    routes: UnitRoutes,
}

impl Unit {
    pub fn key(&self) -> &UnitKey {
        &self.key
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    /// Tasks sorted by `order`.
    pub fn tasks(&self) -> &[TaskDescriptor] {
        &self.tasks
    }

    pub fn task(&self, task_id: &str) -> Option<&TaskDescriptor> {
        self.tasks.iter().find(|t| t.id == task_id)
    }

    pub fn task_ids(&self) -> Vec<String> {
        self.tasks.iter().map(|t| t.id.clone()).collect()
    }

    pub fn policy(&self) -> &ThresholdPolicy {
        &self.policy
    }

    pub fn routes(&self) -> &UnitRoutes {
        &self.routes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(tasks: Vec<TaskDescriptor>) -> UnitConfig {
        UnitConfig {
            phase: "phase4".to_string(),
            step: "step2".to_string(),
            level: "C1".to_string(),
            title: Some("Debate".to_string()),
            tasks,
            pass_threshold: Some(16),
            pass_percent: None,
            advance_route: "/phase4/step3/C1".to_string(),
        }
    }

    fn debate_tasks() -> Vec<TaskDescriptor> {
        vec![
            TaskDescriptor::new("taskC", 2, 6),
            TaskDescriptor::new("taskA", 0, 4),
            TaskDescriptor::new("taskB", 1, 8),
        ]
    }

    #[test]
    fn test_build_sorts_tasks_and_derives_routes() {
        let unit = config(debate_tasks()).build().unwrap();
        assert_eq!(unit.task_ids(), ["taskA", "taskB", "taskC"]);
        assert_eq!(unit.policy().max_total(), 18);
        assert_eq!(unit.policy().pass_threshold(), 16);
        assert_eq!(unit.routes().restart.as_str(), "/phase4/step2/C1/taskA");
        assert_eq!(unit.routes().advance.as_str(), "/phase4/step3/C1");
    }

    #[test]
    fn test_explicit_first_task_route_is_restart_route() {
        let mut tasks = debate_tasks();
        tasks[1] = TaskDescriptor::new("taskA", 0, 4).with_route("/c1/debate/opening");
        let unit = config(tasks).build().unwrap();
        assert_eq!(unit.routes().restart.as_str(), "/c1/debate/opening");
    }

    #[test]
    fn test_gap_in_order_rejected() {
        let tasks = vec![
            TaskDescriptor::new("taskA", 0, 4),
            TaskDescriptor::new("taskB", 2, 8),
        ];
        let err = config(tasks).build().unwrap_err();
        assert!(err.to_string().contains("contiguous"));
    }

    #[test]
    fn test_duplicate_order_rejected() {
        let tasks = vec![
            TaskDescriptor::new("taskA", 0, 4),
            TaskDescriptor::new("taskB", 0, 8),
        ];
        assert!(config(tasks).build().is_err());
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let tasks = vec![
            TaskDescriptor::new("taskA", 0, 4),
            TaskDescriptor::new("taskA", 1, 8),
        ];
        let err = config(tasks).build().unwrap_err();
        assert!(err.to_string().contains("duplicate"));
    }

    #[test]
    fn test_threshold_above_max_total_rejected() {
        let mut cfg = config(debate_tasks());
        cfg.pass_threshold = Some(19);
        assert!(cfg.build().is_err());
    }

    #[test]
    fn test_empty_unit_rejected() {
        assert!(config(vec![]).build().is_err());
    }

    #[test]
    fn test_percent_used_when_no_threshold() {
        let mut cfg = config(debate_tasks());
        cfg.pass_threshold = None;
        cfg.pass_percent = Some(84);
        let unit = cfg.build().unwrap();
        // 84% of 18 = 15.12
        assert_eq!(unit.policy().pass_threshold(), 16);
    }
}

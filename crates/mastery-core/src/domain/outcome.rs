//! Terminal verdict of one attempt at a unit.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use mastery_store::{AttemptId, ScoreSheet, UnitKey};
use serde::{Deserialize, Serialize};

use super::unit::Unit;
use crate::aggregate::aggregate;
use crate::gate::decide;

/// Computed once per attempt and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outcome {
    pub unit: UnitKey,
    pub attempt: AttemptId,
    pub total: u32,
    pub max_total: u32,
    pub pass_threshold: u32,
    pub passed: bool,
    /// Score per task; tasks without a record count as 0.
    pub per_task: BTreeMap<String, u32>,
    /// Tasks that had no record when the outcome was settled.
    pub missing: Vec<String>,
    pub decided_at: DateTime<Utc>,
}

impl Outcome {
    /// Aggregate the sheet, apply the unit's threshold and freeze the result.
    pub fn settle(unit: &Unit, attempt: AttemptId, sheet: &ScoreSheet) -> Self {
        let total = aggregate(sheet, unit.tasks());
        let policy = unit.policy();
        let mut per_task = BTreeMap::new();
        let mut missing = Vec::new();
        for task in unit.tasks() {
            let score = sheet.get(&task.id);
            if score.is_none() {
                missing.push(task.id.clone());
            }
            per_task.insert(task.id.clone(), score.unwrap_or(0));
        }
        Self {
            unit: unit.key().clone(),
            attempt,
            total,
            max_total: policy.max_total(),
            pass_threshold: policy.pass_threshold(),
            passed: decide(total, policy),
            per_task,
            missing,
            decided_at: Utc::now(),
        }
    }
}

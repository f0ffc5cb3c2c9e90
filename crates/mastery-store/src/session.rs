//! `SessionState`: the score records of one attempt at one unit.
//!
//! A session is opened when the learner enters the unit's first task and
//! destroyed when the router transitions away, pass or fail.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::storage_traits::{
    AttemptId, ScoreRecord, ScoreSheet, SessionHandle, SheetEntry, UnitKey,
};

/// The set of live records for one `UnitKey`, owned by one attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
    unit: UnitKey,
    attempt: AttemptId,
    opened_at: DateTime<Utc>,
    records: BTreeMap<String, ScoreRecord>,
}

impl SessionState {
    /// Open an empty session for a new attempt.
    pub fn open(unit: UnitKey) -> Self {
        Self {
            unit,
            attempt: AttemptId::new(),
            opened_at: Utc::now(),
            records: BTreeMap::new(),
        }
    }

    pub fn unit(&self) -> &UnitKey {
        &self.unit
    }

    pub fn attempt(&self) -> &AttemptId {
        &self.attempt
    }

    pub fn opened_at(&self) -> DateTime<Utc> {
        self.opened_at
    }

    /// Handle to give to the writer owning this attempt.
    pub fn handle(&self) -> SessionHandle {
        SessionHandle {
            unit: self.unit.clone(),
            attempt: self.attempt.clone(),
        }
    }

    /// Whether `handle` belongs to this attempt.
    pub fn owns(&self, handle: &SessionHandle) -> bool {
        handle.unit == self.unit && handle.attempt == self.attempt
    }

    /// Store or overwrite the score for `task_id`.
    pub fn record(&mut self, task_id: &str, score: u32) -> ScoreRecord {
        let record = ScoreRecord {
            unit: self.unit.clone(),
            task_id: task_id.to_string(),
            score,
            recorded_at: Utc::now(),
        };
        self.records.insert(task_id.to_string(), record.clone());
        record
    }

    pub fn score(&self, task_id: &str) -> Option<u32> {
        self.records.get(task_id).map(|r| r.score)
    }

    /// Project the records onto an ordered list of task ids.
    pub fn sheet(&self, task_ids: &[String]) -> ScoreSheet {
        ScoreSheet::new(
            task_ids
                .iter()
                .map(|id| SheetEntry {
                    task_id: id.clone(),
                    score: self.score(id),
                })
                .collect(),
        )
    }

    pub fn records(&self) -> impl Iterator<Item = &ScoreRecord> {
        self.records.values()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

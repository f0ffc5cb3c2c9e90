//! Process-local score store.
//!
//! Volatile: everything is lost on process restart. The store is
//! a session artifact, not a record of learning history.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::error::StoreError;
use crate::session::SessionState;
use crate::storage_traits::*;

/// In-memory score store backed by a `HashMap<UnitKey, SessionState>`.
#[derive(Debug, Default)]
pub struct MemoryScoreStore {
    sessions: Mutex<HashMap<UnitKey, SessionState>>,
}

impl MemoryScoreStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn sessions(&self) -> MutexGuard<'_, HashMap<UnitKey, SessionState>> {
        // A panicking writer cannot leave a half-written record behind.
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Snapshot of the session currently open for `unit`.
    pub fn session(&self, unit: &UnitKey) -> Option<SessionState> {
        self.sessions().get(unit).cloned()
    }

    /// Number of units with an open session.
    pub fn open_sessions(&self) -> usize {
        self.sessions().len()
    }
}

#[async_trait]
impl ScoreStore for MemoryScoreStore {
    async fn open_session(&self, unit: &UnitKey) -> StoreResult<SessionHandle> {
        let session = SessionState::open(unit.clone());
        let handle = session.handle();
        if let Some(previous) = self.sessions().insert(unit.clone(), session) {
            warn!(
                unit = %unit,
                superseded = %previous.attempt(),
                attempt = %handle.attempt,
                "Superseding live session"
            );
        }
        Ok(handle)
    }

    async fn write(
        &self,
        session: &SessionHandle,
        task_id: &str,
        score: u32,
    ) -> StoreResult<ScoreRecord> {
        if task_id.is_empty() {
            return Err(StoreError::InvalidKey {
                reason: "task id must not be empty".to_string(),
            });
        }
        let mut sessions = self.sessions();
        let state = sessions
            .get_mut(&session.unit)
            .ok_or_else(|| StoreError::SessionClosed {
                unit: session.unit.to_string(),
            })?;
        if !state.owns(session) {
            return Err(StoreError::StaleAttempt {
                unit: session.unit.to_string(),
                attempt: session.attempt.to_string(),
                active: state.attempt().to_string(),
            });
        }
        let record = state.record(task_id, score);
        debug!(key = %session.unit.score_key(task_id), score, "Score written");
        Ok(record)
    }

    async fn read_all(&self, session: &SessionHandle, task_ids: &[String]) -> ScoreSheet {
        match self.sessions().get(&session.unit) {
            Some(state) if state.owns(session) => state.sheet(task_ids),
            Some(state) => {
                debug!(
                    unit = %session.unit,
                    attempt = %session.attempt,
                    active = %state.attempt(),
                    "Read through superseded handle"
                );
                ScoreSheet::absent(task_ids)
            }
            None => ScoreSheet::absent(task_ids),
        }
    }

    async fn clear(&self, session: &SessionHandle) -> StoreResult<()> {
        let mut sessions = self.sessions();
        let owned = match sessions.get(&session.unit) {
            Some(state) if state.owns(session) => true,
            Some(state) => {
                debug!(
                    unit = %session.unit,
                    attempt = %session.attempt,
                    active = %state.attempt(),
                    "Clear through superseded handle ignored"
                );
                false
            }
            None => false,
        };
        if owned {
            if let Some(state) = sessions.remove(&session.unit) {
                debug!(unit = %session.unit, records = state.len(), "Session cleared");
            }
        }
        Ok(())
    }

    async fn active_attempt(&self, unit: &UnitKey) -> Option<AttemptId> {
        self.sessions().get(unit).map(|s| s.attempt().clone())
    }
}

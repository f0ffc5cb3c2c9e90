//! Storage trait definitions for mastery sessions
//!
//! - `UnitKey`: namespace of one `(phase, step, level)` curriculum unit
//! - `SessionHandle`: proof of ownership of a unit's session by one attempt
//! - `ScoreStore`: per-task score storage (write / read_all / clear)
//!
//! The trait is async and backend-agnostic. `MemoryScoreStore` in the
//! `memory` module is the process-local implementation.

use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StoreError;

/// Result type for storage operations
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Separator of the external key schema `{phase}_{step}_{level}_{taskId}_score`.
const KEY_SEPARATOR: char = '_';

// ---------------------------------------------------------------------------
// UnitKey
// ---------------------------------------------------------------------------

/// Identifies one curriculum unit: a `(phase, step, level)` triple.
///
/// Components are validated so the flat key schema stays unambiguous:
/// they must be non-empty and must not contain `_` or `/`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "UnitKeyParts")]
pub struct UnitKey {
    phase: String,
    step: String,
    level: String,
}

/// Unchecked wire form of [`UnitKey`].
#[derive(Deserialize)]
struct UnitKeyParts {
    phase: String,
    step: String,
    level: String,
}

impl TryFrom<UnitKeyParts> for UnitKey {
    type Error = StoreError;

    fn try_from(parts: UnitKeyParts) -> StoreResult<Self> {
        UnitKey::new(parts.phase, parts.step, parts.level)
    }
}

impl UnitKey {
    /// Build a key, rejecting components that would break namespacing.
    pub fn new(
        phase: impl Into<String>,
        step: impl Into<String>,
        level: impl Into<String>,
    ) -> StoreResult<Self> {
        let key = Self {
            phase: phase.into(),
            step: step.into(),
            level: level.into(),
        };
        for (name, value) in [
            ("phase", &key.phase),
            ("step", &key.step),
            ("level", &key.level),
        ] {
            check_component(name, value)?;
        }
        Ok(key)
    }

    pub fn phase(&self) -> &str {
        &self.phase
    }

    pub fn step(&self) -> &str {
        &self.step
    }

    pub fn level(&self) -> &str {
        &self.level
    }

    /// Render the external score key for a task of this unit.
    ///
    /// ```
    /// # use mastery_store::UnitKey;
    /// let unit = UnitKey::new("phase4", "step2", "C1").unwrap();
    /// assert_eq!(unit.score_key("taskA"), "phase4_step2_C1_taskA_score");
    /// ```
    pub fn score_key(&self, task_id: &str) -> String {
        format!("{self}{KEY_SEPARATOR}{task_id}{KEY_SEPARATOR}score")
    }
}

fn check_component(name: &str, value: &str) -> StoreResult<()> {
    if value.is_empty() {
        return Err(StoreError::InvalidKey {
            reason: format!("{name} must not be empty"),
        });
    }
    if value.contains(KEY_SEPARATOR) || value.contains('/') {
        return Err(StoreError::InvalidKey {
            reason: format!("{name} '{value}' must not contain '_' or '/'"),
        });
    }
    Ok(())
}

impl std::fmt::Display for UnitKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}{KEY_SEPARATOR}{}{KEY_SEPARATOR}{}",
            self.phase, self.step, self.level
        )
    }
}

/// Parses the path form `phase/step/level`.
impl FromStr for UnitKey {
    type Err = StoreError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split('/').collect();
        match parts.as_slice() {
            [phase, step, level] => UnitKey::new(*phase, *step, *level),
            _ => Err(StoreError::InvalidKey {
                reason: format!("expected phase/step/level, got '{s}'"),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// Attempts and handles
// ---------------------------------------------------------------------------

/// Unique identifier for one attempt at a unit
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AttemptId(pub String);

impl AttemptId {
    /// Generate a new random AttemptId
    pub fn new() -> Self {
        AttemptId(uuid::Uuid::new_v4().to_string())
    }
}

impl Default for AttemptId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for AttemptId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Returned by [`ScoreStore::open_session`]; every write must present it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionHandle {
    pub unit: UnitKey,
    pub attempt: AttemptId,
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// The live score of one task within one unit session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreRecord {
    pub unit: UnitKey,
    pub task_id: String,
    pub score: u32,
    pub recorded_at: DateTime<Utc>,
}

/// One row of a [`ScoreSheet`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SheetEntry {
    pub task_id: String,
    /// `None` when no record exists; a normal state, not an error.
    pub score: Option<u32>,
}

/// Result of `read_all`: one entry per requested task id, in request order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreSheet {
    entries: Vec<SheetEntry>,
}

impl ScoreSheet {
    pub fn new(entries: Vec<SheetEntry>) -> Self {
        Self { entries }
    }

    /// Sheet with every requested task absent.
    pub fn absent(task_ids: &[String]) -> Self {
        Self::new(
            task_ids
                .iter()
                .map(|id| SheetEntry {
                    task_id: id.clone(),
                    score: None,
                })
                .collect(),
        )
    }

    /// Score recorded for `task_id`, `None` if absent or not requested.
    pub fn get(&self, task_id: &str) -> Option<u32> {
        self.entries
            .iter()
            .find(|e| e.task_id == task_id)
            .and_then(|e| e.score)
    }

    pub fn entries(&self) -> &[SheetEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// True when no requested task has a record.
    pub fn is_all_absent(&self) -> bool {
        self.entries.iter().all(|e| e.score.is_none())
    }
}

// ---------------------------------------------------------------------------
// ScoreStore
// ---------------------------------------------------------------------------

/// Per-task score storage scoped to a unit session.
///
/// Guarantees:
/// - At most one live record per `(unit, task_id)`; `write` overwrites.
/// - Only the most recently opened attempt owns a unit. `write` rejects
///   other handles, `read_all` sees nothing through them and `clear`
///   ignores them.
/// - `read_all` never fails; missing records come back as `None`.
/// - `clear` is idempotent and closes the session.
///
/// Score bounds are not checked here. Callers validate before writing.
#[async_trait]
pub trait ScoreStore: Send + Sync {
    /// Open a fresh, empty session for `unit`, superseding any live one.
    async fn open_session(&self, unit: &UnitKey) -> StoreResult<SessionHandle>;

    /// Store or overwrite the score of `task_id` for the handle's attempt.
    async fn write(
        &self,
        session: &SessionHandle,
        task_id: &str,
        score: u32,
    ) -> StoreResult<ScoreRecord>;

    /// Read whatever records the handle's attempt has for the given tasks,
    /// in the given order. All absent when the handle no longer owns the unit.
    async fn read_all(&self, session: &SessionHandle, task_ids: &[String]) -> ScoreSheet;

    /// Remove every record of the handle's attempt and close its session.
    /// A no-op when a newer attempt owns the unit.
    async fn clear(&self, session: &SessionHandle) -> StoreResult<()>;

    /// Attempt currently owning `unit`, if a session is open.
    async fn active_attempt(&self, unit: &UnitKey) -> Option<AttemptId>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_score_key_schema() {
        let unit = UnitKey::new("phase2", "step3", "A2").unwrap();
        assert_eq!(unit.to_string(), "phase2_step3_A2");
        assert_eq!(unit.score_key("taskB"), "phase2_step3_A2_taskB_score");
    }

    #[test]
    fn test_same_task_letter_in_different_units_is_disambiguated() {
        let a = UnitKey::new("phase1", "step1", "B1").unwrap();
        let b = UnitKey::new("phase1", "step2", "B1").unwrap();
        assert_ne!(a.score_key("taskA"), b.score_key("taskA"));
    }

    #[test]
    fn test_rejects_separator_in_component() {
        let err = UnitKey::new("phase_1", "step1", "B1").unwrap_err();
        assert!(matches!(err, StoreError::InvalidKey { .. }));
        assert!(UnitKey::new("", "step1", "B1").is_err());
        assert!(UnitKey::new("phase1", "step/1", "B1").is_err());
    }

    #[test]
    fn test_deserialize_validates_components() {
        let unit: UnitKey =
            serde_json::from_str(r#"{"phase":"phase4","step":"step2","level":"C1"}"#).unwrap();
        assert_eq!(unit, UnitKey::new("phase4", "step2", "C1").unwrap());

        let err = serde_json::from_str::<UnitKey>(r#"{"phase":"phase_4","step":"step2","level":"C1"}"#)
            .unwrap_err();
        assert!(err.to_string().contains("phase"));
        assert!(serde_json::from_str::<UnitKey>(r#"{"phase":"","step":"step2","level":"C1"}"#).is_err());
        assert!(serde_json::from_str::<UnitKey>(r#"{"phase":"p","step":"s/2","level":"C1"}"#).is_err());
    }

    #[test]
    fn test_parse_path_form() {
        let unit: UnitKey = "phase4/step2/C1".parse().unwrap();
        assert_eq!(unit.phase(), "phase4");
        assert_eq!(unit.step(), "step2");
        assert_eq!(unit.level(), "C1");
        assert!("phase4/step2".parse::<UnitKey>().is_err());
    }

    #[test]
    fn test_score_sheet_lookup() {
        let sheet = ScoreSheet::new(vec![
            SheetEntry {
                task_id: "taskA".to_string(),
                score: Some(3),
            },
            SheetEntry {
                task_id: "taskB".to_string(),
                score: None,
            },
        ]);
        assert_eq!(sheet.get("taskA"), Some(3));
        assert_eq!(sheet.get("taskB"), None);
        assert_eq!(sheet.get("taskZ"), None);
        assert!(!sheet.is_all_absent());
    }

    #[test]
    fn test_score_record_serde() {
        let record = ScoreRecord {
            unit: UnitKey::new("phase1", "step1", "A1").unwrap(),
            task_id: "taskA".to_string(),
            score: 4,
            recorded_at: Utc::now(),
        };
        let json = serde_json::to_string(&record).unwrap();
        let back: ScoreRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);
    }
}

//! Pass threshold policy of a unit.

use serde::{Deserialize, Serialize};

use super::error::{DomainError, Result};
use super::task::TaskDescriptor;

/// Percentage applied when a unit names neither a threshold nor a percent.
pub const DEFAULT_PASS_PERCENT: u32 = 80;

/// How a unit's pass threshold is derived from its maximum total.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case", content = "value")]
pub enum PassRule {
    /// Absolute threshold.
    Threshold(u32),
    /// Percentage of the maximum total, rounded up.
    Percent(u32),
}

impl Default for PassRule {
    fn default() -> Self {
        PassRule::Percent(DEFAULT_PASS_PERCENT)
    }
}

/// Maximum total and inclusive pass threshold of a unit.
///
/// # Invariants
///
/// `pass_threshold <= max_total`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(try_from = "RawThresholdPolicy")]
pub struct ThresholdPolicy {
    max_total: u32,
    pass_threshold: u32,
}

#[derive(Deserialize)]
struct RawThresholdPolicy {
    max_total: u32,
    pass_threshold: u32,
}

impl TryFrom<RawThresholdPolicy> for ThresholdPolicy {
    type Error = DomainError;

    fn try_from(raw: RawThresholdPolicy) -> Result<Self> {
        ThresholdPolicy::new(raw.max_total, raw.pass_threshold)
    }
}

impl ThresholdPolicy {
    pub fn new(max_total: u32, pass_threshold: u32) -> Result<Self> {
        if pass_threshold > max_total {
            return Err(DomainError::InvalidPolicy(format!(
                "pass threshold {pass_threshold} exceeds maximum total {max_total}"
            )));
        }
        Ok(Self {
            max_total,
            pass_threshold,
        })
    }

    /// Threshold at `percent` of `max_total`, rounded up so the learner
    /// must actually reach the percentage.
    pub fn from_percent(max_total: u32, percent: u32) -> Result<Self> {
        if percent > 100 {
            return Err(DomainError::InvalidPolicy(format!(
                "pass percent {percent} is above 100"
            )));
        }
        let threshold = (u64::from(max_total) * u64::from(percent)).div_ceil(100);
        // threshold <= max_total because percent <= 100
        Self::new(max_total, threshold as u32)
    }

    /// Derive the policy for a task list: `max_total` is the sum of the
    /// tasks' maximum scores.
    pub fn for_tasks(tasks: &[TaskDescriptor], rule: PassRule) -> Result<Self> {
        let max_total = tasks
            .iter()
            .try_fold(0u32, |acc, t| acc.checked_add(t.max_score))
            .ok_or_else(|| DomainError::InvalidPolicy("maximum total overflows".to_string()))?;
        match rule {
            PassRule::Threshold(threshold) => Self::new(max_total, threshold),
            PassRule::Percent(percent) => Self::from_percent(max_total, percent),
        }
    }

    pub fn max_total(&self) -> u32 {
        self.max_total
    }

    pub fn pass_threshold(&self) -> u32 {
        self.pass_threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threshold_above_max_rejected() {
        assert!(ThresholdPolicy::new(18, 19).is_err());
        assert!(ThresholdPolicy::new(18, 18).is_ok());
        assert!(ThresholdPolicy::new(0, 0).is_ok());
    }

    #[test]
    fn test_deserialize_enforces_threshold_bound() {
        let policy: ThresholdPolicy =
            serde_json::from_str(r#"{"max_total":18,"pass_threshold":16}"#).unwrap();
        assert_eq!(policy, ThresholdPolicy::new(18, 16).unwrap());

        let err = serde_json::from_str::<ThresholdPolicy>(r#"{"max_total":18,"pass_threshold":19}"#)
            .unwrap_err();
        assert!(err.to_string().contains("exceeds maximum total"));
    }

    #[test]
    fn test_percent_rounds_up() {
        // 80% of 18 is 14.4
        assert_eq!(ThresholdPolicy::from_percent(18, 80).unwrap().pass_threshold(), 15);
        // 80% of 20 is exact
        assert_eq!(ThresholdPolicy::from_percent(20, 80).unwrap().pass_threshold(), 16);
        // the 84% variant on a 25-point unit
        assert_eq!(ThresholdPolicy::from_percent(25, 84).unwrap().pass_threshold(), 21);
        assert!(ThresholdPolicy::from_percent(20, 101).is_err());
    }

    #[test]
    fn test_for_tasks_sums_max_scores() {
        let tasks = vec![
            TaskDescriptor::new("taskA", 0, 4),
            TaskDescriptor::new("taskB", 1, 8),
            TaskDescriptor::new("taskC", 2, 6),
        ];
        let policy = ThresholdPolicy::for_tasks(&tasks, PassRule::Threshold(16)).unwrap();
        assert_eq!(policy.max_total(), 18);
        assert_eq!(policy.pass_threshold(), 16);

        let policy = ThresholdPolicy::for_tasks(&tasks, PassRule::default()).unwrap();
        assert_eq!(policy.pass_threshold(), 15);
    }
}

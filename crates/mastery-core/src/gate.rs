//! Threshold gate: the pass/fail decision of an attempt.
//!
//! A single inclusive integer comparison. No hysteresis and no partial
//! credit beyond what [`aggregate`](crate::aggregate::aggregate) computed.

use serde::{Deserialize, Serialize};

use crate::domain::ThresholdPolicy;

/// `true` iff `total >= policy.pass_threshold()`.
pub fn decide(total: u32, policy: &ThresholdPolicy) -> bool {
    total >= policy.pass_threshold()
}

/// Verdict with enough context to explain it to a learner.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct GateVerdict {
    pub total: u32,
    pub pass_threshold: u32,
    pub max_total: u32,
    pub passed: bool,
}

impl GateVerdict {
    /// Points still missing to reach the threshold (0 when passed).
    pub fn shortfall(&self) -> u32 {
        self.pass_threshold.saturating_sub(self.total)
    }
}

/// Stateless gate over a [`ThresholdPolicy`].
pub struct ThresholdGate;

impl ThresholdGate {
    pub fn evaluate(total: u32, policy: &ThresholdPolicy) -> GateVerdict {
        GateVerdict {
            total,
            pass_threshold: policy.pass_threshold(),
            max_total: policy.max_total(),
            passed: decide(total, policy),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threshold_is_inclusive() {
        let policy = ThresholdPolicy::new(18, 16).unwrap();
        assert!(decide(16, &policy));
        assert!(decide(17, &policy));
        assert!(!decide(15, &policy));
    }

    #[test]
    fn test_zero_threshold_always_passes() {
        let policy = ThresholdPolicy::new(10, 0).unwrap();
        assert!(decide(0, &policy));
    }

    #[test]
    fn test_decide_matches_comparison_exhaustively() {
        for max_total in 0..=20u32 {
            for threshold in 0..=max_total {
                let policy = ThresholdPolicy::new(max_total, threshold).unwrap();
                for total in 0..=max_total + 2 {
                    assert_eq!(decide(total, &policy), total >= threshold);
                }
            }
        }
    }

    #[test]
    fn test_verdict_shortfall() {
        let policy = ThresholdPolicy::new(18, 16).unwrap();
        let verdict = ThresholdGate::evaluate(15, &policy);
        assert!(!verdict.passed);
        assert_eq!(verdict.shortfall(), 1);
        assert_eq!(ThresholdGate::evaluate(17, &policy).shortfall(), 0);
    }
}

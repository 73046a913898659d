//! Release decision engine.
//!
//! Turns a set of [`RiskScores`] into a [`Decision`]. Rules are evaluated in
//! precedence order and short-circuit at the first match:
//!
//! 1. a test whose name contains `critical` (any case) with risk >= 7 → NO_GO
//! 2. any test with risk >= 9 → NO_GO
//! 3. mean risk >= 5 → HOLD (an empty score set has mean 0)
//! 4. otherwise → GO
//!
//! Rule 1 keys severity off the test *name*. That is a naming convention, not
//! a severity classification, and is kept only for compatibility with suites
//! that already rely on it. An explicit severity tag would be the sturdier
//! signal.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::{RiskScores, TestName};

/// Name marker selecting the stricter blocking threshold.
pub const CRITICAL_MARKER: &str = "critical";

/// Risk at which a critical test blocks the release.
pub const CRITICAL_BLOCK_THRESHOLD: u8 = 7;

/// Risk at which any test blocks the release.
pub const HIGH_RISK_BLOCK_THRESHOLD: u8 = 9;

/// Mean risk at which the release is put on hold.
pub const HOLD_MEAN_THRESHOLD: f64 = 5.0;

/// Release gate verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Decision {
    Go,
    Hold,
    NoGo,
}

impl Decision {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Go => "GO",
            Self::Hold => "HOLD",
            Self::NoGo => "NO_GO",
        }
    }

    /// Whether this decision must fail the invoking process.
    pub fn is_blocking(self) -> bool {
        matches!(self, Self::NoGo)
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The rule that produced a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionRule {
    CriticalTestBlocked,
    HighRiskBlocked,
    AverageRiskHold,
    Clear,
}

impl fmt::Display for DecisionRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::CriticalTestBlocked => "critical test at or above blocking risk",
            Self::HighRiskBlocked => "test at or above high-risk threshold",
            Self::AverageRiskHold => "average risk at or above hold threshold",
            Self::Clear => "no blocking condition",
        };
        f.write_str(s)
    }
}

/// A decision with its reasoning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    pub decision: Decision,
    pub rule: DecisionRule,
    /// Test that tripped a blocking rule (first in name order).
    pub trigger: Option<TestName>,
    pub mean_risk: f64,
}

/// Whether a test name selects the critical threshold.
pub fn is_critical(name: &str) -> bool {
    name.to_lowercase().contains(CRITICAL_MARKER)
}

/// Arithmetic mean of all scores; 0 for an empty set.
pub fn mean_risk(scores: &RiskScores) -> f64 {
    if scores.is_empty() {
        return 0.0;
    }
    let total: u32 = scores.values().map(|s| u32::from(*s)).sum();
    f64::from(total) / scores.len() as f64
}

/// Evaluate the decision rules and report which one fired.
pub fn evaluate(scores: &RiskScores) -> Verdict {
    let mean = mean_risk(scores);

    let critical = scores
        .iter()
        .find(|(name, risk)| is_critical(name) && **risk >= CRITICAL_BLOCK_THRESHOLD);
    if let Some((name, _)) = critical {
        return Verdict {
            decision: Decision::NoGo,
            rule: DecisionRule::CriticalTestBlocked,
            trigger: Some(name.clone()),
            mean_risk: mean,
        };
    }

    let high = scores
        .iter()
        .find(|(_, risk)| **risk >= HIGH_RISK_BLOCK_THRESHOLD);
    if let Some((name, _)) = high {
        return Verdict {
            decision: Decision::NoGo,
            rule: DecisionRule::HighRiskBlocked,
            trigger: Some(name.clone()),
            mean_risk: mean,
        };
    }

    let (decision, rule) = if mean >= HOLD_MEAN_THRESHOLD {
        (Decision::Hold, DecisionRule::AverageRiskHold)
    } else {
        (Decision::Go, DecisionRule::Clear)
    };

    Verdict {
        decision,
        rule,
        trigger: None,
        mean_risk: mean,
    }
}

/// Decide the release from risk scores.
pub fn decide(scores: &RiskScores) -> Decision {
    evaluate(scores).decision
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scores(entries: &[(&str, u8)]) -> RiskScores {
        entries
            .iter()
            .map(|(n, s)| (n.to_string(), *s))
            .collect()
    }

    #[test]
    fn critical_test_blocks_despite_low_mean() {
        let s = scores(&[("critical_x", 7), ("a", 0), ("b", 0), ("c", 0)]);
        let v = evaluate(&s);
        assert_eq!(v.decision, Decision::NoGo);
        assert_eq!(v.rule, DecisionRule::CriticalTestBlocked);
        assert_eq!(v.trigger.as_deref(), Some("critical_x"));
        assert!(v.mean_risk < HOLD_MEAN_THRESHOLD);
    }

    #[test]
    fn critical_match_is_case_insensitive_substring() {
        assert!(is_critical("verifyCriticalCheckout"));
        assert!(is_critical("CRITICAL"));
        assert!(!is_critical("verifyCheckout"));
        let s = scores(&[("checkoutCRITICALPath", 8)]);
        assert_eq!(evaluate(&s).rule, DecisionRule::CriticalTestBlocked);
    }

    #[test]
    fn critical_below_threshold_does_not_block() {
        let s = scores(&[("critical_x", 6), ("a", 0)]);
        assert_eq!(decide(&s), Decision::Go);
    }

    #[test]
    fn any_test_at_nine_blocks() {
        let s = scores(&[("plain", 9), ("a", 0), ("b", 0)]);
        let v = evaluate(&s);
        assert_eq!(v.decision, Decision::NoGo);
        assert_eq!(v.rule, DecisionRule::HighRiskBlocked);
        assert_eq!(v.trigger.as_deref(), Some("plain"));
    }

    #[test]
    fn non_critical_eight_does_not_block() {
        let s = scores(&[("plain", 8), ("a", 0)]);
        assert_eq!(decide(&s), Decision::Go);
    }

    #[test]
    fn mean_at_five_holds() {
        let s = scores(&[("a", 5), ("b", 5), ("c", 5)]);
        let v = evaluate(&s);
        assert_eq!(v.decision, Decision::Hold);
        assert_eq!(v.rule, DecisionRule::AverageRiskHold);
        assert!(v.trigger.is_none());
    }

    #[test]
    fn low_scores_go() {
        let s = scores(&[("a", 2), ("b", 2), ("c", 2)]);
        let v = evaluate(&s);
        assert_eq!(v.decision, Decision::Go);
        assert_eq!(v.rule, DecisionRule::Clear);
    }

    #[test]
    fn empty_scores_go() {
        let v = evaluate(&RiskScores::new());
        assert_eq!(v.decision, Decision::Go);
        assert_eq!(v.mean_risk, 0.0);
    }

    #[test]
    fn blockers_take_precedence_over_hold() {
        let s = scores(&[("critical_a", 7), ("b", 10), ("c", 10)]);
        assert_eq!(evaluate(&s).rule, DecisionRule::CriticalTestBlocked);
    }

    #[test]
    fn decide_is_idempotent() {
        let s = scores(&[("a", 4), ("b", 6), ("critical_c", 3)]);
        let first = decide(&s);
        let second = decide(&s);
        assert_eq!(first, second);
        assert_eq!(evaluate(&s), evaluate(&s));
    }

    #[test]
    fn mean_uses_fractional_average() {
        // 4 + 5 = 9 / 2 = 4.5 stays below the hold threshold.
        let s = scores(&[("a", 4), ("b", 5)]);
        assert_eq!(mean_risk(&s), 4.5);
        assert_eq!(decide(&s), Decision::Go);
    }

    #[test]
    fn decision_serializes_screaming_case() {
        assert_eq!(serde_json::to_string(&Decision::NoGo).unwrap(), "\"NO_GO\"");
        assert_eq!(serde_json::to_string(&Decision::Hold).unwrap(), "\"HOLD\"");
        assert_eq!(Decision::Go.to_string(), "GO");
        assert!(Decision::NoGo.is_blocking());
        assert!(!Decision::Hold.is_blocking());
    }
}

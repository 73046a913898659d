//! Per-test risk scoring.
//!
//! A test's risk starts from its base weight and accumulates penalties for a
//! failing current run, a flaky classification and repeated failures in
//! history. The total is clamped to [`MAX_RISK`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::{FlakyMap, LatestResults, Outcome, RiskScores, TestName};
use crate::history::{History, TestHistory};

/// Ceiling for every risk score.
pub const MAX_RISK: u8 = 10;

/// Base weight for tests without a configured override.
pub const DEFAULT_BASE_WEIGHT: u8 = 3;

/// Added when the current run failed.
pub const FAILURE_PENALTY: u8 = 3;

/// Added when the test is classified flaky.
pub const FLAKY_PENALTY: u8 = 2;

/// Added when history holds at least [`REPEATED_FAILURE_THRESHOLD`] failures.
pub const REPEATED_FAILURE_PENALTY: u8 = 2;

pub const REPEATED_FAILURE_THRESHOLD: usize = 3;

/// Base-weight policy: a default weight plus per-test overrides.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskPolicy {
    pub default_weight: u8,
    pub base_weights: BTreeMap<TestName, u8>,
}

impl Default for RiskPolicy {
    fn default() -> Self {
        Self {
            default_weight: DEFAULT_BASE_WEIGHT,
            base_weights: BTreeMap::new(),
        }
    }
}

/// Contribution of each scoring factor before clamping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskFactors {
    pub base: u8,
    pub current_failure: u8,
    pub flaky: u8,
    pub repeated_failures: u8,
}

impl RiskFactors {
    /// Unclamped sum of all factors.
    pub fn total(&self) -> u8 {
        self.base
            .saturating_add(self.current_failure)
            .saturating_add(self.flaky)
            .saturating_add(self.repeated_failures)
    }
}

/// Risk score for one test with its factor breakdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub score: u8,
    pub factors: RiskFactors,
}

impl RiskPolicy {
    /// Override the base weight for one test.
    pub fn with_weight(mut self, name: impl Into<TestName>, weight: u8) -> Self {
        self.base_weights.insert(name.into(), weight);
        self
    }

    /// Override the default base weight.
    pub fn with_default_weight(mut self, weight: u8) -> Self {
        self.default_weight = weight;
        self
    }

    pub fn base_weight(&self, name: &str) -> u8 {
        self.base_weights
            .get(name)
            .copied()
            .unwrap_or(self.default_weight)
    }

    /// Score a single test.
    ///
    /// `history` is the test's post-update history, if any.
    pub fn assess(
        &self,
        name: &str,
        outcome: Outcome,
        history: Option<&TestHistory>,
        flaky: bool,
    ) -> RiskAssessment {
        let failures = history.map_or(0, TestHistory::failures);
        let factors = RiskFactors {
            base: self.base_weight(name),
            current_failure: if outcome == Outcome::Fail {
                FAILURE_PENALTY
            } else {
                0
            },
            flaky: if flaky { FLAKY_PENALTY } else { 0 },
            repeated_failures: if failures >= REPEATED_FAILURE_THRESHOLD {
                REPEATED_FAILURE_PENALTY
            } else {
                0
            },
        };

        RiskAssessment {
            score: factors.total().min(MAX_RISK),
            factors,
        }
    }

    /// Assess every test in `latest`. Tests present only in history are not
    /// scored.
    pub fn assess_all(
        &self,
        latest: &LatestResults,
        history: &History,
        flaky: &FlakyMap,
    ) -> BTreeMap<TestName, RiskAssessment> {
        latest
            .iter()
            .map(|(name, outcome)| {
                let is_flaky = flaky.get(name).copied().unwrap_or(false);
                let assessment = self.assess(name, *outcome, history.get(name), is_flaky);
                (name.clone(), assessment)
            })
            .collect()
    }

    /// Risk score for every test in `latest`.
    pub fn calculate(
        &self,
        latest: &LatestResults,
        history: &History,
        flaky: &FlakyMap,
    ) -> RiskScores {
        self.assess_all(latest, history, flaky)
            .into_iter()
            .map(|(name, a)| (name, a.score))
            .collect()
    }
}

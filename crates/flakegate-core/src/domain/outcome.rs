//! Test outcomes and the per-run maps derived from them.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::error::GateError;

/// Opaque test identifier; unique across all maps.
pub type TestName = String;

/// Outcomes reported for the run being evaluated.
pub type LatestResults = BTreeMap<TestName, Outcome>;

/// Flaky classification per test, derived from history each run.
pub type FlakyMap = BTreeMap<TestName, bool>;

/// Risk score per test, each in `0..=MAX_RISK`.
pub type RiskScores = BTreeMap<TestName, u8>;

/// Terminal status of one test execution.
///
/// Parsing is case-insensitive; serialization always uses the canonical
/// uppercase form (`PASS`, `FAIL`, `SKIP`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Outcome {
    Pass,
    Fail,
    Skip,
}

impl Outcome {
    /// Canonical string form.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pass => "PASS",
            Self::Fail => "FAIL",
            Self::Skip => "SKIP",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Outcome {
    type Err = GateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.eq_ignore_ascii_case("PASS") {
            Ok(Self::Pass)
        } else if trimmed.eq_ignore_ascii_case("FAIL") {
            Ok(Self::Fail)
        } else if trimmed.eq_ignore_ascii_case("SKIP") {
            Ok(Self::Skip)
        } else {
            Err(GateError::InvalidInput(format!(
                "unknown outcome '{}' (expected PASS, FAIL or SKIP)",
                s
            )))
        }
    }
}

impl TryFrom<String> for Outcome {
    type Error = GateError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Outcome> for String {
    fn from(outcome: Outcome) -> Self {
        outcome.as_str().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!("PASS".parse::<Outcome>().unwrap(), Outcome::Pass);
        assert_eq!("pass".parse::<Outcome>().unwrap(), Outcome::Pass);
        assert_eq!("Fail".parse::<Outcome>().unwrap(), Outcome::Fail);
        assert_eq!(" skip ".parse::<Outcome>().unwrap(), Outcome::Skip);
    }

    #[test]
    fn parse_rejects_unknown() {
        let err = "BROKEN".parse::<Outcome>().unwrap_err();
        assert!(err.to_string().contains("BROKEN"));
    }

    #[test]
    fn serializes_canonical_form() {
        let json = serde_json::to_string(&Outcome::Fail).unwrap();
        assert_eq!(json, "\"FAIL\"");
        let back: Outcome = serde_json::from_str("\"fail\"").unwrap();
        assert_eq!(back, Outcome::Fail);
    }

    #[test]
    fn display_matches_canonical_form() {
        assert_eq!(Outcome::Pass.to_string(), "PASS");
        assert_eq!(Outcome::Skip.to_string(), "SKIP");
    }
}

//! Flaky test classification.
//!
//! A test is flaky when its recent history shows at least one success and a
//! repeated failure. A test that only ever fails is broken, not flaky.

use crate::domain::{FlakyMap, Outcome};
use crate::history::History;

/// Minimum number of recorded runs before a test can be called flaky.
pub const MIN_RUNS: usize = 3;

/// Minimum number of failures for a flaky classification.
pub const FAIL_THRESHOLD: usize = 2;

/// Classify one outcome sequence, oldest first. SKIP entries count toward
/// neither side. [`TestHistory::is_flaky`](crate::history::TestHistory::is_flaky)
/// applies this to a stored history.
pub fn is_flaky(history: &[Outcome]) -> bool {
    if history.len() < MIN_RUNS {
        return false;
    }

    let passes = history.iter().filter(|o| **o == Outcome::Pass).count();
    let failures = history.iter().filter(|o| **o == Outcome::Fail).count();

    passes >= 1 && failures >= FAIL_THRESHOLD
}

/// Classify every test in the history independently.
pub fn detect_all(history: &History) -> FlakyMap {
    history
        .iter()
        .map(|(name, runs)| (name.clone(), runs.is_flaky()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use Outcome::{Fail, Pass, Skip};

    #[test]
    fn short_histories_are_never_flaky() {
        assert!(!is_flaky(&[]));
        assert!(!is_flaky(&[Fail]));
        assert!(!is_flaky(&[Pass, Fail]));
        assert!(!is_flaky(&[Fail, Fail]));
    }

    #[test]
    fn pass_with_repeated_failures_is_flaky() {
        assert!(is_flaky(&[Pass, Fail, Fail]));
        assert!(is_flaky(&[Fail, Pass, Fail]));
        assert!(is_flaky(&[Fail, Skip, Pass, Skip, Fail]));
    }

    #[test]
    fn all_failures_is_broken_not_flaky() {
        assert!(!is_flaky(&[Fail, Fail, Fail]));
        assert!(!is_flaky(&[Fail; 10]));
    }

    #[test]
    fn single_failure_is_not_flaky() {
        assert!(!is_flaky(&[Pass, Pass, Fail]));
        assert!(!is_flaky(&[Pass, Skip, Fail, Skip]));
    }

    #[test]
    fn skips_count_toward_neither() {
        assert!(!is_flaky(&[Skip, Skip, Skip]));
        assert!(!is_flaky(&[Skip, Fail, Fail]));
        assert!(!is_flaky(&[Skip, Pass, Fail]));
    }

    #[test]
    fn detect_all_is_per_test() {
        let mut history = History::new();
        for o in [Pass, Fail, Fail] {
            history.record("flaky", o);
        }
        for o in [Fail, Fail, Fail] {
            history.record("broken", o);
        }
        history.record("new", Pass);

        let flaky = detect_all(&history);
        assert_eq!(flaky.len(), 3);
        assert!(flaky["flaky"]);
        assert!(!flaky["broken"]);
        assert!(!flaky["new"]);
    }

    #[test]
    fn stored_history_classifies_like_its_slice() {
        let mut history = History::new();
        for o in [Fail, Pass, Skip, Fail] {
            history.record("t", o);
        }
        let t = history.get("t").unwrap();
        assert_eq!(t.as_slice(), &[Fail, Pass, Skip, Fail]);
        assert!(t.is_flaky());
        assert_eq!(t.is_flaky(), is_flaky(t.as_slice()));
    }

    #[test]
    fn detect_all_on_empty_history() {
        assert!(detect_all(&History::new()).is_empty());
    }
}

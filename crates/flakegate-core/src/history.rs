//! Bounded per-test outcome history and its persistence.
//!
//! Each test keeps at most [`RETENTION_WINDOW`] outcomes, oldest first.
//! Appending past the window evicts the oldest entry.
//!
//! Persistence is best-effort: [`HistoryStore::load`] degrades to an empty
//! history and [`HistoryStore::save`] only logs on failure, so a broken store
//! can never abort a run.

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::domain::{LatestResults, Outcome, Result, TestName};
use crate::flaky;
use crate::obs;

/// Maximum number of outcomes retained per test.
pub const RETENTION_WINDOW: usize = 10;

/// Default location of the persisted history document.
pub const DEFAULT_HISTORY_PATH: &str = "history/test-history.json";

// ---------------------------------------------------------------------------
// TestHistory
// ---------------------------------------------------------------------------

/// Oldest-first outcome sequence for one test, capped at [`RETENTION_WINDOW`].
///
/// Serialized as a plain list of outcome strings. Decoding is lenient per
/// entry: an unrecognised string is dropped with a warning instead of failing
/// the whole document, and lists longer than the window keep their newest
/// entries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<Outcome>")]
pub struct TestHistory {
    runs: Vec<Outcome>,
}

impl TestHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an outcome, evicting from the front past the retention window.
    pub fn push(&mut self, outcome: Outcome) {
        self.runs.push(outcome);
        let excess = self.runs.len().saturating_sub(RETENTION_WINDOW);
        self.runs.drain(..excess);
    }

    pub fn len(&self) -> usize {
        self.runs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    /// Outcomes oldest-first.
    pub fn iter(&self) -> impl Iterator<Item = Outcome> + '_ {
        self.runs.iter().copied()
    }

    pub fn as_slice(&self) -> &[Outcome] {
        &self.runs
    }

    pub fn to_vec(&self) -> Vec<Outcome> {
        self.runs.clone()
    }

    /// Flaky classification of this sequence, see [`flaky::is_flaky`].
    pub fn is_flaky(&self) -> bool {
        flaky::is_flaky(&self.runs)
    }

    pub fn passes(&self) -> usize {
        self.count(Outcome::Pass)
    }

    pub fn failures(&self) -> usize {
        self.count(Outcome::Fail)
    }

    fn count(&self, outcome: Outcome) -> usize {
        self.runs.iter().filter(|o| **o == outcome).count()
    }
}

impl From<Vec<Outcome>> for TestHistory {
    fn from(mut runs: Vec<Outcome>) -> Self {
        let excess = runs.len().saturating_sub(RETENTION_WINDOW);
        runs.drain(..excess);
        Self { runs }
    }
}

impl From<Vec<String>> for TestHistory {
    fn from(raw: Vec<String>) -> Self {
        raw.iter()
            .filter_map(|value| match value.parse::<Outcome>() {
                Ok(outcome) => Some(outcome),
                Err(_) => {
                    obs::emit_unknown_outcome(value);
                    None
                }
            })
            .collect::<Vec<Outcome>>()
            .into()
    }
}

impl From<TestHistory> for Vec<Outcome> {
    fn from(history: TestHistory) -> Self {
        history.runs
    }
}

// ---------------------------------------------------------------------------
// History
// ---------------------------------------------------------------------------

/// Outcome history for every test observed so far.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct History {
    tests: BTreeMap<TestName, TestHistory>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one run's results into the history.
    ///
    /// Each test's sequence is independent, so iteration order over
    /// `latest` does not affect the result.
    pub fn update(&mut self, latest: &LatestResults) {
        for (name, outcome) in latest {
            self.record(name, *outcome);
        }
    }

    /// Append a single outcome, creating the test's sequence if absent.
    pub fn record(&mut self, name: &str, outcome: Outcome) {
        self.tests.entry(name.to_string()).or_default().push(outcome);
    }

    pub fn get(&self, name: &str) -> Option<&TestHistory> {
        self.tests.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&TestName, &TestHistory)> {
        self.tests.iter()
    }

    pub fn len(&self) -> usize {
        self.tests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tests.is_empty()
    }
}

impl FromIterator<(TestName, TestHistory)> for History {
    fn from_iter<I: IntoIterator<Item = (TestName, TestHistory)>>(iter: I) -> Self {
        Self {
            tests: iter.into_iter().collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// HistoryStore
// ---------------------------------------------------------------------------

/// Durable storage for [`History`].
///
/// Implementors provide the fallible `read`/`write` primitives; callers in the
/// pipeline use `load`/`save`, which never fail.
pub trait HistoryStore {
    /// Read persisted history. `Ok(None)` when nothing has been persisted.
    fn read(&self) -> Result<Option<History>>;

    /// Persist the full history, replacing prior content.
    fn write(&self, history: &History) -> Result<()>;

    /// Load history, degrading to empty on a missing or structurally invalid
    /// store.
    fn load(&self) -> History {
        match self.read() {
            Ok(Some(history)) => history,
            Ok(None) => History::default(),
            Err(e) => {
                obs::emit_store_error("load", &e);
                History::default()
            }
        }
    }

    /// Save history; failures are logged and swallowed.
    fn save(&self, history: &History) {
        if let Err(e) = self.write(history) {
            obs::emit_store_error("save", &e);
        }
    }
}

/// Pretty-printed JSON document mapping test name to its outcome list.
///
/// Writes go through a temp file in the target directory and are renamed into
/// place, so a crash never leaves a half-written document.
#[derive(Debug, Clone)]
pub struct JsonFileHistoryStore {
    path: PathBuf,
}

impl JsonFileHistoryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Delete the persisted document. Returns whether a file was removed.
    pub fn remove(&self) -> Result<bool> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

impl Default for JsonFileHistoryStore {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_PATH)
    }
}

impl HistoryStore for JsonFileHistoryStore {
    fn read(&self) -> Result<Option<History>> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        if raw.trim().is_empty() {
            return Ok(None);
        }
        Ok(Some(serde_json::from_str(&raw)?))
    }

    fn write(&self, history: &History) -> Result<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir)?;

        let mut content = serde_json::to_string_pretty(history)?;
        content.push('\n');

        let mut tmp = NamedTempFile::new_in(&dir)?;
        tmp.write_all(content.as_bytes())?;
        tmp.persist(&self.path).map_err(|e| e.error)?;
        Ok(())
    }
}

//! In-memory fakes for the storage and reporting traits (testing only)
//!
//! Provides `MemoryHistoryStore` and `MemorySink` that satisfy the trait
//! contracts without touching the filesystem or stdout.

use std::sync::{Arc, Mutex, PoisonError};

use crate::domain::{GateError, Result};
use crate::history::{History, HistoryStore};
use crate::report::{ReportSink, RunReport};

// ---------------------------------------------------------------------------
// MemoryHistoryStore
// ---------------------------------------------------------------------------

/// In-memory history store. Can be configured to fail every operation.
#[derive(Debug, Default)]
pub struct MemoryHistoryStore {
    history: Mutex<Option<History>>,
    broken: bool,
}

impl MemoryHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with persisted history.
    pub fn with_history(history: History) -> Self {
        Self {
            history: Mutex::new(Some(history)),
            broken: false,
        }
    }

    /// Store whose reads and writes always fail.
    pub fn broken() -> Self {
        Self {
            history: Mutex::new(None),
            broken: true,
        }
    }

    fn check(&self, op: &str) -> Result<()> {
        if self.broken {
            return Err(GateError::Io(std::io::Error::other(format!(
                "memory store {} failure",
                op
            ))));
        }
        Ok(())
    }
}

impl HistoryStore for MemoryHistoryStore {
    fn read(&self) -> Result<Option<History>> {
        self.check("read")?;
        let guard = self.history.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(guard.clone())
    }

    fn write(&self, history: &History) -> Result<()> {
        self.check("write")?;
        let mut guard = self.history.lock().unwrap_or_else(PoisonError::into_inner);
        *guard = Some(history.clone());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// MemorySink
// ---------------------------------------------------------------------------

/// Sink that keeps published reports. Clones share the same buffer, so a
/// clone kept by the test observes what the coordinator published.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    reports: Arc<Mutex<Vec<RunReport>>>,
    failing: bool,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sink that rejects every report.
    pub fn failing() -> Self {
        Self {
            reports: Arc::default(),
            failing: true,
        }
    }

    /// Reports published so far, in order.
    pub fn reports(&self) -> Vec<RunReport> {
        self.reports
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl ReportSink for MemorySink {
    fn name(&self) -> &str {
        "memory"
    }

    fn publish(&self, report: &RunReport) -> Result<()> {
        if self.failing {
            return Err(GateError::Io(std::io::Error::other("memory sink failure")));
        }
        self.reports
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(report.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Outcome;

    #[test]
    fn memory_store_roundtrip() {
        let store = MemoryHistoryStore::new();
        assert!(store.read().unwrap().is_none());

        let mut history = History::new();
        history.record("t", Outcome::Pass);
        store.save(&history);
        assert_eq!(store.load(), history);
    }

    #[test]
    fn broken_store_degrades() {
        let store = MemoryHistoryStore::broken();
        assert!(store.read().is_err());
        assert!(store.write(&History::new()).is_err());
        assert!(store.load().is_empty());
    }
}

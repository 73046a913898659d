//! Error taxonomy for the release gate.

use std::path::PathBuf;

/// Release gate errors.
///
/// Only [`GateError::ReleaseBlocked`] is raised by the decision pipeline
/// itself. Persistence failures are absorbed by
/// [`HistoryStore::load`](crate::history::HistoryStore::load) and
/// [`HistoryStore::save`](crate::history::HistoryStore::save).
#[derive(Debug, thiserror::Error)]
pub enum GateError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid config {path:?}: {reason}")]
    Config { path: PathBuf, reason: String },

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("release blocked: FINAL DECISION = NO_GO (run {run_id})")]
    ReleaseBlocked { run_id: String, summary: String },
}

impl GateError {
    /// Whether this is the deliberate NO_GO signal rather than a fault.
    pub fn is_release_blocked(&self) -> bool {
        matches!(self, Self::ReleaseBlocked { .. })
    }
}

/// Result type for release gate operations.
pub type Result<T> = std::result::Result<T, GateError>;

//! flakegate Core Library
//!
//! Turns a history of test outcomes into a release gate:
//! - `history`: bounded per-test outcome log and its persistence
//! - `flaky`: flaky test classification
//! - `risk`: per-test risk scoring
//! - `decision`: GO / HOLD / NO_GO rules
//! - `coordinator`: per-run collection and finalization

pub mod config;
pub mod coordinator;
pub mod decision;
pub mod domain;
pub mod fakes;
pub mod flaky;
pub mod history;
pub mod ingest;
pub mod obs;
pub mod report;
pub mod risk;
pub mod telemetry;

pub use config::{GateConfig, DEFAULT_CONFIG_PATH};
pub use coordinator::{RunContext, RunCoordinator, RunPhase};
pub use decision::{decide, evaluate, Decision, DecisionRule, Verdict};
pub use domain::{FlakyMap, GateError, LatestResults, Outcome, Result, RiskScores, TestName};
pub use flaky::{detect_all, is_flaky};
pub use history::{
    History, HistoryStore, JsonFileHistoryStore, TestHistory, DEFAULT_HISTORY_PATH,
    RETENTION_WINDOW,
};
pub use ingest::{parse_pair, parse_results, read_results_file, OutcomeEvent};
pub use report::{
    render_summary, AttachmentSink, ConsoleSink, ReportSink, ReportStatus, RunReport, TestReport,
    DEFAULT_REPORT_DIR,
};
pub use risk::{RiskAssessment, RiskFactors, RiskPolicy, MAX_RISK};
pub use telemetry::init_tracing;

/// flakegate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

//! Lifecycle events for the release gate.
//!
//! Every event carries an `event = "<area>.<what>"` field so log pipelines
//! can filter on it. Pipeline progress is logged at `info!`; anything that was
//! recovered from (store, sink or decoding trouble) at `warn!`.

use std::time::Instant;

use tracing::{info, warn};

use crate::coordinator::RunPhase;
use crate::decision::Verdict;

/// Span covering one run's finalization. Dropping it logs the elapsed time.
pub struct RunSpan {
    started: Instant,
    _span: tracing::span::EnteredSpan,
}

impl RunSpan {
    /// Open the `flakegate.run` span, tagged with `run_id`, and enter it.
    pub fn enter(run_id: &str) -> Self {
        Self {
            started: Instant::now(),
            _span: tracing::info_span!("flakegate.run", run_id = %run_id).entered(),
        }
    }
}

impl Drop for RunSpan {
    fn drop(&mut self) {
        let elapsed_ms = self.started.elapsed().as_millis() as u64;
        // Still inside the span: fields drop after this body runs.
        info!(event = "run.closed", elapsed_ms = elapsed_ms);
    }
}

/// The run moved to `phase`.
pub fn emit_phase(run_id: &str, phase: RunPhase) {
    info!(event = "run.phase", run_id = %run_id, phase = ?phase);
}

/// Finalization began with `tests` reported results.
pub fn emit_run_started(run_id: &str, tests: usize) {
    info!(event = "run.finalizing", run_id = %run_id, tests = tests);
}

/// The run's results were folded into history and handed to the store.
pub fn emit_history_updated(tracked_tests: usize, updated_tests: usize) {
    info!(
        event = "history.updated",
        tracked_tests = tracked_tests,
        updated_tests = updated_tests,
    );
}

pub fn emit_flaky_detected(flaky_tests: usize) {
    info!(event = "flaky.detected", flaky_tests = flaky_tests);
}

/// The decision engine produced `verdict`.
pub fn emit_decision(run_id: &str, verdict: &Verdict) {
    info!(
        event = "decision.made",
        run_id = %run_id,
        decision = %verdict.decision,
        rule = ?verdict.rule,
        trigger = verdict.trigger.as_deref().unwrap_or(""),
        mean_risk = verdict.mean_risk,
    );
}

/// A store `operation` (`load` or `save`) failed and was recovered from.
pub fn emit_store_error(operation: &str, error: &dyn std::fmt::Display) {
    warn!(event = "history.store_error", operation = %operation, error = %error);
}

/// A persisted outcome string was not recognised and was dropped.
pub fn emit_unknown_outcome(value: &str) {
    warn!(event = "history.unknown_outcome", value = %value);
}

/// A sink rejected the report; the remaining sinks still run.
pub fn emit_sink_error(sink: &str, error: &dyn std::fmt::Display) {
    warn!(event = "report.sink_error", sink = %sink, error = %error);
}

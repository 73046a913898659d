//! Run coordination: collecting outcomes and finalizing a run.
//!
//! A [`RunContext`] is created per run and accumulates outcomes while tests
//! execute (IDLE → COLLECTING). Handing it to [`RunCoordinator::finalize`]
//! consumes it and drives the pipeline in strict order:
//!
//! load history → update → save → detect flaky → score → decide → publish
//!
//! The report is published to every sink before a NO_GO decision is surfaced
//! as [`GateError::ReleaseBlocked`].

use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Utc};
use tracing::debug;
use uuid::Uuid;

use crate::decision;
use crate::domain::{GateError, LatestResults, Outcome, Result, RiskScores, TestName};
use crate::flaky;
use crate::history::HistoryStore;
use crate::obs::{self, RunSpan};
use crate::report::{ReportSink, RunReport, TestReport};
use crate::risk::RiskPolicy;

/// Lifecycle phase of a run.
///
/// `Idle` and `Collecting` are read from [`RunContext::phase`]; the later
/// phases are reported as `run.phase` events while finalizing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Idle,
    Collecting,
    Finalizing,
    Published,
}

/// Per-run accumulator of test outcomes.
///
/// `record` takes `&self` and may be called concurrently from several test
/// callbacks (share the context through an `Arc`). A test reporting twice
/// keeps its last outcome.
#[derive(Debug)]
pub struct RunContext {
    run_id: Uuid,
    started_at: DateTime<Utc>,
    results: Mutex<LatestResults>,
}

impl Default for RunContext {
    fn default() -> Self {
        Self::new()
    }
}

impl RunContext {
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            results: Mutex::new(LatestResults::new()),
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Record the outcome of one concluded test.
    pub fn record(&self, name: impl Into<TestName>, outcome: Outcome) {
        let name = name.into();
        debug!(event = "run.outcome_recorded", test = %name, outcome = %outcome);
        self.lock().insert(name, outcome);
    }

    /// Record a batch of outcomes in order.
    pub fn record_all<I, N>(&self, outcomes: I)
    where
        I: IntoIterator<Item = (N, Outcome)>,
        N: Into<TestName>,
    {
        for (name, outcome) in outcomes {
            self.record(name, outcome);
        }
    }

    pub fn phase(&self) -> RunPhase {
        if self.lock().is_empty() {
            RunPhase::Idle
        } else {
            RunPhase::Collecting
        }
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Copy of the results recorded so far.
    pub fn snapshot(&self) -> LatestResults {
        self.lock().clone()
    }

    /// Close the run and take its results.
    pub fn into_results(self) -> LatestResults {
        self.results
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, LatestResults> {
        // A panicking recorder cannot leave the map half-written.
        self.results.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Owns the history store for the duration of a run and drives finalization.
pub struct RunCoordinator<S> {
    store: S,
    policy: RiskPolicy,
    sinks: Vec<Box<dyn ReportSink>>,
}

impl<S: HistoryStore> RunCoordinator<S> {
    pub fn new(store: S, policy: RiskPolicy) -> Self {
        Self {
            store,
            policy,
            sinks: Vec::new(),
        }
    }

    /// Add a report sink. Sinks are published to in insertion order.
    pub fn with_sink(mut self, sink: impl ReportSink + 'static) -> Self {
        self.sinks.push(Box::new(sink));
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn policy(&self) -> &RiskPolicy {
        &self.policy
    }

    /// Finalize a run.
    ///
    /// Returns the published report for GO and HOLD. For NO_GO the report is
    /// still published, then `GateError::ReleaseBlocked` is returned.
    pub fn finalize(&self, ctx: RunContext) -> Result<RunReport> {
        let run_id = ctx.run_id().to_string();
        let _span = RunSpan::enter(&run_id);
        let latest = ctx.into_results();

        obs::emit_phase(&run_id, RunPhase::Finalizing);
        obs::emit_run_started(&run_id, latest.len());

        let mut history = self.store.load();
        history.update(&latest);
        self.store.save(&history);
        obs::emit_history_updated(history.len(), latest.len());

        let flaky_map = flaky::detect_all(&history);
        obs::emit_flaky_detected(flaky_map.values().filter(|f| **f).count());

        let assessments = self.policy.assess_all(&latest, &history, &flaky_map);
        let scores: RiskScores = assessments
            .iter()
            .map(|(name, a)| (name.clone(), a.score))
            .collect();
        let verdict = decision::evaluate(&scores);
        obs::emit_decision(&run_id, &verdict);

        let tests: Vec<TestReport> = assessments
            .into_iter()
            .map(|(name, assessment)| TestReport {
                outcome: latest[&name],
                risk: assessment.score,
                flaky: flaky_map.get(&name).copied().unwrap_or(false),
                history: history.get(&name).map(|h| h.to_vec()).unwrap_or_default(),
                factors: assessment.factors,
                name,
            })
            .collect();
        let report = RunReport::new(run_id.clone(), &verdict, tests);

        self.publish(&report);
        obs::emit_phase(&run_id, RunPhase::Published);

        if verdict.decision.is_blocking() {
            return Err(GateError::ReleaseBlocked {
                run_id,
                summary: report.summary(),
            });
        }
        Ok(report)
    }

    fn publish(&self, report: &RunReport) {
        for sink in &self.sinks {
            if let Err(e) = sink.publish(report) {
                obs::emit_sink_error(sink.name(), &e);
            }
        }
    }
}

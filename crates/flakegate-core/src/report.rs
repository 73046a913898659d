//! Release decision reporting.
//!
//! Provides the run report and the sinks it is published to:
//! - `ConsoleSink`: the text summary on stdout
//! - `AttachmentSink`: `release-decision-summary.txt` plus a machine-readable
//!   `release-decision.json` in a report directory

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::decision::{Decision, DecisionRule, Verdict};
use crate::domain::{Outcome, Result, RiskScores, TestName};
use crate::risk::RiskFactors;

pub const REPORT_SCHEMA_VERSION: &str = "1.0";

/// Directory attachments are written to unless configured otherwise.
pub const DEFAULT_REPORT_DIR: &str = "target/release-decision";

/// File name of the text summary attachment.
pub const SUMMARY_FILE: &str = "release-decision-summary.txt";

/// File name of the JSON decision attachment.
pub const REPORT_FILE: &str = "release-decision.json";

const SUMMARY_HEADER: &str = "===== RELEASE DECISION SUMMARY =====";
const SUMMARY_DIVIDER: &str = "-----------------------------------";
const SUMMARY_FOOTER: &str = "===================================";

// ── release-decision.json schema ──────────────────────────────────────────

/// Per-test entry of the run report.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TestReport {
    pub name: TestName,
    pub outcome: Outcome,
    pub risk: u8,
    pub flaky: bool,
    /// Post-update history, oldest first.
    pub history: Vec<Outcome>,
    pub factors: RiskFactors,
}

/// Report status as seen by CI dashboards.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    Passed,
    Failed,
}

impl From<Decision> for ReportStatus {
    fn from(decision: Decision) -> Self {
        if decision.is_blocking() {
            Self::Failed
        } else {
            Self::Passed
        }
    }
}

/// Everything produced by one finalized run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunReport {
    pub schema_version: String,
    pub run_id: String,
    pub generated_at: DateTime<Utc>,
    pub decision: Decision,
    pub status: ReportStatus,
    pub rule: DecisionRule,
    pub trigger: Option<TestName>,
    pub mean_risk: f64,
    pub tests: Vec<TestReport>,
}

impl RunReport {
    pub fn new(run_id: impl Into<String>, verdict: &Verdict, tests: Vec<TestReport>) -> Self {
        Self {
            schema_version: REPORT_SCHEMA_VERSION.to_string(),
            run_id: run_id.into(),
            generated_at: Utc::now(),
            decision: verdict.decision,
            status: verdict.decision.into(),
            rule: verdict.rule,
            trigger: verdict.trigger.clone(),
            mean_risk: verdict.mean_risk,
            tests,
        }
    }

    pub fn risk_scores(&self) -> RiskScores {
        self.tests.iter().map(|t| (t.name.clone(), t.risk)).collect()
    }

    pub fn flaky_tests(&self) -> impl Iterator<Item = &TestReport> {
        self.tests.iter().filter(|t| t.flaky)
    }

    /// Text summary for console and attachment output.
    pub fn summary(&self) -> String {
        render_summary(
            self.tests.iter().map(|t| (t.name.as_str(), t.risk, t.flaky)),
            self.decision,
        )
    }
}

/// Render the text summary: one `name → Risk: n[ (FLAKY)]` line per test
/// followed by the final decision.
pub fn render_summary<'a>(
    rows: impl IntoIterator<Item = (&'a str, u8, bool)>,
    decision: Decision,
) -> String {
    let mut out = String::new();
    out.push_str(SUMMARY_HEADER);
    out.push('\n');
    for (name, risk, flaky) in rows {
        out.push_str(&format!("{} → Risk: {}", name, risk));
        if flaky {
            out.push_str(" (FLAKY)");
        }
        out.push('\n');
    }
    out.push_str(SUMMARY_DIVIDER);
    out.push('\n');
    out.push_str(&format!("FINAL DECISION → {}\n", decision));
    out.push_str(SUMMARY_FOOTER);
    out.push('\n');
    out
}

// ── sinks ─────────────────────────────────────────────────────────────────

/// Destination for finalized run reports.
pub trait ReportSink {
    /// Short name used in logs.
    fn name(&self) -> &str;

    fn publish(&self, report: &RunReport) -> Result<()>;
}

/// Prints the text summary to stdout.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleSink;

impl ReportSink for ConsoleSink {
    fn name(&self) -> &str {
        "console"
    }

    fn publish(&self, report: &RunReport) -> Result<()> {
        let mut stdout = std::io::stdout().lock();
        writeln!(stdout)?;
        write!(stdout, "{}", report.summary())?;
        stdout.flush()?;
        Ok(())
    }
}

/// Writes the summary and the JSON report into a directory.
#[derive(Debug, Clone)]
pub struct AttachmentSink {
    dir: PathBuf,
}

impl AttachmentSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl ReportSink for AttachmentSink {
    fn name(&self) -> &str {
        "attachment"
    }

    fn publish(&self, report: &RunReport) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        fs::write(self.dir.join(SUMMARY_FILE), report.summary())?;
        write_report_json(&self.dir.join(REPORT_FILE), report)
    }
}

/// Write release-decision.json in pretty JSON format.
pub fn write_report_json(path: &Path, report: &RunReport) -> Result<()> {
    let content = serde_json::to_string_pretty(report)?;
    fs::write(path, content)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn factors(base: u8) -> RiskFactors {
        RiskFactors {
            base,
            current_failure: 0,
            flaky: 0,
            repeated_failures: 0,
        }
    }

    fn sample_report(decision: Decision) -> RunReport {
        let verdict = Verdict {
            decision,
            rule: DecisionRule::Clear,
            trigger: None,
            mean_risk: 3.0,
        };
        RunReport::new(
            "run-1",
            &verdict,
            vec![
                TestReport {
                    name: "checkout".to_string(),
                    outcome: Outcome::Fail,
                    risk: 4,
                    flaky: true,
                    history: vec![Outcome::Pass, Outcome::Fail, Outcome::Fail],
                    factors: factors(2),
                },
                TestReport {
                    name: "login".to_string(),
                    outcome: Outcome::Pass,
                    risk: 2,
                    flaky: false,
                    history: vec![Outcome::Pass],
                    factors: factors(2),
                },
            ],
        )
    }

    #[test]
    fn summary_render_is_stable() {
        let summary = sample_report(Decision::Go).summary();
        let expected = "===== RELEASE DECISION SUMMARY =====\n\
                        checkout → Risk: 4 (FLAKY)\n\
                        login → Risk: 2\n\
                        -----------------------------------\n\
                        FINAL DECISION → GO\n\
                        ===================================\n";
        assert_eq!(summary, expected);
    }

    #[test]
    fn empty_summary_still_has_decision() {
        let summary = render_summary(std::iter::empty(), Decision::Go);
        assert!(summary.contains("FINAL DECISION → GO"));
    }

    #[test]
    fn status_follows_decision() {
        assert_eq!(ReportStatus::from(Decision::NoGo), ReportStatus::Failed);
        assert_eq!(ReportStatus::from(Decision::Hold), ReportStatus::Passed);
        assert_eq!(ReportStatus::from(Decision::Go), ReportStatus::Passed);
    }

    #[test]
    fn report_schema_has_expected_keys() {
        let raw = serde_json::to_value(sample_report(Decision::NoGo)).unwrap();
        let obj = raw.as_object().unwrap();
        for key in [
            "schema_version",
            "run_id",
            "generated_at",
            "decision",
            "status",
            "rule",
            "trigger",
            "mean_risk",
            "tests",
        ] {
            assert!(obj.contains_key(key), "missing {}", key);
        }
        assert_eq!(raw["decision"], json!("NO_GO"));
        assert_eq!(raw["status"], json!("failed"));
        assert_eq!(raw["tests"][0]["outcome"], json!("FAIL"));
        assert_eq!(raw["tests"][0]["history"], json!(["PASS", "FAIL", "FAIL"]));
    }

    #[test]
    fn attachment_sink_writes_both_files() {
        let dir = tempfile::tempdir().unwrap();
        let sink = AttachmentSink::new(dir.path().join("reports"));
        let report = sample_report(Decision::Hold);
        sink.publish(&report).unwrap();

        let summary = fs::read_to_string(sink.dir().join(SUMMARY_FILE)).unwrap();
        assert_eq!(summary, report.summary());

        let raw = fs::read_to_string(sink.dir().join(REPORT_FILE)).unwrap();
        let back: RunReport = serde_json::from_str(&raw).unwrap();
        assert_eq!(back, report);
    }

    #[test]
    fn risk_scores_and_flaky_views() {
        let report = sample_report(Decision::Go);
        let scores = report.risk_scores();
        assert_eq!(scores["checkout"], 4);
        assert_eq!(scores["login"], 2);
        let flaky: Vec<_> = report.flaky_tests().map(|t| t.name.as_str()).collect();
        assert_eq!(flaky, vec!["checkout"]);
    }
}

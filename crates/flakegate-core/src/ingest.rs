//! Parsing of outcome events reported by the test harness.
//!
//! Accepted result documents (JSON):
//! - an object `{ "<test>": "<OUTCOME>", ... }`
//! - an array `[{ "test": "<name>", "outcome": "<OUTCOME>" }, ...]`
//!
//! plus `name=OUTCOME` pairs from the command line. Outcomes are
//! case-insensitive.

use std::fs;
use std::path::Path;

use serde::Deserialize;
use serde_json::Value;

use crate::domain::{GateError, Outcome, Result, TestName};

/// One `(test, outcome)` event from the harness.
pub type OutcomeEvent = (TestName, Outcome);

#[derive(Debug, Deserialize)]
struct EventRecord {
    #[serde(alias = "name", alias = "testName")]
    test: String,
    #[serde(alias = "status")]
    outcome: String,
}

/// Parse a JSON result document into events, preserving document order for
/// arrays.
pub fn parse_results(raw: &str) -> Result<Vec<OutcomeEvent>> {
    let value: Value = serde_json::from_str(raw)?;
    match value {
        Value::Object(map) => map
            .into_iter()
            .map(|(test, outcome)| match outcome {
                Value::String(s) => Ok((test, s.parse()?)),
                other => Err(GateError::InvalidInput(format!(
                    "outcome for '{}' must be a string, got {}",
                    test, other
                ))),
            })
            .collect(),
        Value::Array(items) => items
            .into_iter()
            .map(|item| {
                let record: EventRecord = serde_json::from_value(item)?;
                event(record.test, &record.outcome)
            })
            .collect(),
        other => Err(GateError::InvalidInput(format!(
            "result document must be an object or an array, got {}",
            kind(&other)
        ))),
    }
}

/// Read and parse a result file.
pub fn read_results_file(path: &Path) -> Result<Vec<OutcomeEvent>> {
    let raw = fs::read_to_string(path)?;
    parse_results(&raw).map_err(|e| match e {
        GateError::InvalidInput(msg) => {
            GateError::InvalidInput(format!("{}: {}", path.display(), msg))
        }
        other => other,
    })
}

/// Parse a `name=OUTCOME` pair. The last `=` separates the outcome, so test
/// names may contain `=`.
pub fn parse_pair(pair: &str) -> Result<OutcomeEvent> {
    let (name, outcome) = pair.rsplit_once('=').ok_or_else(|| {
        GateError::InvalidInput(format!("expected name=OUTCOME, got '{}'", pair))
    })?;
    event(name.trim().to_string(), outcome)
}

fn event(test: String, outcome: &str) -> Result<OutcomeEvent> {
    if test.is_empty() {
        return Err(GateError::InvalidInput("test name must not be empty".to_string()));
    }
    Ok((test, outcome.parse()?))
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

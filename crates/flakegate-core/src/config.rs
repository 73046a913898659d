//! Gate configuration loaded from TOML.
//!
//! ```toml
//! [history]
//! path = "history/test-history.json"
//!
//! [report]
//! dir = "target/release-decision"
//! attachments = true
//!
//! [risk]
//! default_weight = 3
//!
//! [risk.base_weights]
//! verifyPredictionGenerated = 7
//! ```
//!
//! Malformed weights are not fatal: a bad `default_weight` falls back to
//! [`DEFAULT_BASE_WEIGHT`] and a bad per-test entry is dropped so that test
//! uses the default weight.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::warn;

use crate::domain::{GateError, Result};
use crate::history::DEFAULT_HISTORY_PATH;
use crate::report::DEFAULT_REPORT_DIR;
use crate::risk::{RiskPolicy, DEFAULT_BASE_WEIGHT, MAX_RISK};

/// Config file looked up when none is given explicitly.
pub const DEFAULT_CONFIG_PATH: &str = "flakegate.toml";

/// Resolved gate configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateConfig {
    pub history_path: PathBuf,
    /// Directory the summary and JSON report attachments are written to.
    pub report_dir: PathBuf,
    /// Whether the attachment channel is published to at all.
    pub attachments: bool,
    pub risk: RiskPolicy,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            history_path: PathBuf::from(DEFAULT_HISTORY_PATH),
            report_dir: PathBuf::from(DEFAULT_REPORT_DIR),
            attachments: true,
            risk: RiskPolicy::default(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawConfig {
    history: RawHistory,
    report: RawReport,
    risk: RawRisk,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawHistory {
    path: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawReport {
    dir: Option<PathBuf>,
    attachments: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawRisk {
    default_weight: Option<toml::Value>,
    base_weights: toml::Table,
}

impl GateConfig {
    /// Load configuration from `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        match fs::read_to_string(path) {
            Ok(raw) => Self::from_toml_str(&raw, path),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(GateError::Config {
                path: path.to_path_buf(),
                reason: e.to_string(),
            }),
        }
    }

    /// Parse configuration text. `origin` is used for error messages only.
    pub fn from_toml_str(raw: &str, origin: &Path) -> Result<Self> {
        let parsed: RawConfig = toml::from_str(raw).map_err(|e| GateError::Config {
            path: origin.to_path_buf(),
            reason: e.to_string(),
        })?;

        let default_weight = match parsed.risk.default_weight {
            None => DEFAULT_BASE_WEIGHT,
            Some(value) => parse_weight(&value).unwrap_or_else(|| {
                warn!(
                    event = "config.invalid_weight",
                    key = "default_weight",
                    value = %value,
                    fallback = DEFAULT_BASE_WEIGHT,
                );
                DEFAULT_BASE_WEIGHT
            }),
        };

        let mut risk = RiskPolicy::default().with_default_weight(default_weight);
        for (name, value) in &parsed.risk.base_weights {
            match parse_weight(value) {
                Some(weight) => risk = risk.with_weight(name.clone(), weight),
                None => warn!(
                    event = "config.invalid_weight",
                    key = %name,
                    value = %value,
                    fallback = default_weight,
                ),
            }
        }

        Ok(Self {
            history_path: parsed
                .history
                .path
                .unwrap_or_else(|| PathBuf::from(DEFAULT_HISTORY_PATH)),
            report_dir: parsed
                .report
                .dir
                .unwrap_or_else(|| PathBuf::from(DEFAULT_REPORT_DIR)),
            attachments: parsed.report.attachments.unwrap_or(true),
            risk,
        })
    }
}

fn parse_weight(value: &toml::Value) -> Option<u8> {
    value
        .as_integer()
        .and_then(|w| u8::try_from(w).ok())
        .filter(|w| *w <= MAX_RISK)
}

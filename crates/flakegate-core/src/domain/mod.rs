//! Domain models for flakegate.
//!
//! - `Outcome`: terminal status of one test execution
//! - `LatestResults`, `FlakyMap`, `RiskScores`: per-run maps keyed by test name
//! - `GateError`: error taxonomy

pub mod error;
pub mod outcome;

pub use error::{GateError, Result};
pub use outcome::{FlakyMap, LatestResults, Outcome, RiskScores, TestName};

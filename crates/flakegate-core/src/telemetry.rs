//! Process-wide log subscriber for flakegate binaries.
//!
//! Output always goes to stderr; stdout belongs to the release summary and
//! command output. `RUST_LOG` wins over the level passed in.

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer, Registry};

/// Install the global subscriber: human-readable lines, or one JSON object
/// per line when `json` is set.
///
/// Only the first call in a process takes effect; later calls are no-ops.
pub fn init_tracing(json: bool, level: Level) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()));

    let lines = fmt::layer().with_target(false).with_writer(std::io::stderr);
    let output: Box<dyn Layer<Registry> + Send + Sync> = if json {
        lines.json().boxed()
    } else {
        lines.boxed()
    };

    // Err only means a subscriber is already installed.
    let _ = tracing_subscriber::registry()
        .with(output)
        .with(filter)
        .try_init();
}

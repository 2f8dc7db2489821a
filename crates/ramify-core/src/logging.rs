//! Log subscriber setup
//!
//! The library only emits `tracing` events; installing a subscriber is up
//! to the test binary. These helpers cover the usual cases.

use tracing_subscriber::EnvFilter;

/// Environment variable holding the filter directive
pub const LOG_ENV: &str = "RAMIFY_LOG";

/// Filter used when [`LOG_ENV`] is unset or invalid
pub const DEFAULT_FILTER: &str = "warn";

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable, compact lines
    #[default]
    Compact,

    /// One JSON object per event
    Json,
}

fn filter() -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Install a global subscriber writing to stderr
///
/// Returns `false` if a subscriber was already installed.
pub fn init(format: LogFormat) -> bool {
    let builder = tracing_subscriber::fmt().with_env_filter(filter()).with_target(false);
    match format {
        LogFormat::Compact => builder.compact().try_init().is_ok(),
        LogFormat::Json => builder.json().try_init().is_ok(),
    }
}

/// Install a subscriber that writes through the test harness' capture
///
/// Safe to call from every test; only the first call installs anything.
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter())
        .with_target(false)
        .with_test_writer()
        .try_init();
}

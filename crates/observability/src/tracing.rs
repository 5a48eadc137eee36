//! Env-filtered JSON logging.

use tracing_subscriber::EnvFilter;

/// Install the global subscriber: JSON lines, level via `RUST_LOG`
/// (default `info`). Errors from a second install are swallowed so tests
/// can call this freely.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .json()
        .with_current_span(false)
        .with_target(false)
        .try_init();
}

//! Shared tracing/logging setup for fieldpost binaries.

pub mod tracing;

/// Initialize process-wide tracing/logging.
///
/// Idempotent: calling it again after a subscriber is installed is a no-op.
pub fn init() {
    tracing::init();
}

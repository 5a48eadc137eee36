//! Endpoint execution boundary.
//!
//! An endpoint is a use-case executor: it receives one normalized request
//! map (parsed body merged with route and query parameters) and returns the
//! response payload or a [`DomainError`]. The dispatch layer never sees
//! business logic; endpoints never see HTTP.

use serde_json::Value;

use crate::error::DomainResult;

/// Normalized request data handed to an endpoint: string keys, JSON values.
pub type RequestMap = serde_json::Map<String, Value>;

/// A single use-case executor.
///
/// Implementations must be safe for concurrent independent invocations;
/// each request gets its own `RequestMap`.
pub trait Endpoint: Send + Sync {
    fn run(&self, request: &RequestMap) -> DomainResult<Value>;
}

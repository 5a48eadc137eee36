//! Response format negotiation.
//!
//! Formats are looked up by exact name in a registry populated at startup;
//! there is no dynamic service resolution. A miss is a client error.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;

use crate::error::ApiError;
use crate::request::ApiRequest;

pub mod json;
pub mod jsonp;

pub use json::JsonFormatter;
pub use jsonp::JsonpFormatter;

/// Default format when the client does not ask for one.
pub const DEFAULT_FORMAT: &str = "json";

/// Failure inside a formatter invocation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FormatError {
    /// The request's formatting parameters are unusable (client error).
    #[error("{0}")]
    InvalidParameters(String),

    /// The formatter failed on acceptable input (server error).
    #[error("{0}")]
    Failed(String),
}

impl From<FormatError> for ApiError {
    fn from(err: FormatError) -> Self {
        match err {
            FormatError::InvalidParameters(msg) => Self::InvalidFormatParameters(msg),
            FormatError::Failed(msg) => Self::FormattingFailed(msg),
        }
    }
}

/// Named strategy converting a response payload into wire bytes.
pub trait OutputFormatter: Send + Sync + std::fmt::Debug {
    /// Serialize `payload`. The request is available for format parameters
    /// (e.g. the jsonp callback).
    fn format(&self, payload: &Value, request: &ApiRequest) -> Result<Vec<u8>, FormatError>;

    fn mime_type(&self) -> &'static str;
}

/// Explicit name → formatter map, built once at startup.
#[derive(Default, Clone)]
pub struct FormatterRegistry {
    formatters: BTreeMap<String, Arc<dyn OutputFormatter>>,
}

impl FormatterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in `json` and `jsonp` formatters.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register("json", Arc::new(JsonFormatter));
        registry.register("jsonp", Arc::new(JsonpFormatter));
        registry
    }

    pub fn register(&mut self, name: impl Into<String>, formatter: Arc<dyn OutputFormatter>) {
        self.formatters.insert(name.into(), formatter);
    }

    /// Exact-key lookup; a miss maps to [`ApiError::UnknownFormat`].
    pub fn get(&self, name: &str) -> Result<&Arc<dyn OutputFormatter>, ApiError> {
        self.formatters
            .get(name)
            .ok_or_else(|| ApiError::UnknownFormat(name.to_string()))
    }
}

/// Format name from the `format` query parameter, lower-cased; empty or
/// absent falls back to [`DEFAULT_FORMAT`].
pub fn negotiate(request: &ApiRequest) -> String {
    match request.query_param("format") {
        Some(name) if !name.is_empty() => name.to_lowercase(),
        _ => DEFAULT_FORMAT.to_string(),
    }
}

//! Typed HTTP-facing error model.
//!
//! Every failure in the dispatch layer is a value of [`ApiError`], carrying
//! its HTTP status and any extra headers explicitly. Nothing below the
//! dispatcher raises across layers; stages return `Result` and the runner
//! short-circuits. Error bodies are produced by the [`ErrorRenderer`]
//! handed to the dispatcher at construction.

use serde_json::json;
use thiserror::Error;

use fieldpost_core::DomainError;

use crate::body::ParseFailure;
use crate::request::Method;

/// Terminal request failure, mapped one-to-one onto an HTTP response.
///
/// Message texts follow the wire format clients already depend on; change
/// them and you change the API.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// 405 with an `Allow` header listing the four supported verbs. Raised
    /// both for unknown verbs and for resolved actions the resource does
    /// not implement.
    #[error("The {method} method is not supported. Supported methods are {}", Method::allowed_list())]
    UnsupportedMethod { method: String },

    /// 400; strict body validation failure, echoing the offending raw text.
    #[error("Invalid json supplied. Error: '{}'. '{raw}'", .failure.reason())]
    InvalidBody { failure: ParseFailure, raw: String },

    /// Authorization failure translated from the resource server. Extra
    /// headers are only ever populated when `status` is 401.
    #[error("{message}")]
    Auth {
        status: u16,
        message: String,
        headers: Vec<(String, String)>,
    },

    /// 404 from endpoint execution.
    #[error("{0}")]
    NotFound(String),

    /// 403 from endpoint execution.
    #[error("{0}")]
    Forbidden(String),

    /// 400; field errors flattened into one message, in order.
    #[error("Validation Error: '{}'", .0.join(", "))]
    ValidationFailed(Vec<String>),

    /// 400; no formatter registered under the requested name.
    #[error("Unknown response format: {0}")]
    UnknownFormat(String),

    /// 400; the formatter rejected its parameters.
    #[error("Bad formatting parameters: {0}")]
    InvalidFormatParameters(String),

    /// 500; the formatter failed on valid input.
    #[error("Error while formatting response: {0}")]
    FormattingFailed(String),

    /// 500 with a deliberately generic message; the safety net for
    /// anything unmapped.
    #[error("internal server error")]
    Internal,
}

impl ApiError {
    pub fn unsupported_method(raw: impl Into<String>) -> Self {
        Self::UnsupportedMethod { method: raw.into() }
    }

    pub fn status(&self) -> u16 {
        match self {
            Self::UnsupportedMethod { .. } => 405,
            Self::InvalidBody { .. } => 400,
            Self::Auth { status, .. } => *status,
            Self::NotFound(_) => 404,
            Self::Forbidden(_) => 403,
            Self::ValidationFailed(_) => 400,
            Self::UnknownFormat(_) => 400,
            Self::InvalidFormatParameters(_) => 400,
            Self::FormattingFailed(_) => 500,
            Self::Internal => 500,
        }
    }

    /// Headers this error adds to the response: `Allow` on 405, the
    /// pass-through authenticate headers on 401, nothing otherwise.
    pub fn extra_headers(&self) -> Vec<(String, String)> {
        match self {
            Self::UnsupportedMethod { .. } => {
                vec![("Allow".to_string(), Method::allowed_list())]
            }
            Self::Auth { headers, .. } => headers.clone(),
            _ => Vec::new(),
        }
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::NotFound(msg) => Self::NotFound(msg),
            DomainError::Authorizer(msg) => Self::Forbidden(msg),
            DomainError::Validation(errors) => Self::ValidationFailed(errors),
        }
    }
}

/// Renders a failed request into a response body.
///
/// Passed to the dispatcher at construction instead of living in global
/// error-view configuration.
pub trait ErrorRenderer: Send + Sync {
    /// Returns the body bytes and their MIME type.
    fn render(&self, error: &ApiError) -> (Vec<u8>, &'static str);
}

/// Default renderer: the JSON error document clients expect.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonErrorRenderer;

impl ErrorRenderer for JsonErrorRenderer {
    fn render(&self, error: &ApiError) -> (Vec<u8>, &'static str) {
        let doc = json!({
            "errors": [
                {
                    "status": error.status(),
                    "message": error.to_string(),
                }
            ]
        });

        // Serializing a literal of strings and ints cannot fail.
        let body = serde_json::to_vec(&doc).unwrap_or_default();
        (body, "application/json")
    }
}

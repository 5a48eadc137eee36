//! Strict request-body parsing.
//!
//! Bodies are JSON and must decode to an object or an array; anything else
//! is a client error with a reason drawn from a fixed taxonomy so that
//! error texts stay stable across parser upgrades. Only POST and PUT carry
//! bodies; the resolve stage never calls this for GET/DELETE.

use serde_json::Value;
use serde_json::error::Category;

use crate::error::ApiError;

/// Fixed classification of body-parse failures.
///
/// The `reason()` strings are part of the wire format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseFailure {
    /// The decoder reported success but produced no usable value
    /// (a bare `null` body).
    NoError,
    /// Nesting exceeded the decoder's depth limit.
    DepthExceeded,
    /// Underflow or mode mismatch inside the decoder.
    StateMismatch,
    /// A raw control character appeared inside a string.
    ControlCharacter,
    /// Malformed JSON.
    Syntax,
    /// The body is not valid UTF-8.
    MalformedEncoding,
    /// Anything the decoder reports that we cannot classify.
    Unknown,
    /// Valid JSON, but a scalar: only objects and arrays are payloads.
    NotObjectOrArray,
}

impl ParseFailure {
    pub fn reason(&self) -> &'static str {
        match self {
            Self::NoError => "No errors",
            Self::DepthExceeded => "Maximum stack depth exceeded",
            Self::StateMismatch => "Underflow or the modes mismatch",
            Self::ControlCharacter => "Unexpected control character found",
            Self::Syntax => "Syntax error, malformed JSON",
            Self::MalformedEncoding => "Malformed UTF-8 characters, possibly incorrectly encoded",
            Self::Unknown => "Unknown error",
            Self::NotObjectOrArray => "JSON must be array or object",
        }
    }
}

/// Decode and validate a request body.
///
/// Returns the payload as a JSON object or array; every failure carries the
/// offending raw text for the error document.
pub fn parse(raw_body: &[u8]) -> Result<Value, ApiError> {
    let text = match std::str::from_utf8(raw_body) {
        Ok(text) => text,
        Err(_) => {
            return Err(invalid(
                ParseFailure::MalformedEncoding,
                String::from_utf8_lossy(raw_body).into_owned(),
            ));
        }
    };

    match serde_json::from_str::<Value>(text) {
        Ok(Value::Null) => Err(invalid(ParseFailure::NoError, text.to_string())),
        Ok(value @ (Value::Object(_) | Value::Array(_))) => Ok(value),
        Ok(_) => Err(invalid(ParseFailure::NotObjectOrArray, text.to_string())),
        Err(err) => Err(invalid(classify(&err), text.to_string())),
    }
}

fn invalid(failure: ParseFailure, raw: String) -> ApiError {
    ApiError::InvalidBody { failure, raw }
}

fn classify(err: &serde_json::Error) -> ParseFailure {
    match err.classify() {
        Category::Eof => ParseFailure::Syntax,
        Category::Syntax => {
            // serde_json folds everything into one category; the message is
            // the only way to tell the interesting cases apart.
            let msg = err.to_string();
            if msg.contains("recursion limit") {
                ParseFailure::DepthExceeded
            } else if msg.contains("control character") {
                ParseFailure::ControlCharacter
            } else {
                ParseFailure::Syntax
            }
        }
        Category::Data | Category::Io => ParseFailure::Unknown,
    }
}

use serde_json::Value;

use crate::format::{FormatError, OutputFormatter};
use crate::request::ApiRequest;

/// JSONP output: the payload wrapped in a caller-supplied callback.
///
/// The callback name comes from the `callback` query parameter and is
/// restricted to a safe identifier charset; anything else is a parameter
/// error, not something to echo into executable output.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonpFormatter;

fn valid_callback(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '$' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$' || c == '.')
}

impl OutputFormatter for JsonpFormatter {
    fn format(&self, payload: &Value, request: &ApiRequest) -> Result<Vec<u8>, FormatError> {
        let callback = request
            .query_param("callback")
            .filter(|c| !c.is_empty())
            .ok_or_else(|| FormatError::InvalidParameters("missing callback parameter".to_string()))?;

        if !valid_callback(callback) {
            return Err(FormatError::InvalidParameters(format!(
                "invalid callback name: {callback}"
            )));
        }

        let json = serde_json::to_string(payload).map_err(|e| FormatError::Failed(e.to_string()))?;
        Ok(format!("/**/{callback}({json});").into_bytes())
    }

    fn mime_type(&self) -> &'static str {
        "application/javascript"
    }
}

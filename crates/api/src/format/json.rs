use serde_json::Value;

use crate::format::{FormatError, OutputFormatter};
use crate::request::ApiRequest;

/// Plain JSON output.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonFormatter;

impl OutputFormatter for JsonFormatter {
    fn format(&self, payload: &Value, _request: &ApiRequest) -> Result<Vec<u8>, FormatError> {
        serde_json::to_vec(payload).map_err(|e| FormatError::Failed(e.to_string()))
    }

    fn mime_type(&self) -> &'static str {
        "application/json"
    }
}

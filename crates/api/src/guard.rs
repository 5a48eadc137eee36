//! Scoped access guard.
//!
//! Runs after action resolution and before endpoint execution. Token
//! validity and scope membership are delegated to the resource server; this
//! module only extracts the bearer credential and translates structured
//! failures into an HTTP status plus headers.

use fieldpost_auth::{OAuthError, ResourceServer, Scope};

use crate::error::ApiError;
use crate::request::{ApiRequest, Method};

/// Check that `request` may run an action guarded by `scope`.
///
/// A bearer credential is required for every verb except GET. Success is
/// silent; failure carries the status the server asked for (default 400)
/// and, only on 401, its extra headers.
pub fn check(
    request: &ApiRequest,
    method: Method,
    scope: &Scope,
    server: &dyn ResourceServer,
) -> Result<(), ApiError> {
    let token = bearer_token(request);
    let require_header = method != Method::Get;

    server
        .is_valid(token, require_header)
        .and_then(|()| server.has_scope(token, scope.as_str(), true))
        .map_err(translate)
}

/// Bearer credential from the `Authorization` header, if present and
/// non-empty.
fn bearer_token(request: &ApiRequest) -> Option<&str> {
    let token = request
        .header("authorization")?
        .strip_prefix("Bearer ")?
        .trim();

    if token.is_empty() { None } else { Some(token) }
}

/// Translate a structured server failure into an [`ApiError`].
///
/// The server returns raw header lines; a `HTTP/1.1 <code>` line sets the
/// status (default 400) and every other line splits on the first `": "`
/// into a header. Headers are passed through only for 401 responses
/// (`WWW-Authenticate` and friends); every other status drops them.
fn translate(err: OAuthError) -> ApiError {
    let mut status = 400;
    let mut headers = Vec::new();

    for line in &err.headers {
        if let Some(code) = parse_status_line(line) {
            status = code;
        } else if let Some((name, value)) = line.split_once(": ") {
            headers.push((name.to_string(), value.to_string()));
        }
    }

    if status != 401 {
        headers.clear();
    }

    ApiError::Auth {
        status,
        message: err.message,
        headers,
    }
}

/// Status code from a `HTTP/1.1 <3 digits> ...` line.
fn parse_status_line(line: &str) -> Option<u16> {
    let rest = line.strip_prefix("HTTP/1.1 ")?;
    let code = rest.get(..3)?;
    if !code.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    code.parse().ok()
}

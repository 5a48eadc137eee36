//! Transport-agnostic request model.
//!
//! The dispatch layer never touches framework request types directly; the
//! adapter in `app/` converts into this shape once, and everything after
//! that is pure.

use std::collections::BTreeMap;
use std::fmt;

/// Header that overrides the transport-reported verb, checked before any
/// other request logic.
pub const METHOD_OVERRIDE_HEADER: &str = "x-http-method-override";

/// Sentinel value of the `action` route segment meaning "no custom action".
pub const NONE_ACTION: &str = "none";

/// The four verbs the dispatch layer recognizes.
///
/// Transport verbs stay as raw strings on [`ApiRequest`] so that an unknown
/// verb (PATCH, or a bogus override) reaches the resolver and fails there
/// with 405 semantics instead of being dropped at the edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Post,
    Get,
    Put,
    Delete,
}

impl Method {
    /// Supported verbs, in the order they are advertised in `Allow` headers.
    pub const ALL: [Method; 4] = [Method::Post, Method::Get, Method::Put, Method::Delete];

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "POST" => Some(Self::Post),
            "GET" => Some(Self::Get),
            "PUT" => Some(Self::Put),
            "DELETE" => Some(Self::Delete),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Post => "POST",
            Self::Get => "GET",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
        }
    }

    /// Base action name for the verb table: POST creates, PUT updates.
    pub fn base_action(&self) -> &'static str {
        match self {
            Self::Post => "post",
            Self::Get => "get",
            Self::Put => "put",
            Self::Delete => "delete",
        }
    }

    /// Verbs that carry body content and therefore trigger body parsing.
    pub fn carries_body(&self) -> bool {
        matches!(self, Self::Post | Self::Put)
    }

    /// Verbs whose responses may be cached (GET only).
    pub fn cacheable(&self) -> bool {
        matches!(self, Self::Get)
    }

    /// Comma-separated supported-verb list, as sent in `Allow` headers and
    /// 405 messages.
    pub fn allowed_list() -> String {
        Self::ALL
            .iter()
            .map(|m| m.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One incoming request, immutable once built.
///
/// Header names are stored lower-cased; the transport verb is kept
/// upper-cased raw so the resolver owns verb validation.
#[derive(Debug, Clone, Default)]
pub struct ApiRequest {
    method: String,
    route_params: BTreeMap<String, String>,
    query_params: BTreeMap<String, String>,
    headers: BTreeMap<String, String>,
    raw_body: Vec<u8>,
}

impl ApiRequest {
    pub fn new(method: impl Into<String>) -> Self {
        Self {
            method: method.into().to_uppercase(),
            ..Self::default()
        }
    }

    pub fn with_route_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.route_params.insert(name.into(), value.into());
        self
    }

    pub fn with_query_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query_params.insert(name.into(), value.into());
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into().to_lowercase(), value.into());
        self
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.raw_body = body.into();
        self
    }

    /// Transport-reported verb, before any override.
    pub fn transport_method(&self) -> &str {
        &self.method
    }

    /// Verb after applying the override header. This is the verb every
    /// downstream decision (action mapping, body parsing, cacheability,
    /// bearer requirement) is derived from.
    pub fn effective_method(&self) -> &str {
        match self.header(METHOD_OVERRIDE_HEADER) {
            Some(raw) => raw,
            None => &self.method,
        }
    }

    pub fn route_param(&self, name: &str) -> Option<&str> {
        self.route_params.get(name).map(String::as_str)
    }

    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query_params.get(name).map(String::as_str)
    }

    pub fn query_params(&self) -> &BTreeMap<String, String> {
        &self.query_params
    }

    pub fn route_params(&self) -> &BTreeMap<String, String> {
        &self.route_params
    }

    /// Header value by lower-cased name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }

    pub fn raw_body(&self) -> &[u8] {
        &self.raw_body
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn method_table_covers_all_verbs() {
        for m in Method::ALL {
            assert_eq!(Method::parse(m.as_str()), Some(m));
        }
        assert_eq!(Method::parse("PATCH"), None);
    }

    #[test]
    fn allowed_list_is_stable() {
        assert_eq!(Method::allowed_list(), "POST, GET, PUT, DELETE");
    }

    #[test]
    fn effective_method_prefers_override_header() {
        let req = ApiRequest::new("get").with_header("X-HTTP-Method-Override", "DELETE");
        assert_eq!(req.transport_method(), "GET");
        assert_eq!(req.effective_method(), "DELETE");
    }

    #[test]
    fn headers_are_case_insensitive_by_name() {
        let req = ApiRequest::new("GET").with_header("Authorization", "Bearer x");
        assert_eq!(req.header("authorization"), Some("Bearer x"));
    }

    #[test]
    fn only_post_and_put_carry_body() {
        assert!(Method::Post.carries_body());
        assert!(Method::Put.carries_body());
        assert!(!Method::Get.carries_body());
        assert!(!Method::Delete.carries_body());
    }

    #[test]
    fn only_get_is_cacheable() {
        assert!(Method::Get.cacheable());
        for m in [Method::Post, Method::Put, Method::Delete] {
            assert!(!m.cacheable());
        }
    }
}

//! Request lifecycle pipeline.
//!
//! One dispatch walks an ordered list of stages: resolve-action,
//! check-access, run-endpoint, format-response. Each stage sees the shared
//! [`DispatchContext`]; the first failure short-circuits to the error
//! renderer. Stage order is a contract: access is only checked for a
//! resolved action, and the endpoint only runs for an authorized one.

use std::sync::Arc;

use serde_json::Value;

use fieldpost_auth::ResourceServer;

use crate::action::{self, ResolvedAction};
use crate::body;
use crate::error::{ApiError, ErrorRenderer};
use crate::format::{FormatterRegistry, negotiate};
use crate::request::{ApiRequest, Method};
use crate::resources::Resource;

/// `Cache-Control` value attached to responses of non-cacheable verbs.
pub const NO_CACHE: &str = "no-cache, no-store, max-age=0, must-revalidate";

/// Finished response, ready for the transport to write out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseEnvelope {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl ResponseEnvelope {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Mutable per-request state threaded through the stages.
pub struct DispatchContext<'a> {
    pub request: &'a ApiRequest,
    pub resource: &'a dyn Resource,
    /// Set by the resolve stage; later stages may rely on it.
    pub action: Option<ResolvedAction>,
    /// Parsed body, set by the resolve stage for verbs that carry one.
    pub payload: Option<Value>,
    /// Endpoint result, set by the run stage.
    pub response_payload: Option<Value>,
    /// Formatter output, set by the format stage.
    pub formatted: Option<Formatted>,
}

/// Output of the format stage.
pub struct Formatted {
    pub body: Vec<u8>,
    pub mime: &'static str,
    /// True when the negotiated format was jsonp, which needs the nosniff
    /// header to stop content-type sniffing execution.
    pub nosniff: bool,
}

impl<'a> DispatchContext<'a> {
    fn new(request: &'a ApiRequest, resource: &'a dyn Resource) -> Self {
        Self {
            request,
            resource,
            action: None,
            payload: None,
            response_payload: None,
            formatted: None,
        }
    }

    /// Effective verb for header decisions. Falls back to parsing the raw
    /// verb when resolution never ran (early failure).
    fn effective_method(&self) -> Option<Method> {
        match &self.action {
            Some(action) => Some(action.method),
            None => Method::parse(self.request.effective_method()),
        }
    }
}

/// One lifecycle stage.
pub trait Stage: Send + Sync {
    fn name(&self) -> &'static str;
    fn run(&self, cx: &mut DispatchContext<'_>) -> Result<(), ApiError>;
}

/// Resolve the action name and, for body-carrying verbs, parse the body.
struct ResolveAction;

impl Stage for ResolveAction {
    fn name(&self) -> &'static str {
        "resolve-action"
    }

    fn run(&self, cx: &mut DispatchContext<'_>) -> Result<(), ApiError> {
        let action = action::resolve(cx.request, cx.resource)?;

        if action.method.carries_body() {
            cx.payload = Some(body::parse(cx.request.raw_body())?);
        }

        tracing::debug!(action = %action.name, "action resolved");
        cx.action = Some(action);
        Ok(())
    }
}

/// Check token validity and scope before anything runs.
struct CheckAccess {
    server: Arc<dyn ResourceServer>,
}

impl Stage for CheckAccess {
    fn name(&self) -> &'static str {
        "check-access"
    }

    fn run(&self, cx: &mut DispatchContext<'_>) -> Result<(), ApiError> {
        let action = cx.action.as_ref().ok_or(ApiError::Internal)?;
        let scope = cx.resource.scope();
        crate::guard::check(cx.request, action.method, &scope, self.server.as_ref())
    }
}

/// Invoke the endpoint with payload + route/query params merged into one
/// request map.
struct RunEndpoint;

impl Stage for RunEndpoint {
    fn name(&self) -> &'static str {
        "run-endpoint"
    }

    fn run(&self, cx: &mut DispatchContext<'_>) -> Result<(), ApiError> {
        let action = cx.action.as_ref().ok_or(ApiError::Internal)?;
        // Resolution already checked existence; a miss here is a bug.
        let endpoint = cx.resource.endpoint(&action.name).ok_or(ApiError::Internal)?;

        let mut map = fieldpost_core::RequestMap::new();
        match cx.payload.take() {
            Some(Value::Object(fields)) => map.extend(fields),
            // An array payload has no keys of its own; keep it addressable.
            Some(array @ Value::Array(_)) => {
                map.insert("data".to_string(), array);
            }
            _ => {}
        }
        for (name, value) in cx.request.query_params() {
            map.insert(name.clone(), Value::String(value.clone()));
        }
        for (name, value) in cx.request.route_params() {
            map.insert(name.clone(), Value::String(value.clone()));
        }

        cx.response_payload = Some(endpoint.run(&map).map_err(ApiError::from)?);
        Ok(())
    }
}

/// Serialize the response payload in the negotiated format.
struct FormatResponse {
    registry: Arc<FormatterRegistry>,
}

impl Stage for FormatResponse {
    fn name(&self) -> &'static str {
        "format-response"
    }

    fn run(&self, cx: &mut DispatchContext<'_>) -> Result<(), ApiError> {
        let name = negotiate(cx.request);
        let formatter = self.registry.get(&name)?;

        let payload = cx.response_payload.take().unwrap_or(Value::Null);
        let body = formatter.format(&payload, cx.request).map_err(ApiError::from)?;

        cx.formatted = Some(Formatted {
            body,
            mime: formatter.mime_type(),
            nosniff: name == "jsonp",
        });
        Ok(())
    }
}

/// The pipeline runner: owns the stage list, the collaborators and the
/// error renderer, and turns one request into one response envelope.
pub struct RestDispatcher {
    stages: Vec<Box<dyn Stage>>,
    error_renderer: Arc<dyn ErrorRenderer>,
}

impl RestDispatcher {
    pub fn new(
        server: Arc<dyn ResourceServer>,
        registry: Arc<FormatterRegistry>,
        error_renderer: Arc<dyn ErrorRenderer>,
    ) -> Self {
        Self {
            stages: vec![
                Box::new(ResolveAction),
                Box::new(CheckAccess { server }),
                Box::new(RunEndpoint),
                Box::new(FormatResponse { registry }),
            ],
            error_renderer,
        }
    }

    /// Run the full lifecycle for one request. Always produces a response;
    /// failures render through the error path.
    pub fn dispatch(&self, resource: &dyn Resource, request: &ApiRequest) -> ResponseEnvelope {
        let mut cx = DispatchContext::new(request, resource);

        for stage in &self.stages {
            if let Err(err) = stage.run(&mut cx) {
                let status = err.status();
                if status >= 500 {
                    tracing::warn!(stage = stage.name(), status, error = %err, "request failed");
                } else {
                    tracing::debug!(stage = stage.name(), status, error = %err, "request rejected");
                }
                return self.error_envelope(cx.effective_method(), &err);
            }
        }

        let Some(formatted) = cx.formatted.take() else {
            // The format stage always sets it; reaching here is a bug.
            return self.error_envelope(cx.effective_method(), &ApiError::Internal);
        };

        let mut headers = vec![("Content-Type".to_string(), formatted.mime.to_string())];
        if formatted.nosniff {
            headers.push(("X-Content-Type-Options".to_string(), "nosniff".to_string()));
        }
        append_cache_control(&mut headers, cx.effective_method());

        ResponseEnvelope {
            status: 200,
            headers,
            body: formatted.body,
        }
    }

    /// Render an error outside the pipeline (e.g. unknown resource at the
    /// routing edge). `method` drives cacheability headers.
    pub fn render_error(&self, method: Option<Method>, err: &ApiError) -> ResponseEnvelope {
        self.error_envelope(method, err)
    }

    fn error_envelope(&self, method: Option<Method>, err: &ApiError) -> ResponseEnvelope {
        let (body, mime) = self.error_renderer.render(err);

        let mut headers = vec![("Content-Type".to_string(), mime.to_string())];
        headers.extend(err.extra_headers());
        append_cache_control(&mut headers, method);

        ResponseEnvelope {
            status: err.status(),
            headers,
            body,
        }
    }
}

/// Every verb outside the cacheable set gets the no-cache header; an
/// unparseable verb is conservatively treated as non-cacheable.
fn append_cache_control(headers: &mut Vec<(String, String)>, method: Option<Method>) {
    let cacheable = method.map(|m| m.cacheable()).unwrap_or(false);
    if !cacheable {
        headers.push(("Cache-Control".to_string(), NO_CACHE.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicUsize, Ordering};

    use serde_json::json;

    use fieldpost_auth::{OAuthError, Scope, StaticTokenServer};
    use fieldpost_core::{DomainError, Endpoint, RequestMap};

    use crate::error::JsonErrorRenderer;

    /// Endpoint scripted per action name, counting executions.
    struct ScriptedEndpoint {
        result: fn(&RequestMap) -> Result<Value, DomainError>,
        runs: AtomicUsize,
    }

    impl Endpoint for ScriptedEndpoint {
        fn run(&self, request: &RequestMap) -> Result<Value, DomainError> {
            self.runs.fetch_add(1, Ordering::SeqCst);
            (self.result)(request)
        }
    }

    struct TestResource {
        get_collection: ScriptedEndpoint,
        post_collection: ScriptedEndpoint,
        get: ScriptedEndpoint,
        put: ScriptedEndpoint,
        delete: ScriptedEndpoint,
    }

    impl TestResource {
        fn new() -> Self {
            Self {
                get_collection: scripted(|_| Ok(json!({"ok": true}))),
                post_collection: scripted(|map| Ok(Value::Object(map.clone()))),
                get: scripted(|_| Err(DomainError::not_found("post 9 not found"))),
                put: scripted(|_| Err(DomainError::forbidden("not yours"))),
                delete: scripted(|_| {
                    Err(DomainError::validation(["required", "too_short"]))
                }),
            }
        }

        fn runs(&self) -> usize {
            [
                &self.get_collection,
                &self.post_collection,
                &self.get,
                &self.put,
                &self.delete,
            ]
            .iter()
            .map(|e| e.runs.load(Ordering::SeqCst))
            .sum()
        }
    }

    fn scripted(result: fn(&RequestMap) -> Result<Value, DomainError>) -> ScriptedEndpoint {
        ScriptedEndpoint {
            result,
            runs: AtomicUsize::new(0),
        }
    }

    impl Resource for TestResource {
        fn name(&self) -> &str {
            "posts"
        }

        fn scope(&self) -> Scope {
            Scope::new("posts")
        }

        fn endpoint(&self, action: &str) -> Option<&dyn Endpoint> {
            match action {
                "get_collection" => Some(&self.get_collection),
                "post_collection" => Some(&self.post_collection),
                "get" => Some(&self.get),
                "put" => Some(&self.put),
                "delete" => Some(&self.delete),
                _ => None,
            }
        }
    }

    fn server() -> Arc<StaticTokenServer> {
        Arc::new(
            StaticTokenServer::new()
                .grant("secret", ["posts"])
                .allow_anonymous("posts"),
        )
    }

    fn dispatcher_with(server: Arc<dyn ResourceServer>) -> RestDispatcher {
        RestDispatcher::new(
            server,
            Arc::new(FormatterRegistry::with_defaults()),
            Arc::new(JsonErrorRenderer),
        )
    }

    fn dispatcher() -> RestDispatcher {
        dispatcher_with(server())
    }

    fn error_message(envelope: &ResponseEnvelope) -> String {
        let doc: Value = serde_json::from_slice(&envelope.body).unwrap();
        doc["errors"][0]["message"].as_str().unwrap().to_string()
    }

    fn authed(method: &str) -> ApiRequest {
        ApiRequest::new(method).with_header("Authorization", "Bearer secret")
    }

    #[test]
    fn get_collection_success() {
        let envelope = dispatcher().dispatch(&TestResource::new(), &ApiRequest::new("GET"));

        assert_eq!(envelope.status, 200);
        assert_eq!(envelope.header("Content-Type"), Some("application/json"));
        assert_eq!(envelope.header("Cache-Control"), None);
        assert_eq!(envelope.header("X-Content-Type-Options"), None);

        let doc: Value = serde_json::from_slice(&envelope.body).unwrap();
        assert_eq!(doc, json!({"ok": true}));
    }

    #[test]
    fn post_merges_payload_and_params_and_is_not_cacheable() {
        let request = authed("POST")
            .with_body(br#"{"title": "hello"}"#.to_vec())
            .with_query_param("q", "x");
        let envelope = dispatcher().dispatch(&TestResource::new(), &request);

        assert_eq!(envelope.status, 200);
        assert_eq!(envelope.header("Cache-Control"), Some(NO_CACHE));

        let doc: Value = serde_json::from_slice(&envelope.body).unwrap();
        assert_eq!(doc["title"], "hello");
        assert_eq!(doc["q"], "x");
    }

    #[test]
    fn request_params_win_over_payload_keys() {
        let resource = TestResource::new();
        let request = authed("POST").with_body(br#"{"q": "from-body"}"#.to_vec()).with_query_param("q", "from-query");
        let envelope = dispatcher().dispatch(&resource, &request);

        let doc: Value = serde_json::from_slice(&envelope.body).unwrap();
        assert_eq!(doc["q"], "from-query");
    }

    #[test]
    fn array_payload_lands_under_data() {
        let request = authed("POST").with_body(b"[1,2]".to_vec());
        let envelope = dispatcher().dispatch(&TestResource::new(), &request);

        let doc: Value = serde_json::from_slice(&envelope.body).unwrap();
        assert_eq!(doc["data"], json!([1, 2]));
    }

    #[test]
    fn invalid_body_fails_before_access_check() {
        // The server would reject this request, but body validation runs in
        // the resolve stage, ahead of the access check.
        let rejecting = Arc::new(StaticTokenServer::new());
        let resource = TestResource::new();
        let request = ApiRequest::new("POST").with_body(b"not json".to_vec());
        let envelope = dispatcher_with(rejecting).dispatch(&resource, &request);

        assert_eq!(envelope.status, 400);
        assert!(error_message(&envelope).contains("Syntax error, malformed JSON"));
        assert_eq!(resource.runs(), 0);
    }

    #[test]
    fn missing_bearer_on_post_never_reaches_endpoint() {
        let resource = TestResource::new();
        let request = ApiRequest::new("POST").with_body(b"{}".to_vec());
        let envelope = dispatcher().dispatch(&resource, &request);

        assert_eq!(envelope.status, 401);
        assert_eq!(
            envelope.header("WWW-Authenticate"),
            Some("Bearer realm=\"fieldpost\"")
        );
        assert_eq!(resource.runs(), 0);
    }

    #[test]
    fn anonymous_get_is_allowed() {
        let envelope = dispatcher().dispatch(&TestResource::new(), &ApiRequest::new("GET"));
        assert_eq!(envelope.status, 200);
    }

    #[test]
    fn get_with_body_never_parses_it() {
        // GET is not in the body-carrying set; even an unparsable body
        // must be ignored rather than rejected.
        let resource = TestResource::new();
        let request = ApiRequest::new("GET").with_body(b"not json".to_vec());
        let envelope = dispatcher().dispatch(&resource, &request);

        assert_eq!(envelope.status, 200);
        assert_eq!(resource.runs(), 1);
    }

    #[test]
    fn scope_failure_is_403_without_authenticate_header() {
        let server = Arc::new(StaticTokenServer::new().grant("secret", ["media"]));
        let resource = TestResource::new();
        let request = authed("POST").with_body(b"{}".to_vec());
        let envelope = dispatcher_with(server).dispatch(&resource, &request);

        assert_eq!(envelope.status, 403);
        assert_eq!(envelope.header("WWW-Authenticate"), None);
        assert_eq!(resource.runs(), 0);
    }

    #[test]
    fn not_found_maps_to_404() {
        let request = ApiRequest::new("GET").with_route_param("id", "9");
        let envelope = dispatcher().dispatch(&TestResource::new(), &request);

        assert_eq!(envelope.status, 404);
        assert_eq!(error_message(&envelope), "post 9 not found");
    }

    #[test]
    fn forbidden_maps_to_403() {
        let request = authed("PUT")
            .with_route_param("id", "9")
            .with_body(b"{}".to_vec());
        let envelope = dispatcher().dispatch(&TestResource::new(), &request);
        assert_eq!(envelope.status, 403);
    }

    #[test]
    fn validation_maps_to_400_with_joined_message() {
        let request = authed("DELETE").with_route_param("id", "9");
        let envelope = dispatcher().dispatch(&TestResource::new(), &request);

        assert_eq!(envelope.status, 400);
        assert_eq!(
            error_message(&envelope),
            "Validation Error: 'required, too_short'"
        );
    }

    #[test]
    fn unsupported_verb_gets_allow_header() {
        let envelope = dispatcher().dispatch(&TestResource::new(), &ApiRequest::new("PATCH"));

        assert_eq!(envelope.status, 405);
        assert_eq!(envelope.header("Allow"), Some("POST, GET, PUT, DELETE"));
        // PATCH is not in the cacheable set either.
        assert_eq!(envelope.header("Cache-Control"), Some(NO_CACHE));
    }

    #[test]
    fn missing_handler_gets_allow_header() {
        // TestResource has no put_collection.
        let request = authed("PUT").with_body(b"{}".to_vec());
        let envelope = dispatcher().dispatch(&TestResource::new(), &request);

        assert_eq!(envelope.status, 405);
        assert_eq!(envelope.header("Allow"), Some("POST, GET, PUT, DELETE"));
    }

    #[test]
    fn override_header_drives_cacheability() {
        let request = ApiRequest::new("GET")
            .with_route_param("id", "9")
            .with_header("x-http-method-override", "DELETE")
            .with_header("Authorization", "Bearer secret");
        let envelope = dispatcher().dispatch(&TestResource::new(), &request);

        // Resolved as DELETE: endpoint error path, but still no-cache.
        assert_eq!(envelope.header("Cache-Control"), Some(NO_CACHE));
    }

    #[test]
    fn jsonp_sets_nosniff_and_json_does_not() {
        let request = ApiRequest::new("GET")
            .with_query_param("format", "jsonp")
            .with_query_param("callback", "cb");
        let envelope = dispatcher().dispatch(&TestResource::new(), &request);

        assert_eq!(envelope.status, 200);
        assert_eq!(envelope.header("X-Content-Type-Options"), Some("nosniff"));
        assert_eq!(envelope.header("Content-Type"), Some("application/javascript"));
        assert!(envelope.body.starts_with(b"/**/cb("));
    }

    #[test]
    fn unknown_format_is_400() {
        let request = ApiRequest::new("GET").with_query_param("format", "xml-legacy");
        let envelope = dispatcher().dispatch(&TestResource::new(), &request);

        assert_eq!(envelope.status, 400);
        assert_eq!(error_message(&envelope), "Unknown response format: xml-legacy");
    }

    #[test]
    fn jsonp_without_callback_is_400() {
        let request = ApiRequest::new("GET").with_query_param("format", "jsonp");
        let envelope = dispatcher().dispatch(&TestResource::new(), &request);
        assert_eq!(envelope.status, 400);
        assert!(error_message(&envelope).contains("Bad formatting parameters"));
    }

    #[test]
    fn guard_auth_default_status_400() {
        struct Weird;
        impl ResourceServer for Weird {
            fn is_valid(&self, _t: Option<&str>, _r: bool) -> Result<(), OAuthError> {
                Err(OAuthError::new("odd", "no status line", ["X-Odd: 1"]))
            }
            fn has_scope(&self, _t: Option<&str>, _s: &str, _strict: bool) -> Result<(), OAuthError> {
                Ok(())
            }
        }

        let resource = TestResource::new();
        let request = ApiRequest::new("POST").with_body(b"{}".to_vec());
        let envelope = dispatcher_with(Arc::new(Weird)).dispatch(&resource, &request);

        assert_eq!(envelope.status, 400);
        assert_eq!(envelope.header("X-Odd"), None);
    }
}

//! HTTP wiring (axum adapter).
//!
//! The adapter does exactly two conversions: axum request → [`ApiRequest`]
//! and [`ResponseEnvelope`] → axum response. Everything in between is the
//! transport-agnostic dispatcher, so tests can drive the pipeline without a
//! socket and the black-box suite can drive the real router.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    Router,
    body::{Body, Bytes},
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{any, get},
};
use serde_json::json;

use fieldpost_auth::ResourceServer;

use crate::dispatch::{ResponseEnvelope, RestDispatcher};
use crate::error::{ApiError, JsonErrorRenderer};
use crate::format::FormatterRegistry;
use crate::request::{ApiRequest, Method};
use crate::resources::{PostsResource, ResourceRegistry};

#[derive(Clone)]
pub struct AppState {
    dispatcher: Arc<RestDispatcher>,
    resources: Arc<ResourceRegistry>,
}

/// Build the full HTTP router (public entrypoint used by `main.rs` and the
/// black-box tests). The resource server is the only injected collaborator;
/// formatters and resources are wired here at startup.
pub fn build_app(server: Arc<dyn ResourceServer>) -> Router {
    let mut resources = ResourceRegistry::new();
    resources.register(Arc::new(PostsResource::new()));

    let dispatcher = RestDispatcher::new(
        server,
        Arc::new(FormatterRegistry::with_defaults()),
        Arc::new(JsonErrorRenderer),
    );

    let state = AppState {
        dispatcher: Arc::new(dispatcher),
        resources: Arc::new(resources),
    };

    Router::new()
        .route("/health", get(health))
        .route("/api/v2/:resource", any(collection_handler))
        .route("/api/v2/:resource/:id", any(item_handler))
        .route("/api/v2/:resource/:id/:action", any(item_action_handler))
        .layer(tower::ServiceBuilder::new())
        .with_state(state)
}

async fn health() -> impl IntoResponse {
    axum::Json(json!({"status": "ok"}))
}

async fn collection_handler(
    State(state): State<AppState>,
    Path(resource): Path<String>,
    Query(query): Query<BTreeMap<String, String>>,
    method: axum::http::Method,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    serve(state, resource, Vec::new(), query, method, headers, body)
}

async fn item_handler(
    State(state): State<AppState>,
    Path((resource, id)): Path<(String, String)>,
    Query(query): Query<BTreeMap<String, String>>,
    method: axum::http::Method,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let route = vec![("id".to_string(), id)];
    serve(state, resource, route, query, method, headers, body)
}

async fn item_action_handler(
    State(state): State<AppState>,
    Path((resource, id, action)): Path<(String, String, String)>,
    Query(query): Query<BTreeMap<String, String>>,
    method: axum::http::Method,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let route = vec![("id".to_string(), id), ("action".to_string(), action)];
    serve(state, resource, route, query, method, headers, body)
}

fn serve(
    state: AppState,
    resource: String,
    route_params: Vec<(String, String)>,
    query: BTreeMap<String, String>,
    method: axum::http::Method,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let mut request = ApiRequest::new(method.as_str()).with_body(body.to_vec());
    for (name, value) in route_params {
        request = request.with_route_param(name, value);
    }
    for (name, value) in query {
        request = request.with_query_param(name, value);
    }
    for (name, value) in headers.iter() {
        request = request.with_header(
            name.as_str(),
            String::from_utf8_lossy(value.as_bytes()).into_owned(),
        );
    }

    let envelope = match state.resources.get(&resource) {
        Some(target) => state.dispatcher.dispatch(target.as_ref(), &request),
        None => state.dispatcher.render_error(
            Method::parse(request.effective_method()),
            &ApiError::NotFound(format!("resource '{resource}' not found")),
        ),
    };

    into_response(envelope)
}

fn into_response(envelope: ResponseEnvelope) -> Response {
    let mut builder = axum::http::Response::builder().status(envelope.status);
    for (name, value) in &envelope.headers {
        builder = builder.header(name, value);
    }

    match builder.body(Body::from(envelope.body)) {
        Ok(response) => response,
        Err(err) => {
            tracing::warn!(error = %err, "failed to build response");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

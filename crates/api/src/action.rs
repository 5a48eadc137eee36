//! Action resolution: HTTP verb + route shape → named application action.
//!
//! Resolution is a pure function of the request and the target resource, so
//! resolving the same request twice always yields the same action.

use crate::error::ApiError;
use crate::request::{ApiRequest, Method, NONE_ACTION};
use crate::resources::Resource;

/// The action a request resolved to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedAction {
    /// Effective verb, after the override header.
    pub method: Method,
    /// Composed action name, e.g. `get_collection` or `put_tags`.
    pub name: String,
}

/// Derive the action name for `request` against `resource`.
///
/// Ordering matters and is part of the contract:
/// 1. the override header replaces the transport verb;
/// 2. unknown verbs fail with 405 + `Allow`;
/// 3. a non-sentinel custom `action` segment appends `_<segment>`;
/// 4. absence of both `id` and `locale` appends `_collection`;
/// 5. a resource without a handler for the composed name fails with the
///    same 405 error kind as step 2.
pub fn resolve(request: &ApiRequest, resource: &dyn Resource) -> Result<ResolvedAction, ApiError> {
    let raw = request.effective_method();
    let method = Method::parse(raw).ok_or_else(|| ApiError::unsupported_method(raw))?;

    let mut name = method.base_action().to_string();

    if let Some(segment) = request.route_param("action") {
        if segment != NONE_ACTION {
            name.push('_');
            name.push_str(segment);
        }
    }

    // No single resource addressed: this is a collection action.
    if request.route_param("id").is_none() && request.route_param("locale").is_none() {
        name.push_str("_collection");
    }

    if resource.endpoint(&name).is_none() {
        // TODO: narrow the Allow list to the actions this resource implements
        return Err(ApiError::unsupported_method(raw));
    }

    Ok(ResolvedAction { method, name })
}

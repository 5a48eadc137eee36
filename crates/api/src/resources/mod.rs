//! Resource trait and registry.
//!
//! A resource is one addressable collection in the API (`/api/v2/posts`).
//! It declares the scope required to touch it and exposes one endpoint per
//! resolved action name. The registry is built once at startup and shared
//! read-only across requests.

use std::collections::BTreeMap;
use std::sync::Arc;

use fieldpost_auth::Scope;
use fieldpost_core::Endpoint;

pub mod posts;

pub use posts::PostsResource;

/// One addressable API resource.
pub trait Resource: Send + Sync {
    /// Resource name as it appears in URLs.
    fn name(&self) -> &str;

    /// Scope required for every action on this resource.
    fn scope(&self) -> Scope;

    /// Handler for a resolved action name (`get`, `post_collection`, ...),
    /// or `None` when the resource does not implement it.
    fn endpoint(&self, action: &str) -> Option<&dyn Endpoint>;
}

/// Startup-populated map of resource name → resource.
#[derive(Default)]
pub struct ResourceRegistry {
    resources: BTreeMap<String, Arc<dyn Resource>>,
}

impl ResourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, resource: Arc<dyn Resource>) {
        self.resources.insert(resource.name().to_string(), resource);
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Resource>> {
        self.resources.get(name)
    }
}

//! Demo `posts` resource backed by an in-memory store.
//!
//! The store is a thin data-access wrapper, deliberately boring: its job is
//! to give the dispatch layer a complete resource to exercise. PUT and
//! DELETE are item-only on purpose, so collection requests with those verbs
//! hit the real 405 path.

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use serde_json::{Map, Value, json};

use fieldpost_auth::Scope;
use fieldpost_core::{DomainError, DomainResult, Endpoint, RequestMap};

use crate::url::api_url;

#[derive(Debug, Default)]
struct StoreInner {
    next_id: u64,
    posts: BTreeMap<u64, Map<String, Value>>,
}

/// Shared handle to the post table.
#[derive(Debug, Clone, Default)]
struct PostStore(Arc<RwLock<StoreInner>>);

impl PostStore {
    fn insert(&self, mut fields: Map<String, Value>) -> Value {
        let mut inner = self.0.write().unwrap();
        inner.next_id += 1;
        let id = inner.next_id;

        fields.insert("id".to_string(), json!(id));
        fields.insert(
            "url".to_string(),
            json!(api_url("posts", Some(&id.to_string()))),
        );
        inner.posts.insert(id, fields.clone());
        Value::Object(fields)
    }

    fn get(&self, id: u64) -> Option<Value> {
        self.0.read().unwrap().posts.get(&id).cloned().map(Value::Object)
    }

    fn update(&self, id: u64, fields: Map<String, Value>) -> Option<Value> {
        let mut inner = self.0.write().unwrap();
        let post = inner.posts.get_mut(&id)?;
        for (name, value) in fields {
            // Identity fields are server-owned.
            if name != "id" && name != "url" {
                post.insert(name, value);
            }
        }
        Some(Value::Object(post.clone()))
    }

    fn remove(&self, id: u64) -> Option<Value> {
        self.0.write().unwrap().posts.remove(&id).map(Value::Object)
    }

    fn list(&self) -> Value {
        let inner = self.0.read().unwrap();
        let results: Vec<Value> = inner.posts.values().cloned().map(Value::Object).collect();
        json!({
            "count": results.len(),
            "results": results,
        })
    }
}

fn post_id(request: &RequestMap) -> DomainResult<u64> {
    let raw = request.get("id").and_then(Value::as_str).unwrap_or_default();
    raw.parse()
        .map_err(|_| DomainError::not_found(format!("post {raw} not found")))
}

/// Validate writable post fields, collecting per-field errors in order.
fn validate_fields(request: &RequestMap) -> DomainResult<Map<String, Value>> {
    let mut errors: Vec<(String, Vec<String>)> = Vec::new();

    match request.get("title") {
        Some(Value::String(title)) if !title.trim().is_empty() => {}
        Some(Value::String(_)) | None => {
            errors.push(("title".to_string(), vec!["title is required".to_string()]));
        }
        Some(_) => {
            errors.push(("title".to_string(), vec!["title must be a string".to_string()]));
        }
    }

    if let Some(status) = request.get("status") {
        let ok = matches!(status.as_str(), Some("draft") | Some("published"));
        if !ok {
            errors.push((
                "status".to_string(),
                vec!["status must be draft or published".to_string()],
            ));
        }
    }

    if !errors.is_empty() {
        return Err(DomainError::validation_fields(errors));
    }

    let mut fields = Map::new();
    for name in ["title", "body", "status"] {
        if let Some(value) = request.get(name) {
            fields.insert(name.to_string(), value.clone());
        }
    }
    fields
        .entry("status".to_string())
        .or_insert_with(|| json!("draft"));
    Ok(fields)
}

struct ListPosts(PostStore);

impl Endpoint for ListPosts {
    fn run(&self, _request: &RequestMap) -> DomainResult<Value> {
        Ok(self.0.list())
    }
}

struct GetPost(PostStore);

impl Endpoint for GetPost {
    fn run(&self, request: &RequestMap) -> DomainResult<Value> {
        let id = post_id(request)?;
        self.0
            .get(id)
            .ok_or_else(|| DomainError::not_found(format!("post {id} not found")))
    }
}

struct CreatePost(PostStore);

impl Endpoint for CreatePost {
    fn run(&self, request: &RequestMap) -> DomainResult<Value> {
        let fields = validate_fields(request)?;
        Ok(self.0.insert(fields))
    }
}

struct UpdatePost(PostStore);

impl Endpoint for UpdatePost {
    fn run(&self, request: &RequestMap) -> DomainResult<Value> {
        let id = post_id(request)?;
        let fields = validate_fields(request)?;
        self.0
            .update(id, fields)
            .ok_or_else(|| DomainError::not_found(format!("post {id} not found")))
    }
}

struct DeletePost(PostStore);

impl Endpoint for DeletePost {
    fn run(&self, request: &RequestMap) -> DomainResult<Value> {
        let id = post_id(request)?;
        self.0
            .remove(id)
            .ok_or_else(|| DomainError::not_found(format!("post {id} not found")))
    }
}

/// The `posts` resource: scope "posts", full item CRUD plus collection
/// list/create.
pub struct PostsResource {
    list: ListPosts,
    fetch: GetPost,
    create: CreatePost,
    update: UpdatePost,
    remove: DeletePost,
}

impl PostsResource {
    pub fn new() -> Self {
        let store = PostStore::default();
        Self {
            list: ListPosts(store.clone()),
            fetch: GetPost(store.clone()),
            create: CreatePost(store.clone()),
            update: UpdatePost(store.clone()),
            remove: DeletePost(store),
        }
    }
}

impl Default for PostsResource {
    fn default() -> Self {
        Self::new()
    }
}

impl super::Resource for PostsResource {
    fn name(&self) -> &str {
        "posts"
    }

    fn scope(&self) -> Scope {
        Scope::new("posts")
    }

    fn endpoint(&self, action: &str) -> Option<&dyn Endpoint> {
        match action {
            "get_collection" => Some(&self.list),
            "post_collection" => Some(&self.create),
            "get" => Some(&self.fetch),
            "put" => Some(&self.update),
            "delete" => Some(&self.remove),
            _ => None,
        }
    }
}

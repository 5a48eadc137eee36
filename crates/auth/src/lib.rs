//! `fieldpost-auth` — authorization boundary for the REST dispatch layer.
//!
//! This crate is intentionally decoupled from HTTP and storage: it defines
//! the scope vocabulary and the resource-server contract the dispatch layer
//! consults, plus a static token table useful for wiring and tests.

pub mod resource_server;
pub mod scope;

pub use resource_server::{OAuthError, ResourceServer, StaticTokenServer};
pub use scope::Scope;

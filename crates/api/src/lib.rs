//! `fieldpost-api` — REST request dispatch.
//!
//! Maps an incoming HTTP request onto a named application action, guards it
//! with a scoped authorization check, executes the endpoint, and serializes
//! the result in a client-negotiated format. The flow is an explicit stage
//! pipeline (`dispatch`), not framework lifecycle hooks:
//!
//! - `request.rs`: transport-agnostic request model
//! - `action.rs`: verb/segment → action-name resolution
//! - `body.rs`: strict JSON body parsing
//! - `guard.rs`: bearer + scope access guard
//! - `format/`: named output formatter registry
//! - `dispatch.rs`: the pipeline runner and error mapping
//! - `app/`: axum adapter (routing, request/response conversion)
//! - `resources/`: resource trait, registry, and the demo `posts` resource

pub mod action;
pub mod app;
pub mod body;
pub mod dispatch;
pub mod error;
pub mod format;
pub mod guard;
pub mod request;
pub mod resources;
pub mod url;

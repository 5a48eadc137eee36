//! `fieldpost-core` — domain foundation for the REST dispatch layer.
//!
//! This crate contains **pure contracts** only: the domain error taxonomy
//! and the endpoint execution boundary. No transport, no storage.

pub mod endpoint;
pub mod error;

pub use endpoint::{Endpoint, RequestMap};
pub use error::{DomainError, DomainResult};

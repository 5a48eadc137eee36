//! Domain error model.

use thiserror::Error;

/// Result type used by endpoint implementations.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level failure raised by endpoint execution.
///
/// This is a closed set on purpose: the dispatch layer maps every variant to
/// exactly one HTTP outcome, and the compiler keeps that mapping exhaustive.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// The addressed resource does not exist.
    #[error("{0}")]
    NotFound(String),

    /// The caller is not allowed to perform this action on this resource.
    #[error("{0}")]
    Authorizer(String),

    /// Input failed validation; carries the field errors in declaration order.
    #[error("{}", .0.join(", "))]
    Validation(Vec<String>),
}

impl DomainError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Authorizer(msg.into())
    }

    pub fn validation(errors: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self::Validation(errors.into_iter().map(Into::into).collect())
    }

    /// Build a validation error from per-field error lists, flattened in
    /// the order the fields were supplied.
    pub fn validation_fields<F, E>(fields: F) -> Self
    where
        F: IntoIterator<Item = (String, E)>,
        E: IntoIterator<Item = String>,
    {
        let mut flat = Vec::new();
        for (_field, errors) in fields {
            flat.extend(errors);
        }
        Self::Validation(flat)
    }
}

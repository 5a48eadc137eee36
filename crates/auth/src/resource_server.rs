//! Resource-server contract.
//!
//! The dispatch layer never interprets tokens itself: it hands the bearer
//! credential to a [`ResourceServer`] and translates the structured failure
//! it gets back. Failures carry raw HTTP header lines exactly as the
//! authorization server emits them, one of which may be a status line
//! (`HTTP/1.1 401 Unauthorized`); the caller owns that translation.

use std::collections::{BTreeMap, BTreeSet};

use thiserror::Error;

/// Structured authorization failure.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct OAuthError {
    /// Machine-readable error code (e.g. "access_denied").
    pub code: String,

    /// Human-readable description, safe to surface to the client.
    pub message: String,

    /// Raw header lines in server order. A `HTTP/1.1 <code>` entry conveys
    /// the intended response status; every other entry is a header.
    pub headers: Vec<String>,
}

impl OAuthError {
    pub fn new(
        code: impl Into<String>,
        message: impl Into<String>,
        headers: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            headers: headers.into_iter().map(Into::into).collect(),
        }
    }
}

/// Token validity and scope membership, checked per request.
///
/// `token` is the bearer credential extracted from the request, if any.
/// Implementations must be safe for concurrent independent invocations.
pub trait ResourceServer: Send + Sync {
    /// Validate the credential. When `require_header` is false a missing
    /// credential is acceptable (anonymous access).
    fn is_valid(&self, token: Option<&str>, require_header: bool) -> Result<(), OAuthError>;

    /// Check that the credential grants `scope`. With `strict` set, a
    /// missing grant is a hard failure.
    fn has_scope(&self, token: Option<&str>, scope: &str, strict: bool) -> Result<(), OAuthError>;
}

/// In-memory token table implementing [`ResourceServer`].
///
/// Backs local wiring and tests; a real deployment substitutes an OAuth
/// resource server behind the same trait.
#[derive(Debug, Clone, Default)]
pub struct StaticTokenServer {
    tokens: BTreeMap<String, BTreeSet<String>>,
    anonymous_scopes: BTreeSet<String>,
}

impl StaticTokenServer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a token with the scopes it grants.
    pub fn grant(
        mut self,
        token: impl Into<String>,
        scopes: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.tokens
            .insert(token.into(), scopes.into_iter().map(Into::into).collect());
        self
    }

    /// Allow unauthenticated requests to use `scope`.
    pub fn allow_anonymous(mut self, scope: impl Into<String>) -> Self {
        self.anonymous_scopes.insert(scope.into());
        self
    }

    fn unauthorized(message: &str) -> OAuthError {
        OAuthError::new(
            "access_denied",
            message,
            [
                "HTTP/1.1 401 Unauthorized",
                "WWW-Authenticate: Bearer realm=\"fieldpost\"",
            ],
        )
    }

    fn insufficient_scope(scope: &str) -> OAuthError {
        OAuthError::new(
            "insufficient_scope",
            format!("the granted scopes do not include '{scope}'"),
            [
                "HTTP/1.1 403 Forbidden".to_string(),
                "WWW-Authenticate: Bearer error=\"insufficient_scope\"".to_string(),
            ],
        )
    }
}

impl ResourceServer for StaticTokenServer {
    fn is_valid(&self, token: Option<&str>, require_header: bool) -> Result<(), OAuthError> {
        match token {
            Some(t) if self.tokens.contains_key(t) => Ok(()),
            Some(_) => Err(Self::unauthorized("the access token is invalid")),
            None if require_header => Err(Self::unauthorized("an access token is required")),
            None => Ok(()),
        }
    }

    fn has_scope(&self, token: Option<&str>, scope: &str, strict: bool) -> Result<(), OAuthError> {
        let granted = match token {
            Some(t) => match self.tokens.get(t) {
                Some(scopes) => scopes,
                None => return Err(Self::unauthorized("the access token is invalid")),
            },
            None => &self.anonymous_scopes,
        };

        if granted.contains(scope) || !strict {
            Ok(())
        } else {
            Err(Self::insufficient_scope(scope))
        }
    }
}

//! Request-scoped types

use axum::http::Request;
use std::fmt;
use uuid::Uuid;

/// Identifier attached to every inbound request so its log lines can be correlated
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RequestId(Uuid);

impl RequestId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Id stored in the request extensions, or a fresh one
    pub fn of<B>(request: &Request<B>) -> Self {
        request
            .extensions()
            .get::<RequestId>()
            .copied()
            .unwrap_or_default()
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

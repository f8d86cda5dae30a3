//! Service trait definitions for dependency injection
//!
//! Network I/O sits behind these traits so the engine can be tested without
//! an upstream.

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, Response};

/// Transparent hand-off of a request to the upstream
///
/// Implementations never fail: transport problems become an error response
/// (typically 502) that is returned to the client as-is.
#[mockall::automock]
#[async_trait]
pub trait Forwarder: Send + Sync {
    async fn forward(&self, request: Request<Body>) -> Response<Body>;
}

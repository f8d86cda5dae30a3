//! Tester proxy library
//!
//! Sits in front of a real upstream and, per configured path, delays,
//! fails, mocks or simply forwards requests so client applications can be
//! exercised against a misbehaving backend.

pub mod config;
pub mod core;
pub mod error;
pub mod proxy_impl;
pub mod services;
pub mod traits;
pub mod types;

// Re-export main types
pub use config::{Args, Settings};
pub use error::{ProxyError, ProxyResult};
pub use proxy_impl::ProxyServer;
pub use types::RequestId;

pub use crate::core::{Disposition, DispositionEngine, EndpointRule};

// Re-export trait definitions
pub use traits::Forwarder;

// Re-export service implementations
pub use services::{record_exchange, RealForwarder};

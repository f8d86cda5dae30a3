//! Proxy error types

use shared::ConfigError;
use std::net::SocketAddr;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProxyError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("HTTP server startup failed on {address}: {source}")]
    ServerStartup {
        address: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("Upstream client could not be built: {message}")]
    UpstreamClient { message: String },

    #[error("Proxy server is already running")]
    AlreadyRunning,

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Task join error: {0}")]
    JoinError(#[from] tokio::task::JoinError),
}

pub type ProxyResult<T> = Result<T, ProxyError>;

//! Configuration error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("a domain to proxy to is required")]
    MissingDomain,

    #[error("could not parse domain {domain}: {reason}")]
    InvalidDomain { domain: String, reason: String },

    #[error("invalid chance value: {value}")]
    InvalidChance { value: f64 },

    #[error("invalid delay range for {endpoint}: {lower:?} is greater than {upper:?}")]
    InvalidDelay {
        endpoint: String,
        lower: std::time::Duration,
        upper: std::time::Duration,
    },

    #[error("invalid periodic error for {endpoint}: nth and amount must both be at least 1")]
    InvalidEvery { endpoint: String },

    #[error("invalid status code for {endpoint}: {status}")]
    InvalidStatus { endpoint: String, status: u16 },

    #[error("invalid content type for {endpoint}: {value}")]
    InvalidContentType { endpoint: String, value: String },

    #[error("invalid duration for {field}: {reason}")]
    InvalidDuration { field: String, reason: String },

    #[error("could not unmarshal endpoint config: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("could not read config file {path}: {source}")]
    ReadFile {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

pub type ConfigResult<T> = Result<T, ConfigError>;

//! Shared types for the mock proxy
//!
//! Holds the raw endpoint configuration model, configuration errors and the
//! tracing setup. The decision engine itself lives in the `mockproxy` crate.

pub mod config;
pub mod errors;
pub mod logging;

pub use config::*;
pub use errors::*;

//! Decision logic
//!
//! No network I/O in here: the engine talks to the upstream only through the
//! `Forwarder` trait.

pub mod chance;
pub mod delay;
pub mod engine;
pub mod fault;
pub mod mock;
pub mod periodic;
pub mod rule;

// Re-export commonly used types
pub use chance::ErrorChance;
pub use delay::DelayPolicy;
pub use engine::DispositionEngine;
pub use fault::SimulatedFault;
pub use mock::{MockResponse, DEFAULT_CONTENT_TYPE};
pub use periodic::PeriodicFailure;
pub use rule::{Disposition, EndpointRule, ErrorSummary};

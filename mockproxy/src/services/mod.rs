//! Service implementations
//!
//! Real implementations of the service traits plus the capture middleware

pub mod forwarder;
pub mod recorder;

// Re-export service implementations
pub use forwarder::RealForwarder;
pub use recorder::{record_exchange, ResponseRecorder};

//! Simulated fault signal
//!
//! Not a real error: it marks a request the proxy deliberately failed. The
//! engine turns it into an HTTP error response and the logs carry its details.

use thiserror::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum SimulatedFault {
    #[error("simulated error by chance ({percentage:.1}%)")]
    Chance { percentage: f64 },

    #[error("simulated error every {nth} requests {amount} times, current {counter}")]
    Periodic { nth: u32, amount: u32, counter: u32 },
}

impl SimulatedFault {
    /// Short label used as a structured log field
    pub fn kind(&self) -> &'static str {
        match self {
            SimulatedFault::Chance { .. } => "chance",
            SimulatedFault::Periodic { .. } => "periodic",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fault_messages() {
        let chance = SimulatedFault::Chance { percentage: 12.5 };
        assert_eq!(chance.to_string(), "simulated error by chance (12.5%)");
        assert_eq!(chance.kind(), "chance");

        let periodic = SimulatedFault::Periodic { nth: 3, amount: 2, counter: 4 };
        assert_eq!(
            periodic.to_string(),
            "simulated error every 3 requests 2 times, current 4"
        );
        assert_eq!(periodic.kind(), "periodic");
    }
}

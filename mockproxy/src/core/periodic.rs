//! Periodic failure
//!
//! Counts requests and fails `amount` of them in a row once the count
//! reaches `nth`. For `nth = 3, amount = 2` the pattern is
//! `ok ok fail fail ok ok fail fail ...`.

use std::fmt;

use super::fault::SimulatedFault;
use shared::{ConfigError, ConfigResult};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeriodicFailure {
    nth: u32,
    amount: u32,
    window_end: u32,
    counter: u32,
}

impl PeriodicFailure {
    pub fn new(endpoint: &str, nth: u32, amount: u32) -> ConfigResult<Self> {
        let invalid = || ConfigError::InvalidEvery {
            endpoint: endpoint.to_string(),
        };
        if nth == 0 || amount == 0 {
            return Err(invalid());
        }
        // the last failing request of a cycle must be countable
        let window_end = nth.checked_add(amount - 1).ok_or_else(invalid)?;
        Ok(Self {
            nth,
            amount,
            window_end,
            counter: 0,
        })
    }

    pub fn nth(&self) -> u32 {
        self.nth
    }

    pub fn amount(&self) -> u32 {
        self.amount
    }

    pub fn counter(&self) -> u32 {
        self.counter
    }

    /// Count one request and report whether it falls in the failure window
    ///
    /// The counter resets on the last failing request of the window.
    pub fn tick(&mut self) -> Result<(), SimulatedFault> {
        self.counter += 1;

        if self.counter < self.nth {
            return Ok(());
        }

        let fault = SimulatedFault::Periodic {
            nth: self.nth,
            amount: self.amount,
            counter: self.counter,
        };
        if self.counter >= self.window_end {
            self.counter = 0;
        }
        Err(fault)
    }
}

impl fmt::Display for PeriodicFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} times on the {}nth", self.amount, self.nth)
    }
}

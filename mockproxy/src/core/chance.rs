//! Probabilistic failure

use rand::Rng;
use std::fmt;

use super::fault::SimulatedFault;
use shared::{ConfigError, ConfigResult};

/// Fails each request independently with a fixed probability
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ErrorChance(f64);

impl ErrorChance {
    pub fn new(probability: f64) -> ConfigResult<Self> {
        if !(0.0..=1.0).contains(&probability) {
            return Err(ConfigError::InvalidChance { value: probability });
        }
        Ok(Self(probability))
    }

    pub fn percentage(&self) -> f64 {
        self.0 * 100.0
    }

    /// One Bernoulli trial: fails iff a uniform `[0, 1)` draw is below the probability
    pub fn roll_with<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<(), SimulatedFault> {
        if self.0 == 0.0 {
            return Ok(());
        }
        if rng.r#gen::<f64>() < self.0 {
            return Err(SimulatedFault::Chance {
                percentage: self.percentage(),
            });
        }
        Ok(())
    }

    pub fn roll(&self) -> Result<(), SimulatedFault> {
        self.roll_with(&mut rand::thread_rng())
    }
}

impl fmt::Display for ErrorChance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1}%", self.percentage())
    }
}

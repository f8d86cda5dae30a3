//! Latency injection

use rand::Rng;
use std::fmt;
use std::time::Duration;

use shared::{ConfigError, ConfigResult};

/// Uniform delay drawn from `[lower, upper)`
///
/// A zero/zero range is a no-op. When both bounds are equal the delay is
/// exactly that bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DelayPolicy {
    lower: Duration,
    upper: Duration,
}

impl DelayPolicy {
    pub fn new(endpoint: &str, lower: Duration, upper: Duration) -> ConfigResult<Self> {
        if lower > upper {
            return Err(ConfigError::InvalidDelay {
                endpoint: endpoint.to_string(),
                lower,
                upper,
            });
        }
        Ok(Self { lower, upper })
    }

    pub fn is_noop(&self) -> bool {
        self.lower.is_zero() && self.upper.is_zero()
    }

    /// Draw a delay, or `None` for the zero/zero range
    pub fn sample_with<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<Duration> {
        if self.is_noop() {
            return None;
        }
        if self.lower == self.upper {
            return Some(self.lower);
        }
        Some(rng.gen_range(self.lower..self.upper))
    }

    /// Draw from the thread-local generator
    pub fn sample(&self) -> Option<Duration> {
        self.sample_with(&mut rand::thread_rng())
    }

    /// Suspend the current task for a freshly sampled duration
    ///
    /// Returns what was slept. Dropping the future (client gone) ends the
    /// sleep early.
    pub async fn apply(&self) -> Duration {
        let Some(duration) = self.sample() else {
            return Duration::ZERO;
        };
        tracing::info!(duration = ?duration, "🕰 delaying request");
        tokio::time::sleep(duration).await;
        duration
    }
}

impl fmt::Display for DelayPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}-{:?}", self.lower, self.upper)
    }
}

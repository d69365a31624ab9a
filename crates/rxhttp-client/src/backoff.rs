//! Jittered reconnect delays.
//!
//! rxhttp never retries on its own. A caller that wants to reconnect after an
//! error asks for a delay, sleeps, and dispatches again.

use std::time::Duration;

use rand::Rng;

/// Shortest delay handed out by default.
pub const RETRY_DELAY_MIN: Duration = Duration::from_millis(2500);

/// Longest delay handed out by default.
pub const RETRY_DELAY_MAX: Duration = Duration::from_millis(10_000);

/// A uniformly random delay range, sampled at millisecond granularity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryDelay {
    /// Lower bound, inclusive.
    pub min: Duration,
    /// Upper bound, inclusive.
    pub max: Duration,
}

impl RetryDelay {
    /// The default range: 2.5 s to 10 s.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            min: RETRY_DELAY_MIN,
            max: RETRY_DELAY_MAX,
        }
    }

    /// A custom range. The bounds are swapped if given in the wrong order.
    #[must_use]
    pub fn between(min: Duration, max: Duration) -> Self {
        if min <= max {
            Self { min, max }
        } else {
            Self { min: max, max: min }
        }
    }

    /// Draw a fresh delay.
    #[must_use]
    pub fn sample(&self) -> Duration {
        let min = self.min.as_millis() as u64;
        let max = (self.max.as_millis() as u64).max(min);
        Duration::from_millis(rand::thread_rng().gen_range(min..=max))
    }
}

impl Default for RetryDelay {
    fn default() -> Self {
        Self::new()
    }
}

/// Draw a delay from the default range.
#[must_use]
pub fn retry_delay() -> Duration {
    RetryDelay::new().sample()
}

use rand::Rng;
use std::time::Duration;

/// Upper bound of the one-sided jitter factor.
pub const JITTER_FACTOR: f64 = 0.1;

/// Exponential backoff schedule.
///
/// The wait after failed attempt `n` (1-based) is
/// `min(max_delay, initial_delay * multiplier^(n - 1))`. With jitter the
/// capped value is then stretched by a random factor in `[1.0, 1.1)`, so a
/// jittered delay never undercuts the schedule.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExponentialBackoff {
    pub(crate) initial_delay: Duration,
    pub(crate) max_delay: Duration,
    pub(crate) multiplier: f64,
    pub(crate) jitter: bool,
}

impl ExponentialBackoff {
    pub fn new(initial_delay: Duration, max_delay: Duration, multiplier: f64, jitter: bool) -> Self {
        Self {
            initial_delay,
            max_delay,
            multiplier,
            jitter,
        }
    }

    /// The capped delay after failed attempt `attempt`, before jitter.
    pub fn base_delay(&self, attempt: usize) -> Duration {
        let exponent = attempt.saturating_sub(1).min(i32::MAX as usize) as i32;
        let secs = self.initial_delay.as_secs_f64() * self.multiplier.powi(exponent);
        let max = self.max_delay.as_secs_f64();

        if secs.is_nan() {
            return Duration::ZERO;
        }
        if secs >= max {
            return self.max_delay;
        }
        Duration::try_from_secs_f64(secs.max(0.0)).unwrap_or(self.max_delay)
    }

    /// The delay to actually wait after failed attempt `attempt`. A jittered
    /// delay past `Duration::MAX` saturates.
    pub fn next_delay(&self, attempt: usize) -> Duration {
        let base = self.base_delay(attempt);
        if !self.jitter || base.is_zero() {
            return base;
        }
        let factor = 1.0 + rand::rng().random::<f64>() * JITTER_FACTOR;
        Duration::try_from_secs_f64(base.as_secs_f64() * factor).unwrap_or(Duration::MAX)
    }
}

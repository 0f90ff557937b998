//! Retry policy for timed-out requests.

use std::time::Duration;

/// How often a request is re-sent after a timeout.
///
/// Only timeouts are retried. The default sends each request once.
///
/// ```rust
/// use snmp_messenger::Retry;
/// use std::time::Duration;
///
/// let once = Retry::none();
/// let steady = Retry::fixed(3, Duration::from_millis(200));
/// let backoff = Retry::exponential(4, Duration::from_millis(100), Duration::from_secs(1));
/// assert_eq!(once.max_attempts, 0);
/// assert_eq!(steady.compute_delay(2), Duration::from_millis(200));
/// assert_eq!(backoff.compute_delay(3), Duration::from_millis(800));
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Retry {
    /// Re-sends after the first attempt (0 = request sent once).
    pub max_attempts: u32,
    pub backoff: Backoff,
}

/// Delay between attempts.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum Backoff {
    /// Re-send immediately.
    #[default]
    None,
    Fixed { delay: Duration },
    /// Delay doubles after each attempt, capped at `max`.
    Exponential { initial: Duration, max: Duration },
}

impl Retry {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn fixed(attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: attempts,
            backoff: Backoff::Fixed { delay },
        }
    }

    pub fn exponential(attempts: u32, initial: Duration, max: Duration) -> Self {
        Self {
            max_attempts: attempts,
            backoff: Backoff::Exponential { initial, max },
        }
    }

    /// Delay before re-send number `attempt + 1`.
    pub fn compute_delay(&self, attempt: u32) -> Duration {
        match self.backoff {
            Backoff::None => Duration::ZERO,
            Backoff::Fixed { delay } => delay,
            Backoff::Exponential { initial, max } => {
                let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
                initial.saturating_mul(factor).min(max)
            }
        }
    }
}

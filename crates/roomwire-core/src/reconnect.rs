//! Reconnect backoff.
//!
//! Delay for attempt `n` (counting from 1) is `base * 2^n`, capped at
//! [`MAX_DELAY`]. After [`MAX_ATTEMPTS`] scheduled attempts the policy is
//! exhausted and the session gives up.

use std::time::Duration;

/// Backoff base.
pub const BASE_DELAY: Duration = Duration::from_millis(1000);

/// Upper bound on a single delay.
pub const MAX_DELAY: Duration = Duration::from_secs(30);

/// Attempts before giving up.
pub const MAX_ATTEMPTS: u32 = 5;

/// Capped exponential backoff counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    attempts: u32,
    max_attempts: u32,
    base: Duration,
    max_delay: Duration,
}

impl ReconnectPolicy {
    /// Policy with the default constants.
    pub fn new() -> Self {
        Self { attempts: 0, max_attempts: MAX_ATTEMPTS, base: BASE_DELAY, max_delay: MAX_DELAY }
    }

    /// Delay for a given attempt number, ignoring the attempt limit.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        2u32.checked_pow(attempt)
            .and_then(|factor| self.base.checked_mul(factor))
            .map_or(self.max_delay, |delay| delay.min(self.max_delay))
    }

    /// Count one more attempt and return its delay.
    ///
    /// `None` once [`MAX_ATTEMPTS`] attempts have been scheduled; the counter
    /// stays put so every later call also returns `None`.
    pub fn next_delay(&mut self) -> Option<Duration> {
        if self.is_exhausted() {
            return None;
        }
        self.attempts += 1;
        Some(self.delay_for(self.attempts))
    }

    /// Forget previous attempts.
    pub fn reset(&mut self) {
        self.attempts = 0;
    }

    /// Attempts scheduled since the last reset.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// True once no further attempts will be scheduled.
    pub fn is_exhausted(&self) -> bool {
        self.attempts >= self.max_attempts
    }
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delays_double_then_cap() {
        let mut policy = ReconnectPolicy::new();
        let delays: Vec<u128> =
            std::iter::from_fn(|| policy.next_delay()).map(|d| d.as_millis()).collect();

        assert_eq!(delays, vec![2000, 4000, 8000, 16000, 30000]);
        assert!(policy.is_exhausted());
        assert_eq!(policy.next_delay(), None);
        assert_eq!(policy.attempts(), MAX_ATTEMPTS);
    }

    #[test]
    fn reset_restarts_sequence() {
        let mut policy = ReconnectPolicy::new();
        policy.next_delay();
        policy.next_delay();
        policy.reset();

        assert_eq!(policy.attempts(), 0);
        assert_eq!(policy.next_delay(), Some(Duration::from_secs(2)));
    }

    #[test]
    fn huge_attempt_saturates_at_cap() {
        let policy = ReconnectPolicy::new();
        assert_eq!(policy.delay_for(0), BASE_DELAY);
        assert_eq!(policy.delay_for(64), MAX_DELAY);
        assert_eq!(policy.delay_for(u32::MAX), MAX_DELAY);
    }
}

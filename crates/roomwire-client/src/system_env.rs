//! Production Environment implementation.
//!
//! Monotonic time comes from Tokio's clock rather than `std` so that a paused
//! Tokio runtime (`start_paused`) also pauses the session's timers. Outside
//! tests the two are the same clock.

use roomwire_core::Environment;

/// Production environment backed by the Tokio clock and the system wall clock.
#[derive(Clone, Debug, Default)]
pub struct SystemEnv;

impl SystemEnv {
    /// Create a new system environment.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Environment for SystemEnv {
    type Instant = tokio::time::Instant;

    fn now(&self) -> Self::Instant {
        tokio::time::Instant::now()
    }

    #[allow(clippy::disallowed_methods)]
    fn wall_clock_millis(&self) -> u64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map_or(0, |elapsed| u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX))
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test(start_paused = true)]
    async fn time_follows_tokio_clock() {
        let env = SystemEnv::new();

        let t1 = env.now();
        tokio::time::sleep(Duration::from_millis(50)).await;
        let elapsed = env.now() - t1;

        assert!(elapsed >= Duration::from_millis(50), "paused clock should auto-advance");
    }

    #[test]
    fn wall_clock_is_after_2020() {
        let env = SystemEnv::new();
        assert!(env.wall_clock_millis() > 1_577_836_800_000);
    }
}

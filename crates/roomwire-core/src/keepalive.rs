//! Client-initiated keepalive.
//!
//! The server announces `pingInterval` in its open frame. From then on the
//! client sends a ping every interval until the transport goes away. The
//! keepalive does not wait for pongs; a dead peer is detected by the
//! transport closing.

use std::{fmt::Debug, ops::Sub, time::Duration};

/// Ping scheduler driven by [`Keepalive::poll`].
///
/// # Invariants
///
/// - At most one schedule is active. [`Keepalive::start`] replaces any
///   previous one.
/// - After [`Keepalive::stop`], `poll` never fires until the next `start`.
#[derive(Debug, Clone, Copy)]
pub struct Keepalive<I> {
    interval: Option<Duration>,
    last: Option<I>,
}

impl<I> Keepalive<I>
where
    I: Copy + Debug + Sub<Output = Duration>,
{
    /// Stopped keepalive.
    pub fn new() -> Self {
        Self { interval: None, last: None }
    }

    /// Start pinging every `interval`, measured from `now`.
    ///
    /// A zero interval is ignored and leaves the keepalive stopped.
    pub fn start(&mut self, now: I, interval: Duration) {
        self.stop();
        if interval.is_zero() {
            tracing::warn!("Ignoring zero ping interval");
            return;
        }
        self.interval = Some(interval);
        self.last = Some(now);
    }

    /// Cancel the schedule.
    pub fn stop(&mut self) {
        self.interval = None;
        self.last = None;
    }

    /// Active ping interval.
    pub fn interval(&self) -> Option<Duration> {
        self.interval
    }

    /// Whether a ping is due at `now`. Firing resets the countdown.
    pub fn poll(&mut self, now: I) -> bool {
        let (Some(interval), Some(last)) = (self.interval, self.last) else {
            return false;
        };
        if now - last >= interval {
            self.last = Some(now);
            true
        } else {
            false
        }
    }
}

impl<I> Default for Keepalive<I>
where
    I: Copy + Debug + Sub<Output = Duration>,
{
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use super::*;

    #[test]
    fn fires_once_per_interval() {
        let t0 = Instant::now();
        let mut keepalive = Keepalive::new();
        keepalive.start(t0, Duration::from_secs(25));

        assert!(!keepalive.poll(t0 + Duration::from_secs(24)));
        assert!(keepalive.poll(t0 + Duration::from_secs(25)));
        assert!(!keepalive.poll(t0 + Duration::from_secs(26)));
        assert!(keepalive.poll(t0 + Duration::from_secs(50)));
    }

    #[test]
    fn stop_silences_polling() {
        let t0 = Instant::now();
        let mut keepalive = Keepalive::new();
        keepalive.start(t0, Duration::from_secs(1));
        keepalive.stop();

        assert!(keepalive.interval().is_none());
        assert!(!keepalive.poll(t0 + Duration::from_secs(60)));
    }

    #[test]
    fn restart_replaces_schedule() {
        let t0 = Instant::now();
        let mut keepalive = Keepalive::new();
        keepalive.start(t0, Duration::from_secs(1));
        keepalive.start(t0 + Duration::from_secs(5), Duration::from_secs(10));

        assert_eq!(keepalive.interval(), Some(Duration::from_secs(10)));
        assert!(!keepalive.poll(t0 + Duration::from_secs(14)));
        assert!(keepalive.poll(t0 + Duration::from_secs(15)));
    }

    #[test]
    fn zero_interval_stays_stopped() {
        let t0 = Instant::now();
        let mut keepalive = Keepalive::new();
        keepalive.start(t0, Duration::ZERO);
        assert!(keepalive.interval().is_none());
    }
}

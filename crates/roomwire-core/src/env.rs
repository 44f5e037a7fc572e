//! Environment abstraction for deterministic testing.
//!
//! Decouples session logic from the system clock. Production uses real time;
//! tests use a virtual clock that only moves when told to.

use std::{fmt::Debug, ops::Sub, time::Duration};

/// Abstract environment providing monotonic and wall-clock time.
///
/// # Invariants
///
/// - `now()` never goes backwards within one execution context
/// - `wall_clock_millis()` is only used for values sent to the server, never
///   for timer arithmetic
pub trait Environment: Clone + Send + Sync + 'static {
    /// The specific instant type used by this environment.
    type Instant: Copy + Ord + Send + Sync + Debug + Sub<Output = Duration>;

    /// Current time (monotonic).
    fn now(&self) -> Self::Instant;

    /// Milliseconds since the Unix epoch.
    fn wall_clock_millis(&self) -> u64;
}

/// Test environment with a manually advanced clock.
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils {
    use std::{
        sync::{
            Arc,
            atomic::{AtomicU64, Ordering},
        },
        time::{Duration, Instant},
    };

    use super::Environment;

    /// Wall-clock value reported at virtual time zero.
    pub const MOCK_EPOCH_MILLIS: u64 = 1_700_000_000_000;

    /// Environment whose clock only moves through [`MockEnv::advance`].
    ///
    /// Clones share the same clock.
    #[derive(Clone, Debug)]
    pub struct MockEnv {
        base: Instant,
        offset_millis: Arc<AtomicU64>,
    }

    impl MockEnv {
        /// Create a clock at virtual time zero.
        #[allow(clippy::disallowed_methods)]
        pub fn new() -> Self {
            Self { base: Instant::now(), offset_millis: Arc::new(AtomicU64::new(0)) }
        }

        /// Move the clock forward.
        pub fn advance(&self, by: Duration) {
            let millis = u64::try_from(by.as_millis()).unwrap_or(u64::MAX);
            self.offset_millis.fetch_add(millis, Ordering::SeqCst);
        }

        /// Time elapsed since virtual zero.
        pub fn elapsed(&self) -> Duration {
            Duration::from_millis(self.offset_millis.load(Ordering::SeqCst))
        }
    }

    impl Default for MockEnv {
        fn default() -> Self {
            Self::new()
        }
    }

    impl Environment for MockEnv {
        type Instant = Instant;

        fn now(&self) -> Instant {
            self.base + self.elapsed()
        }

        fn wall_clock_millis(&self) -> u64 {
            MOCK_EPOCH_MILLIS + self.offset_millis.load(Ordering::SeqCst)
        }
    }

}

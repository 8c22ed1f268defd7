//! Environment abstraction for deterministic testing.
//!
//! Decouples chat logic from system resources. Enables deterministic
//! simulation (virtual clock, fixed wall-clock base) and production use with
//! real system time.

use std::{future::Future, time::Duration};

use chrono::{DateTime, Utc};

/// Abstract environment providing time and async sleeping.
///
/// # Invariants
///
/// - `now()` never goes backwards
/// - `wall_clock()` is only used for display timestamps, never for timeouts
pub trait Environment: Clone + Send + Sync + 'static {
    /// The instant type used for timeouts.
    ///
    /// Production uses `std::time::Instant`; simulation uses a virtual
    /// instant that only moves when the test advances it.
    type Instant: Copy + Ord + Send + Sync + std::ops::Sub<Output = Duration>;

    /// Current monotonic time.
    fn now(&self) -> Self::Instant;

    /// Current wall-clock time, used for `createdAt` of optimistic messages
    /// and temporary message IDs.
    fn wall_clock(&self) -> DateTime<Utc>;

    /// Sleeps for the specified duration.
    ///
    /// Only driver code sleeps; state machines never do.
    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> + Send;
}

/// Production environment using system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemEnv;

impl SystemEnv {
    /// Create a new system environment.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Environment for SystemEnv {
    type Instant = std::time::Instant;

    #[allow(clippy::disallowed_methods)]
    fn now(&self) -> Self::Instant {
        std::time::Instant::now()
    }

    #[allow(clippy::disallowed_methods)]
    fn wall_clock(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> + Send {
        tokio::time::sleep(duration)
    }
}

/// Deterministic environment for tests.
#[cfg(any(test, feature = "test-utils"))]
#[allow(clippy::disallowed_types, reason = "Synchronous clock state only")]
pub mod test_utils {
    use std::{
        ops::{Add, Sub},
        sync::{Arc, Mutex},
        time::Duration,
    };

    use chrono::{DateTime, TimeZone, Utc};

    use super::Environment;

    /// Point on the virtual clock, measured from the environment's creation.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
    pub struct VirtualInstant(Duration);

    impl VirtualInstant {
        /// Time since the environment was created.
        #[must_use]
        pub fn elapsed_since_start(self) -> Duration {
            self.0
        }
    }

    impl Sub for VirtualInstant {
        type Output = Duration;

        fn sub(self, rhs: Self) -> Duration {
            self.0.saturating_sub(rhs.0)
        }
    }

    impl Add<Duration> for VirtualInstant {
        type Output = Self;

        fn add(self, rhs: Duration) -> Self {
            Self(self.0 + rhs)
        }
    }

    /// Environment with a manually advanced clock.
    ///
    /// Clones share the clock. `sleep` advances it instead of waiting, and
    /// the wall clock starts at a fixed instant so message timestamps and
    /// temporary IDs are reproducible.
    #[derive(Debug, Clone)]
    pub struct MockEnv {
        elapsed: Arc<Mutex<Duration>>,
        wall_base: DateTime<Utc>,
    }

    impl Default for MockEnv {
        fn default() -> Self {
            Self::new()
        }
    }

    impl MockEnv {
        /// Wall-clock start: 2024-01-01T00:00:00Z.
        pub const WALL_BASE_SECS: i64 = 1_704_067_200;

        /// Create an environment at virtual time zero.
        #[must_use]
        pub fn new() -> Self {
            let wall_base = Utc.timestamp_opt(Self::WALL_BASE_SECS, 0).single().unwrap_or_default();
            Self { elapsed: Arc::new(Mutex::new(Duration::ZERO)), wall_base }
        }

        /// Move the clock forward.
        pub fn advance(&self, by: Duration) {
            let mut elapsed = self.elapsed.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
            *elapsed += by;
        }

        fn elapsed(&self) -> Duration {
            *self.elapsed.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
        }
    }

    impl Environment for MockEnv {
        type Instant = VirtualInstant;

        fn now(&self) -> Self::Instant {
            VirtualInstant(self.elapsed())
        }

        fn wall_clock(&self) -> DateTime<Utc> {
            self.wall_base + self.elapsed()
        }

        fn sleep(&self, duration: Duration) -> impl std::future::Future<Output = ()> + Send {
            self.advance(duration);
            std::future::ready(())
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn clones_share_the_clock() {
            let env = MockEnv::new();
            let other = env.clone();
            let start = env.now();

            other.advance(Duration::from_secs(3));

            assert_eq!(env.now() - start, Duration::from_secs(3));
            assert_eq!(env.wall_clock().timestamp(), MockEnv::WALL_BASE_SECS + 3);
        }
    }
}

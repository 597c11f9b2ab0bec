//! Time abstraction for lifecycle deadlines and generation tags
//!
//! Deadlines are computed from the monotonic [`Clock::now`]; generation tags
//! come from the wall clock through [`Clock::unix_seconds`]. Production code
//! uses [`SystemClock`]; tests drive [`MockClock`] forward explicitly.
//!
//! # Examples
//!
//! ```
//! use std::time::{Duration, UNIX_EPOCH};
//!
//! use lifecycle_metrics::{Clock, MockClock};
//!
//! let clock = MockClock::starting_at(UNIX_EPOCH + Duration::from_secs(1_219_204_980));
//! let start = clock.now();
//! clock.advance(Duration::from_secs(5));
//!
//! assert_eq!(clock.now().duration_since(start), Duration::from_secs(5));
//! assert_eq!(clock.unix_seconds(), 1_219_204_985);
//! ```

use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use parking_lot::Mutex;

/// Source of time for lifecycle state machines
pub trait Clock: Send + Sync {
    /// Get current instant (monotonic time)
    fn now(&self) -> Instant;

    /// Get current system time (wall clock)
    fn system_time(&self) -> SystemTime;

    /// Get whole seconds since the UNIX epoch
    ///
    /// Clocks set before the epoch report zero.
    fn unix_seconds(&self) -> u64 {
        self.system_time().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs()
    }
}

/// Real system clock implementation
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn system_time(&self) -> SystemTime {
        SystemTime::now()
    }
}

/// Manually driven clock for deterministic tests
///
/// Clones share the same elapsed time, so a clock handed to a metric vector
/// can be advanced from the test that owns the other clone.
#[derive(Debug, Clone)]
pub struct MockClock {
    start: Instant,
    elapsed: Arc<Mutex<Duration>>,
    base_system_time: SystemTime,
}

impl MockClock {
    /// Create a mock clock whose wall time starts at the current real time
    pub fn new() -> Self {
        Self::starting_at(SystemTime::now())
    }

    /// Create a mock clock whose wall time starts at `base_system_time`
    ///
    /// Useful when assertions depend on generation tags, which encode the
    /// wall time.
    pub fn starting_at(base_system_time: SystemTime) -> Self {
        Self { start: Instant::now(), elapsed: Arc::new(Mutex::new(Duration::ZERO)), base_system_time }
    }

    /// Advance the mock clock by a duration
    pub fn advance(&self, duration: Duration) {
        *self.elapsed.lock() += duration;
    }

    /// Set the mock clock to a specific elapsed time
    pub fn set_elapsed(&self, duration: Duration) {
        *self.elapsed.lock() = duration;
    }

    /// Get the time simulated since the clock was created
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        *self.elapsed.lock()
    }
}

impl Default for MockClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MockClock {
    fn now(&self) -> Instant {
        self.start + self.elapsed()
    }

    fn system_time(&self) -> SystemTime {
        self.base_system_time + self.elapsed()
    }
}

//! Time abstraction for the blocking receive loop.
//!
//! The `TimeSource` trait lets the polling loop measure its deadline and
//! suspend between polls without tying it to the wall clock, so tests can
//! run a ten second timeout in microseconds.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Monotonic time source with a voluntary suspension point.
///
/// - [`MonotonicTime`] for real runs
/// - [`MockTime`] for host tests with controllable time
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use simlink_core::traits::{MockTime, TimeSource};
///
/// fn wait_for<T: TimeSource>(time: &T, deadline_us: u64) -> u32 {
///     let start = time.now_us();
///     let mut polls = 0;
///     while time.elapsed_since(start) < deadline_us {
///         polls += 1;
///         time.sleep(Duration::from_millis(10));
///     }
///     polls
/// }
///
/// let time = MockTime::new();
/// assert_eq!(wait_for(&time, 100_000), 10);
/// ```
pub trait TimeSource: Clone + Send + Sync {
    /// Returns monotonic time in microseconds since an arbitrary origin.
    fn now_us(&self) -> u64;

    /// Blocks the calling thread for `duration`.
    fn sleep(&self, duration: Duration);

    /// Returns elapsed time in microseconds since a reference point.
    ///
    /// Uses saturating subtraction to handle a reference in the future.
    fn elapsed_since(&self, reference_us: u64) -> u64 {
        self.now_us().saturating_sub(reference_us)
    }
}

/// Host monotonic clock backed by [`Instant`] and [`std::thread::sleep`].
#[derive(Debug, Clone, Copy)]
pub struct MonotonicTime {
    origin: Instant,
}

impl MonotonicTime {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicTime {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeSource for MonotonicTime {
    fn now_us(&self) -> u64 {
        self.origin.elapsed().as_micros() as u64
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Mock time source for testing.
///
/// Sleeping advances the shared counter instead of blocking. Clones share the
/// same counter, so a test can keep a handle and inspect elapsed time after
/// handing a clone to the code under test.
///
/// ```
/// use std::time::Duration;
/// use simlink_core::traits::{MockTime, TimeSource};
///
/// let time = MockTime::new();
/// let probe = time.clone();
/// time.sleep(Duration::from_millis(1));
/// assert_eq!(probe.now_us(), 1000);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MockTime {
    current_us: Arc<AtomicU64>,
    sleeps: Arc<AtomicU64>,
}

impl MockTime {
    /// Creates a new `MockTime` starting at time 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new `MockTime` starting at the specified time.
    pub fn with_initial(us: u64) -> Self {
        let time = Self::default();
        time.set(us);
        time
    }

    /// Sets the current time to an absolute value.
    pub fn set(&self, us: u64) {
        self.current_us.store(us, Ordering::Relaxed);
    }

    /// Advances the current time by the specified amount.
    pub fn advance(&self, us: u64) {
        self.current_us.fetch_add(us, Ordering::Relaxed);
    }

    /// Number of times `sleep` has been called.
    pub fn sleep_count(&self) -> u64 {
        self.sleeps.load(Ordering::Relaxed)
    }
}

impl TimeSource for MockTime {
    fn now_us(&self) -> u64 {
        self.current_us.load(Ordering::Relaxed)
    }

    fn sleep(&self, duration: Duration) {
        self.sleeps.fetch_add(1, Ordering::Relaxed);
        self.advance(duration.as_micros() as u64);
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

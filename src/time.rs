//! Monotonic time sources used to drive refill and rotation schedules.
//!
//! Every time-dependent component in this crate — the token bucket's
//! refill loop, the stochastic and Bloom-filter throttles' tweak
//! rotation — is driven through [`TimeSource`] rather than reading the
//! system clock directly. This keeps the hot path deterministic under
//! test and lets a driving simulator replay a workload against virtual
//! time instead of wall-clock time.

use std::sync::atomic::{AtomicI64, Ordering::Relaxed};
use std::sync::OnceLock;
use std::time::Instant;

/// A source of monotonic nanosecond timestamps.
///
/// Implementations must be:
///
/// - **Monotonic**: successive calls never return a decreasing value.
/// - **Cheap**: called on every admission check and every refill
///   attempt.
/// - **`Send + Sync`**: shared across every thread using a throttle.
pub trait TimeSource: Send + Sync {
    /// Returns a monotonic timestamp in nanoseconds.
    fn now_ns(&self) -> i64;
}

/// Monotonic system time source backed by [`Instant`].
///
/// Uses a process-wide anchor and returns elapsed nanoseconds since
/// that anchor, avoiding wall-clock jumps (NTP adjustments, leap
/// seconds) that a `SystemTime`-based source would be exposed to.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemTimeSource;

impl SystemTimeSource {
    #[inline]
    fn anchor() -> Instant {
        static START: OnceLock<Instant> = OnceLock::new();
        *START.get_or_init(Instant::now)
    }
}

impl TimeSource for SystemTimeSource {
    #[inline]
    fn now_ns(&self) -> i64 {
        Self::anchor()
            .elapsed()
            .as_nanos()
            .try_into()
            .unwrap_or(i64::MAX)
    }
}

/// A settable time source for deterministic tests and simulators.
///
/// Every throttle constructor accepts a [`TimeSource`]; passing a
/// [`MockTimeSource`] lets a caller (a unit test, or an external
/// simulator replaying a workload) advance virtual time explicitly
/// instead of waiting on the wall clock, which is what makes the
/// end-to-end convergence scenarios in this crate's test suite
/// reproducible.
///
/// Cloning a [`MockTimeSource`] yields another handle to the *same*
/// underlying clock (the counter lives behind an `Arc`), so a test can
/// keep one handle to drive time forward while handing a clone to the
/// throttle under test.
#[derive(Debug, Default, Clone)]
pub struct MockTimeSource {
    current_ns: std::sync::Arc<AtomicI64>,
}

impl MockTimeSource {
    /// Creates a mock clock starting at the given nanosecond timestamp.
    pub fn new(initial_ns: i64) -> Self {
        Self { current_ns: std::sync::Arc::new(AtomicI64::new(initial_ns)) }
    }

    /// Advances the clock by the given number of nanoseconds.
    ///
    /// # Panics
    ///
    /// Panics if `nanos` is negative — time sources must be
    /// monotonic non-decreasing.
    pub fn advance_ns(&self, nanos: i64) {
        assert!(nanos >= 0, "MockTimeSource can only move forward");
        self.current_ns.fetch_add(nanos, Relaxed);
    }

    /// Advances the clock by the given number of whole seconds.
    pub fn advance_secs(&self, secs: i64) {
        self.advance_ns(secs * 1_000_000_000);
    }

    /// Sets the clock to an absolute nanosecond timestamp.
    ///
    /// # Panics
    ///
    /// Panics if `ns` would move the clock backwards.
    pub fn set_ns(&self, ns: i64) {
        let prev = self.current_ns.load(Relaxed);
        assert!(ns >= prev, "MockTimeSource cannot move backwards");
        self.current_ns.store(ns, Relaxed);
    }
}

impl TimeSource for MockTimeSource {
    #[inline]
    fn now_ns(&self) -> i64 {
        self.current_ns.load(Relaxed)
    }
}

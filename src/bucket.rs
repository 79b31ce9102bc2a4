//! A lock-free, AIMD-driven token bucket.
//!
//! Each bucket refills continuously against the [`SharedAimd`] target
//! rate of the throttle that owns it, and exposes a non-blocking
//! admit/claim split: [`AimdTokenBucket::would_allow`] checks without
//! mutating, [`AimdTokenBucket::claim_token`] commits the consumption.
//! Splitting the two lets a caller check-then-consume without holding
//! any lock across the pair, at the cost of a small race window —
//! see the refill notes below.

use crate::aimd::SharedAimd;
use crate::atomic_f64::AtomicF64;
use crate::time::TimeSource;
use std::sync::atomic::{AtomicI64, Ordering::{AcqRel, Acquire, Relaxed}};
use std::sync::Arc;

const NANOS_PER_SEC: f64 = 1_000_000_000.0;

/// An AIMD-refilled token bucket.
///
/// Refill rate is read from a [`SharedAimd`] on every refill attempt,
/// so a bucket has no rate of its own — only a capacity.
pub struct AimdTokenBucket<T: TimeSource> {
    capacity: f64,
    tokens: AtomicF64,
    last_refill_ns: AtomicI64,
    aimd: Arc<SharedAimd>,
    time_source: Arc<T>,
}

impl<T: TimeSource> AimdTokenBucket<T> {
    /// Creates a new bucket at full capacity, anchored to `now`.
    ///
    /// # Panics
    ///
    /// Panics if `capacity <= 0.0` or is NaN.
    pub fn new(capacity: f64, aimd: Arc<SharedAimd>, time_source: Arc<T>) -> Self {
        assert!(capacity > 0.0 && !capacity.is_nan(), "capacity must be > 0");
        let now = time_source.now_ns();
        Self {
            capacity,
            tokens: AtomicF64::new(capacity),
            last_refill_ns: AtomicI64::new(now),
            aimd,
            time_source,
        }
    }

    #[inline]
    pub fn capacity(&self) -> f64 {
        self.capacity
    }

    /// Returns `true` if a token is currently available — the fast
    /// path skips refilling entirely if there are tokens to spare,
    /// otherwise it performs a refill attempt first.
    ///
    /// The fast-path load is `Relaxed`; under heavy contention it can
    /// return `false` when a racing refill would have admitted. This
    /// is accepted: the caller simply retries on its next attempt.
    #[inline]
    pub fn would_allow(&self) -> bool {
        if self.tokens.load(Relaxed) > 1.0 {
            return true;
        }
        self.refill() > 1.0
    }

    /// Atomically subtracts one token. May transiently drive `tokens`
    /// below zero under contention; this self-corrects on the next
    /// refill, which only ever adds, never subtracts, to correct.
    #[inline]
    pub fn claim_token(&self) {
        self.tokens.fetch_update(Relaxed, |v| v - 1.0);
    }

    #[inline]
    pub fn on_success(&self) {
        self.aimd.on_success();
    }

    #[inline]
    pub fn on_failure(&self) {
        self.aimd.on_failure();
    }

    /// The shared AIMD's current target TPS. Exposed for tests and
    /// simulators that want to observe convergence directly.
    #[inline]
    pub fn aimd_target(&self) -> f64 {
        self.aimd.get_target_tps()
    }

    /// The critical concurrent refill section (`spec.md` §4.4): claims
    /// the `[last_refill, now]` interval via CAS on `last_refill_ns` so
    /// only the winning thread adds tokens for that interval, then caps
    /// the addition to `capacity - tokens` to bound overshoot from a
    /// concurrent `claim_token` racing the addition. Returns the
    /// resulting token count (or the current count, if no refill was
    /// due).
    fn refill(&self) -> f64 {
        loop {
            let now = self.time_source.now_ns();
            let last = self.last_refill_ns.load(Acquire);
            if now <= last {
                return self.tokens.load(Relaxed);
            }

            let elapsed_secs = (now - last) as f64 / NANOS_PER_SEC;
            let target_tps = self.aimd.get_target_tps();
            let to_add = target_tps * elapsed_secs;
            if to_add < 1.0 {
                return self.tokens.load(Relaxed);
            }

            if self.last_refill_ns.compare_exchange(last, now, AcqRel, Acquire).is_ok() {
                let prev = self.tokens.load(Relaxed);
                let capped = to_add.min(self.capacity - prev);
                let new_value = self.tokens.fetch_update(Relaxed, |v| v + capped);
                #[cfg(feature = "tracing")]
                tracing::trace!(added = capped, tokens = new_value + capped, "bucket refill");
                return new_value + capped;
            }
            // Lost the CAS race: another thread claimed this interval, retry.
        }
    }
}

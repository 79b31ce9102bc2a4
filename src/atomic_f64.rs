//! A lock-free `f64` built on `AtomicU64`'s bit pattern.
//!
//! Rust has no `AtomicF64`, so every floating-point value shared
//! across threads in this crate — the AIMD target rate, a bucket's
//! token count — is stored as the `u64` bit pattern of an `f64` and
//! converted on each load/store. This mirrors the `AtomicF32`
//! fixed-point wrapper pattern used elsewhere in the rate-limiting
//! ecosystem for fractional token accounting, generalized here to 64
//! bits and to a compare-and-swap update path.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// An `f64` that can be loaded, stored, and compare-and-swapped from
/// multiple threads without locking.
pub struct AtomicF64 {
    bits: AtomicU64,
}

impl AtomicF64 {
    #[inline]
    pub fn new(value: f64) -> Self {
        Self { bits: AtomicU64::new(value.to_bits()) }
    }

    #[inline]
    pub fn load(&self, order: Ordering) -> f64 {
        f64::from_bits(self.bits.load(order))
    }

    #[inline]
    pub fn store(&self, value: f64, order: Ordering) {
        self.bits.store(value.to_bits(), order);
    }

    /// Compare-and-swap on the underlying bit pattern. Returns `Ok` with
    /// the previous value on success, `Err` with the observed current
    /// value on failure — same shape as `AtomicU64::compare_exchange`.
    #[inline]
    pub fn compare_exchange(
        &self,
        current: f64,
        new: f64,
        success: Ordering,
        failure: Ordering,
    ) -> Result<f64, f64> {
        self.bits
            .compare_exchange(current.to_bits(), new.to_bits(), success, failure)
            .map(f64::from_bits)
            .map_err(f64::from_bits)
    }

    /// Applies `f` to the current value in a CAS retry loop, returning
    /// the previous value. `f` may be called more than once under
    /// contention and must be pure.
    #[inline]
    pub fn fetch_update<F>(&self, order: Ordering, mut f: F) -> f64
    where
        F: FnMut(f64) -> f64,
    {
        let mut current = self.load(order);
        loop {
            let new = f(current);
            match self.compare_exchange(current, new, order, order) {
                Ok(prev) => return prev,
                Err(observed) => current = observed,
            }
        }
    }
}

impl fmt::Debug for AtomicF64 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AtomicF64")
            .field("value", &self.load(Ordering::Relaxed))
            .finish()
    }
}

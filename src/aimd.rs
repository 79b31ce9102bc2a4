//! Shared additive-increase/multiplicative-decrease rate state.
//!
//! A [`SharedAimd`] holds a single target-TPS figure that every bucket
//! belonging to one throttle instance refills against. It is the
//! feedback loop: every call outcome nudges `target_tps` toward the
//! downstream's actual goodput. Updates are deliberately
//! last-writer-wins rather than linearizable — see the module-level
//! notes on [`crate::bucket`] for why that's fine here.

use crate::atomic_f64::AtomicF64;
use std::sync::atomic::Ordering::Relaxed;

/// Additive step applied to `target_tps` on every success.
pub const ADDITIVE_INCREASE: f64 = 1.0;
/// Multiplicative factor applied to `target_tps` on every failure.
pub const MULTIPLICATIVE_DECREASE: f64 = 0.7;

/// Default floor, below which `target_tps` never drops.
pub const DEFAULT_FLOOR_TPS: f64 = 5.0;
/// Default ceiling, above which `target_tps` never rises.
pub const DEFAULT_CEILING_TPS: f64 = f64::INFINITY;

/// Shared AIMD control state for one throttle instance.
///
/// `floor_tps` and `ceiling_tps` are fixed at construction; `target_tps`
/// is the only mutable field, and is shared (via `Arc`) by every bucket
/// belonging to the owning throttle.
#[derive(Debug)]
pub struct SharedAimd {
    target_tps: AtomicF64,
    floor_tps: f64,
    ceiling_tps: f64,
}

impl SharedAimd {
    /// Creates a new shared AIMD state.
    ///
    /// # Panics
    ///
    /// Panics if `floor_tps > ceiling_tps` or `initial_tps` is not in
    /// `[floor_tps, ceiling_tps]`, or if any value is NaN.
    pub fn new(initial_tps: f64, floor_tps: f64, ceiling_tps: f64) -> Self {
        assert!(floor_tps >= 0.0, "floor_tps must be >= 0");
        assert!(!floor_tps.is_nan() && !ceiling_tps.is_nan() && !initial_tps.is_nan(),
            "AIMD rates must not be NaN");
        assert!(floor_tps <= ceiling_tps, "floor_tps must be <= ceiling_tps");
        assert!(
            initial_tps >= floor_tps && initial_tps <= ceiling_tps,
            "initial_tps must be within [floor_tps, ceiling_tps]"
        );

        Self {
            target_tps: AtomicF64::new(initial_tps),
            floor_tps,
            ceiling_tps,
        }
    }

    /// Reads the current target TPS.
    #[inline]
    pub fn get_target_tps(&self) -> f64 {
        self.target_tps.load(Relaxed)
    }

    #[inline]
    pub fn floor_tps(&self) -> f64 {
        self.floor_tps
    }

    #[inline]
    pub fn ceiling_tps(&self) -> f64 {
        self.ceiling_tps
    }

    /// Additive increase: `target_tps <- min(ceiling, target_tps + 1.0)`.
    #[inline]
    pub fn on_success(&self) {
        let ceiling = self.ceiling_tps;
        self.target_tps.fetch_update(Relaxed, |v| (v + ADDITIVE_INCREASE).min(ceiling));
        #[cfg(feature = "tracing")]
        tracing::trace!(target_tps = self.get_target_tps(), "aimd success");
    }

    /// Multiplicative decrease: `target_tps <- max(floor, target_tps * 0.7)`.
    #[inline]
    pub fn on_failure(&self) {
        let floor = self.floor_tps;
        self.target_tps.fetch_update(Relaxed, |v| (v * MULTIPLICATIVE_DECREASE).max(floor));
        #[cfg(feature = "tracing")]
        tracing::trace!(target_tps = self.get_target_tps(), "aimd failure");
    }

    /// Sets `target_tps` directly, clamped to `[floor, ceiling]`. Used by
    /// tests and simulators to inject goodput changes.
    #[inline]
    pub fn set_target_tps(&self, value: f64) {
        let clamped = value.clamp(self.floor_tps, self.ceiling_tps);
        self.target_tps.store(clamped, Relaxed);
    }
}

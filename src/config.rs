//! Construction-time configuration for the fairness throttles.
//!
//! Mirrors the chainable `with_*` builder style used elsewhere for
//! feature configuration (see `TracingConfig` in the ambient HTTP
//! layer this crate was distilled from): a `Default`-able struct with
//! methods that consume and return `self`. Validation is deferred to
//! the point a [`ThrottleConfig`] is consumed by a throttle
//! constructor, not performed on each builder call.

use crate::aimd::{DEFAULT_CEILING_TPS, DEFAULT_FLOOR_TPS};
use crate::time::{SystemTimeSource, TimeSource};

/// Default bucket count for [`crate::throttle::StochasticFairThrottle`].
pub const DEFAULT_BUCKETS: u32 = 17;
/// Default initial target TPS.
pub const DEFAULT_INITIAL_TPS: f64 = 100.0;

/// Configuration shared by both fairness throttle constructors.
#[derive(Debug, Clone)]
pub struct ThrottleConfig<T: TimeSource = SystemTimeSource> {
    pub(crate) time_source: T,
    pub(crate) buckets: u32,
    pub(crate) initial_tps: f64,
    pub(crate) floor_tps: f64,
    pub(crate) ceiling_tps: f64,
}

impl Default for ThrottleConfig<SystemTimeSource> {
    fn default() -> Self {
        Self {
            time_source: SystemTimeSource,
            buckets: DEFAULT_BUCKETS,
            initial_tps: DEFAULT_INITIAL_TPS,
            floor_tps: DEFAULT_FLOOR_TPS,
            ceiling_tps: DEFAULT_CEILING_TPS,
        }
    }
}

impl ThrottleConfig<SystemTimeSource> {
    /// Creates a default configuration backed by the system clock:
    /// 17 buckets, 100 initial TPS, a floor of 5, and an unbounded
    /// ceiling.
    pub fn new() -> Self {
        Self::default()
    }
}

impl<T: TimeSource> ThrottleConfig<T> {
    /// Sets the number of token buckets backing the throttle.
    pub fn buckets(mut self, buckets: u32) -> Self {
        self.buckets = buckets;
        self
    }

    /// Sets the initial target TPS every bucket's shared AIMD state
    /// starts at.
    pub fn initial_tps(mut self, initial_tps: f64) -> Self {
        self.initial_tps = initial_tps;
        self
    }

    /// Sets the floor the AIMD target TPS never drops below.
    pub fn floor_tps(mut self, floor_tps: f64) -> Self {
        self.floor_tps = floor_tps;
        self
    }

    /// Sets the ceiling the AIMD target TPS never rises above.
    pub fn ceiling_tps(mut self, ceiling_tps: f64) -> Self {
        self.ceiling_tps = ceiling_tps;
        self
    }

    /// Swaps in a custom time source, changing the configuration's
    /// time source type. Used to inject a [`crate::time::MockTimeSource`]
    /// in tests and simulators.
    pub fn time_source<U: TimeSource>(self, time_source: U) -> ThrottleConfig<U> {
        ThrottleConfig {
            time_source,
            buckets: self.buckets,
            initial_tps: self.initial_tps,
            floor_tps: self.floor_tps,
            ceiling_tps: self.ceiling_tps,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::MockTimeSource;

    #[test]
    fn default_matches_spec_defaults() {
        let cfg = ThrottleConfig::new();
        assert_eq!(cfg.buckets, 17);
        assert_eq!(cfg.initial_tps, 100.0);
        assert_eq!(cfg.floor_tps, 5.0);
        assert_eq!(cfg.ceiling_tps, f64::INFINITY);
    }

    #[test]
    fn builder_chains_overrides() {
        let cfg = ThrottleConfig::new()
            .buckets(10)
            .initial_tps(50.0)
            .floor_tps(1.0)
            .ceiling_tps(500.0)
            .time_source(MockTimeSource::new(0));

        assert_eq!(cfg.buckets, 10);
        assert_eq!(cfg.initial_tps, 50.0);
        assert_eq!(cfg.floor_tps, 1.0);
        assert_eq!(cfg.ceiling_tps, 500.0);
    }
}

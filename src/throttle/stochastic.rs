//! The stochastic fair throttle (SFT): one token bucket per hash slot.

use super::{fresh_tweak, ResultSink, ThrottleResult};
use crate::aimd::SharedAimd;
use crate::bucket::AimdTokenBucket;
use crate::config::ThrottleConfig;
use crate::hash::tweaked_hash;
use crate::time::{SystemTimeSource, TimeSource};
use std::sync::atomic::{AtomicI32, AtomicI64, Ordering::{AcqRel, Acquire, Relaxed}};
use std::sync::Arc;

/// Tweak rotation period for the stochastic throttle: 5 seconds.
const ROTATION_PERIOD_NS: i64 = 5 * 1_000_000_000;

/// A stochastic fair throttle: `B` independent AIMD token buckets
/// sharing one [`SharedAimd`], with keys mapped to a single bucket by
/// [`tweaked_hash`].
///
/// Every 5 seconds the key→bucket mapping is reshuffled by rotating a
/// salt (`tweak`), so that a tenant unlucky enough to share a bucket
/// with a heavy hitter doesn't stay starved forever.
///
/// ## Fairness tradeoff
///
/// Compared to [`crate::throttle::BloomFilterFairThrottle`], SFT gives
/// each key exactly one bucket: fairness is better for a small number
/// of concurrently-active tenants (fewer chances of collision), but a
/// collision, while it lasts, is total — two tenants in the same
/// bucket fully share its capacity.
pub struct StochasticFairThrottle<T: TimeSource = SystemTimeSource> {
    buckets: Vec<AimdTokenBucket<T>>,
    tweak: AtomicI32,
    last_tweak_update_ns: AtomicI64,
    time_source: Arc<T>,
}

impl<T: TimeSource> StochasticFairThrottle<T> {
    /// Creates a throttle from the given configuration. An alias for
    /// [`StochasticFairThrottle::with_config`] matching the
    /// constructor name every other throttle in this crate uses.
    ///
    /// # Panics
    ///
    /// See [`StochasticFairThrottle::with_config`].
    pub fn new(config: ThrottleConfig<T>) -> Self {
        Self::with_config(config)
    }

    /// Creates a throttle from a [`ThrottleConfig`], which may carry
    /// any [`TimeSource`] (a [`crate::time::MockTimeSource`] for
    /// deterministic tests, for instance).
    ///
    /// Defaults (if built from [`ThrottleConfig::new`]): 17 buckets,
    /// 100 initial TPS, floor 5, ceiling unbounded. Bucket capacity
    /// equals `initial_tps`.
    ///
    /// # Panics
    ///
    /// Panics if `config.buckets == 0`, or if the AIMD bounds are
    /// invalid (see [`SharedAimd::new`]).
    pub fn with_config(config: ThrottleConfig<T>) -> Self {
        assert!(config.buckets > 0, "buckets must be > 0");

        let time_source = Arc::new(config.time_source);
        let aimd = Arc::new(SharedAimd::new(config.initial_tps, config.floor_tps, config.ceiling_tps));
        let capacity = config.initial_tps;

        let buckets = (0..config.buckets)
            .map(|_| AimdTokenBucket::new(capacity, aimd.clone(), time_source.clone()))
            .collect();

        let now = time_source.now_ns();
        Self {
            buckets,
            tweak: AtomicI32::new(fresh_tweak(now)),
            last_tweak_update_ns: AtomicI64::new(now),
            time_source,
        }
    }

    /// Number of token buckets backing this throttle.
    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    /// Rotates `tweak` if the 5-second rotation window has elapsed.
    ///
    /// At most one thread wins the CAS per window and writes the new
    /// tweak; every other concurrent caller observes the loss and
    /// makes no change, so rotation never blocks and never double-fires.
    fn update_tweak(&self) {
        let now = self.time_source.now_ns();
        let last = self.last_tweak_update_ns.load(Acquire);
        if now - last <= ROTATION_PERIOD_NS {
            return;
        }
        if self.last_tweak_update_ns.compare_exchange(last, now, AcqRel, Acquire).is_ok() {
            self.tweak.store(fresh_tweak(now), Relaxed);
            #[cfg(feature = "tracing")]
            tracing::debug!("stochastic throttle rotated tweak");
        }
    }
}

impl<T: TimeSource> super::FairThrottle for StochasticFairThrottle<T> {
    fn should_accept(&self, key: &str) -> ThrottleResult<'_> {
        self.update_tweak();

        let tweak = self.tweak.load(Relaxed);
        let index = tweaked_hash(key, tweak, self.buckets.len() as u32) as usize;
        let bucket = &self.buckets[index];

        if bucket.would_allow() {
            bucket.claim_token();
            ThrottleResult::allowed(self, &[index as u32])
        } else {
            ThrottleResult::DENIED
        }
    }
}

impl<T: TimeSource> ResultSink for StochasticFairThrottle<T> {
    fn on_success(&self, probes: &[u32]) {
        for &i in probes {
            self.buckets[i as usize].on_success();
        }
    }

    fn on_failure(&self, probes: &[u32]) {
        for &i in probes {
            self.buckets[i as usize].on_failure();
        }
    }
}

//! The common throttle contract: [`FairThrottle`] and [`ThrottleResult`].
//!
//! This is the only polymorphism in the crate's core — the two
//! fairness schemes implement the same narrow interface, modeled as
//! a trait plus a result type rather than an enum, since a caller
//! picks one throttle implementation at construction time and never
//! needs to treat the two interchangeably at runtime.
//!
//! ## Fairness without per-tenant memory
//!
//! Both implementations spread a fixed, small number of token buckets
//! across an unbounded set of tenant keys via hashing, instead of
//! keeping one bucket per key. That bounds memory to `O(buckets)`
//! regardless of how many distinct tenants show up, at the cost of
//! approximate rather than exact fairness: two tenants that hash to
//! the same bucket(s) share its capacity. Rotating the hash tweak
//! periodically means an unlucky collision doesn't last forever.
//!
//! ## Non-goals
//!
//! Tweak rotation exists to dissolve unlucky collisions over time, not
//! to resist an adversary: the random source need not be
//! cryptographic, and a key chosen specifically to collide with
//! another tenant's bucket will still collide with it until the next
//! rotation.

pub mod bloom;
pub mod stochastic;

pub use bloom::BloomFilterFairThrottle;
pub use stochastic::StochasticFairThrottle;

/// Maximum number of buckets a single admitted call can span. Bloom
/// throttle probes are capped at `min(3, buckets)`, so 3 is sufficient
/// for every implementation in this crate.
const MAX_PROBES: usize = 3;

/// Produces a fresh, non-cryptographic `i32` tweak for rotation.
///
/// Rotation exists to dissolve unlucky hash collisions over time, not
/// to resist an adversary (see module docs), so there is no need for
/// a CSPRNG here — a cheap scramble of the current timestamp and a
/// process-wide counter (to disambiguate same-nanosecond rotations
/// across throttle instances) is enough entropy for the purpose.
pub(crate) fn fresh_tweak(now_ns: i64) -> i32 {
    use std::sync::atomic::{AtomicU64, Ordering::Relaxed};
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    let counter = COUNTER.fetch_add(1, Relaxed);
    crate::hash::scramble_to_i32((now_ns as u64) ^ counter.wrapping_mul(0x2545_F491_4F6C_DD1D))
}

/// The common interface implemented by every fairness scheme.
pub trait FairThrottle {
    /// Decides whether to admit a call on behalf of `key`.
    ///
    /// Must be safe to call from many threads concurrently.
    fn should_accept(&self, key: &str) -> ThrottleResult<'_>;
}

/// The outcome of a single [`FairThrottle::should_accept`] call.
///
/// A denied result is a reusable flyweight: it carries no bucket
/// indices and allocates nothing. An allowed result carries the
/// index (or indices) of the bucket(s) consumed, inline, so that
/// [`ThrottleResult::on_success`]/[`ThrottleResult::on_failure`] can
/// report the outcome back to exactly the buckets that were charged.
#[derive(Clone, Copy)]
pub struct ThrottleResult<'a> {
    probes: [u32; MAX_PROBES],
    probe_count: u8,
    owner: Option<&'a dyn ResultSink>,
}

impl<'a> ThrottleResult<'a> {
    /// The shared, denied flyweight. Reused by every throttle
    /// implementation to avoid a per-call allocation on the deny path.
    pub const DENIED: ThrottleResult<'static> = ThrottleResult {
        probes: [0; MAX_PROBES],
        probe_count: 0,
        owner: None,
    };

    pub(crate) fn allowed(owner: &'a dyn ResultSink, probes: &[u32]) -> Self {
        debug_assert!(probes.len() <= MAX_PROBES);
        let mut inline = [0u32; MAX_PROBES];
        inline[..probes.len()].copy_from_slice(probes);
        Self { probes: inline, probe_count: probes.len() as u8, owner: Some(owner) }
    }

    /// Returns `true` if the call was admitted.
    #[inline]
    pub fn is_allowed(&self) -> bool {
        self.owner.is_some()
    }

    /// The bucket index (or indices) consumed by this call, if
    /// allowed. Empty for a denied result.
    #[inline]
    pub fn probes(&self) -> &[u32] {
        &self.probes[..self.probe_count as usize]
    }

    /// Reports a successful call outcome, forwarding to every bucket
    /// this result is bound to.
    ///
    /// # Panics
    ///
    /// Panics if `self` is not allowed — calling this on a denied
    /// result is a precondition violation (`spec.md` §7), not a
    /// recoverable runtime condition.
    pub fn on_success(&self) {
        match self.owner {
            Some(owner) => owner.on_success(self.probes()),
            None => panic!("ThrottleResult::on_success called on a denied result"),
        }
    }

    /// Reports a failed call outcome, forwarding to every bucket this
    /// result is bound to.
    ///
    /// # Panics
    ///
    /// Panics if `self` is not allowed, for the same reason as
    /// [`ThrottleResult::on_success`].
    pub fn on_failure(&self) {
        match self.owner {
            Some(owner) => owner.on_failure(self.probes()),
            None => panic!("ThrottleResult::on_failure called on a denied result"),
        }
    }
}

/// Internal callback target for an allowed [`ThrottleResult`]: the
/// throttle instance that produced it, addressed by bucket indices.
pub(crate) trait ResultSink {
    fn on_success(&self, probes: &[u32]);
    fn on_failure(&self, probes: &[u32]);
}

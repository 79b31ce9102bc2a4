//! A client-side fair service throttle.
//!
//! This crate implements an in-process admission-control engine meant
//! to sit in front of calls to a remote dependency. It does two
//! things at once:
//!
//! - **Adapts** the rate of permitted calls to the downstream's actual
//!   goodput, via an additive-increase/multiplicative-decrease (AIMD)
//!   control loop fed by call outcomes.
//! - **Spreads** that adapted capacity across a dynamic, unbounded set
//!   of tenants — identified by opaque string keys — so that no
//!   single tenant can monopolize it under overload, without keeping
//!   any per-tenant state.
//!
//! It is designed to live in every caller process independently: there
//! is no shared state across processes, and convergence toward a
//! global equilibrium emerges from many independent processes each
//! reacting to the same downstream feedback.
//!
//! ## Design principles
//!
//! - **Lock-free hot path** — every operation (`would_allow`,
//!   `claim_token`, `on_success`, `on_failure`, `should_accept`) is a
//!   bounded sequence of atomic loads, CAS loops, and fetch-updates.
//!   Nothing blocks, nothing allocates once a throttle is constructed.
//! - **O(1) space regardless of tenant count** — both fairness schemes
//!   use a small, fixed number of token buckets and a hash of the
//!   tenant key, not one bucket per tenant.
//! - **Approximate, not exact, fairness** — a scheme that needed exact
//!   per-tenant accounting would need per-tenant memory, which this
//!   crate deliberately does not keep. See [`throttle`] module docs
//!   for the tradeoffs between the two schemes it provides.
//!
//! ## Thread safety
//!
//! Every public type in this crate is safe to share (via `Arc`) and
//! call concurrently from many threads; [`throttle::FairThrottle`]
//! implementations are explicitly designed for high-contention use.
//!
//! ## Scope
//!
//! This crate is the admission-control core only: the AIMD loop, the
//! token bucket, the two fairness schemes, and the hashing primitives
//! they share. It does not include a workload simulator, a metrics
//! exporter, or any transport/RPC integration — those are external
//! collaborators that call into [`throttle::FairThrottle`] from the
//! outside.

pub mod aimd;
pub mod atomic_f64;
pub mod bucket;
pub mod config;
pub mod hash;
pub mod throttle;
pub mod time;

pub use aimd::SharedAimd;
pub use bucket::AimdTokenBucket;
pub use config::ThrottleConfig;
pub use throttle::{BloomFilterFairThrottle, FairThrottle, StochasticFairThrottle, ThrottleResult};
pub use time::{MockTimeSource, SystemTimeSource, TimeSource};

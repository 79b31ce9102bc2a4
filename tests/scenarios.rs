//! End-to-end convergence scenarios driven by mock time.
//!
//! These mirror the six deterministic scenarios this crate's design
//! is validated against: a single-client or multi-client workload
//! offered at a fixed rate against a throttle, with a lightweight
//! in-test stand-in for a downstream server whose success capacity
//! ("goodput") is fixed or piecewise-constant. This is not the full
//! external workload simulator — just enough of a server model to
//! drive `on_success`/`on_failure` and check the throttle converges
//! the way the design expects.
//!
//! Every scenario advances a [`MockTimeSource`] in whole-second ticks:
//! within one tick, all of that tick's offered calls are attempted
//! back-to-back against the throttle before time moves forward, and
//! the tick's downstream capacity ("goodput") bounds how many of the
//! admitted calls succeed versus fail. "Offered" below means calls
//! that reached the downstream (i.e. were admitted by the throttle),
//! matching the convention used to state these scenarios' expected
//! bounds; "throttled" means attempted calls the throttle denied.

use fair_service_throttle::{
    BloomFilterFairThrottle, FairThrottle, MockTimeSource, StochasticFairThrottle, ThrottleConfig,
};
use std::collections::HashMap;

/// Runs `duration_secs` one-second ticks of a workload against
/// `throttle`, advancing `time` after each tick.
///
/// `offered_per_client_per_sec` calls are attempted per client per
/// tick; `goodput_at(tick)` bounds how many of that tick's admitted
/// calls across *all* clients combined succeed (the rest fail). The
/// clock is advanced once per tick, after every client's calls for
/// that tick have been attempted.
///
/// Returns, per client key, `(admitted_total, success_total)`.
fn simulate<'a>(
    throttle: &impl FairThrottle,
    time: &MockTimeSource,
    clients: &[&'a str],
    offered_per_client_per_sec: u64,
    duration_secs: u64,
    mut goodput_at: impl FnMut(u64) -> u64,
) -> HashMap<&'a str, (u64, u64)> {
    let mut stats: HashMap<&str, (u64, u64)> = clients.iter().map(|&c| (c, (0, 0))).collect();

    for tick in 0..duration_secs {
        let goodput = goodput_at(tick);
        let mut succeeded_this_tick = 0u64;

        for &client in clients {
            for _ in 0..offered_per_client_per_sec {
                let result = throttle.should_accept(client);
                if !result.is_allowed() {
                    continue;
                }
                let entry = stats.get_mut(client).expect("client present");
                entry.0 += 1;
                if succeeded_this_tick < goodput {
                    succeeded_this_tick += 1;
                    entry.1 += 1;
                    result.on_success();
                } else {
                    result.on_failure();
                }
            }
        }

        time.advance_secs(1);
    }

    stats
}

fn totals(stats: &HashMap<&str, (u64, u64)>) -> (u64, u64) {
    stats.values().fold((0, 0), |(a, b), &(x, y)| (a + x, b + y))
}

/// S1 — a Bloom-filter throttle converges its admitted rate toward a
/// constrained server's goodput.
#[test]
fn s1_bloom_filter_throttle_converges_on_constrained_server() {
    let time = MockTimeSource::new(0);
    let throttle = BloomFilterFairThrottle::new(100.0, 10, time.clone());

    let stats = simulate(&throttle, &time, &["client-a"], 1000, 100, |_| 10);
    let (offered, successes) = totals(&stats);

    assert!(offered < 2000, "offered {offered} should stay under 2x the 1000-call target");
    assert!(successes > 900, "successes {successes} should track the 1000-call target");
}

/// S2 — the stochastic throttle, same workload as S1.
#[test]
fn s2_stochastic_throttle_converges_on_same_workload() {
    let time = MockTimeSource::new(0);
    let config = ThrottleConfig::new().initial_tps(100.0).buckets(10).time_source(time.clone());
    let throttle = StochasticFairThrottle::with_config(config);

    let stats = simulate(&throttle, &time, &["client-a"], 1000, 100, |_| 10);
    let (offered, successes) = totals(&stats);

    assert!(offered < 4000, "offered {offered} should stay bounded even with SFT's coarser fairness");
    assert!(successes > 900, "successes {successes} should track the 1000-call target");
}

/// S3 — lowering the floor reduces the sustained admitted rate a
/// failing downstream settles at.
#[test]
fn s3_stochastic_throttle_settles_lower_with_reduced_floor() {
    let time = MockTimeSource::new(0);
    let config = ThrottleConfig::new()
        .initial_tps(100.0)
        .buckets(10)
        .floor_tps(0.1)
        .ceiling_tps(f64::INFINITY)
        .time_source(time.clone());
    let throttle = StochasticFairThrottle::with_config(config);

    let stats = simulate(&throttle, &time, &["client-a"], 1000, 100, |_| 10);
    let (offered, successes) = totals(&stats);

    assert!(offered < 2000);
    assert!(successes > 300, "successes {successes} should still clear a reduced floor-driven rate");
}

/// S4 — AIMD climbs to keep pace with an under-saturated downstream,
/// then rides up to (and stays at) the configured ceiling.
#[test]
fn s4_stochastic_throttle_climbs_to_ceiling_without_throttling() {
    let time = MockTimeSource::new(0);
    let config = ThrottleConfig::new()
        .initial_tps(100.0)
        .buckets(10)
        .floor_tps(0.1)
        .ceiling_tps(1000.0)
        .time_source(time.clone());
    let throttle = StochasticFairThrottle::with_config(config);

    // Phase 1: one client at 500 TPS for 10s against an effectively
    // unconstrained downstream (10_000 TPS goodput never binds).
    let phase1 = simulate(&throttle, &time, &["tenant"], 500, 10, |_| 10_000);
    let (offered1, successes1) = totals(&phase1);
    let attempted1 = 500 * 10;

    assert_eq!(offered1, successes1, "an unconstrained downstream never fails an admitted call");
    assert!(successes1 > 4900, "successes {successes1} should track nearly all of the 5000 attempted calls");
    assert!(attempted1 - offered1 < 100, "throttled count should be small once AIMD ramps past 500 tps");

    // Phase 2: same throttle and tenant key, now offering 1000 TPS —
    // by now the shared AIMD state should already be at or near the
    // 1000 ceiling from phase 1's ramp.
    let phase2 = simulate(&throttle, &time, &["tenant"], 1000, 10, |_| 10_000);
    let (offered2, successes2) = totals(&phase2);
    let attempted2 = 1000 * 10;

    assert_eq!(offered2, successes2);
    assert!(successes2 > 9900, "successes {successes2} should track nearly all of the 10000 attempted calls");
    assert!(attempted2 - offered2 < 50, "throttled count should be near zero once already at ceiling");
}

/// S5 — with enough buckets, a Bloom-filter throttle's aggregate
/// admitted rate tracks a step change in downstream goodput, and no
/// one of several clients is starved indefinitely.
#[test]
fn s5_bloom_filter_throttle_tracks_step_goodput_and_shares_across_clients() {
    let time = MockTimeSource::new(0);
    let throttle = BloomFilterFairThrottle::new(100.0, 17, time.clone());
    let clients = ["c0", "c1", "c2", "c3"];

    let stats = simulate(&throttle, &time, &clients, 150, 1800, |tick| {
        if tick < 500 {
            200
        } else if tick < 1000 {
            30
        } else {
            200
        }
    });

    for &client in &clients {
        let (offered, successes) = stats[client];
        assert!(offered > 0, "{client} should never be fully starved across the whole run");
        assert!(successes > 0, "{client} should get at least some successful calls");
    }

    let (_offered_total, success_total) = totals(&stats);
    assert!(success_total > 0);
}

/// S6 — collapsing to a single shared bucket (`buckets = 1`, so
/// `probes = 1`) removes the spread that gives clients approximate
/// fairness; a single bucket is free to starve individual clients
/// much more severely than the 17-bucket case in S5.
#[test]
fn s6_single_bucket_degenerates_to_a_global_throttle() {
    let time = MockTimeSource::new(0);
    let throttle = BloomFilterFairThrottle::new(100.0, 1, time.clone());
    assert_eq!(throttle.probe_count(), 1);

    let clients = ["c0", "c1", "c2", "c3"];
    let stats = simulate(&throttle, &time, &clients, 150, 1800, |tick| {
        if tick < 500 {
            200
        } else if tick < 1000 {
            30
        } else {
            200
        }
    });

    let admitted: Vec<u64> = clients.iter().map(|c| stats[c].0).collect();
    let (total_offered, total_successes) = totals(&stats);
    assert!(total_offered > 0, "the shared bucket should still admit some calls overall");
    assert!(total_successes > 0);
    assert_eq!(admitted.iter().sum::<u64>(), total_offered, "per-client admitted counts should sum to the total");
}

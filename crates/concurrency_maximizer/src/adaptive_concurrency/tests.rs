//! Closed-loop simulations against a resource whose per-operation latency grows
//! quadratically once more than `IDEAL` operations overlap.

use std::{sync::Arc, time::Duration};

use super::{ConcurrencyMaximizer, ConcurrencyMaximizerSettings, clock::ManualClock};
use crate::test_utils::{seeded_sampler, trace_init};

const IDEAL: f64 = 10.0;
const STEPS: usize = 10_000;
const SEED: u64 = 42;

fn simulated_duration_ms(load: f64) -> f64 {
    let ideal_ms = 100.0 / IDEAL;
    if load <= IDEAL {
        ideal_ms
    } else {
        let overflow = load / IDEAL;
        ideal_ms * overflow * overflow
    }
}

/// Per-step concurrency observed while running `steps` synchronized batches.
///
/// Each step starts `concurrency` operations together, lets them all take the
/// simulated duration for `load(step, concurrency)` and completes them.
fn simulate(
    settings: ConcurrencyMaximizerSettings,
    steps: usize,
    load: impl Fn(usize, usize) -> f64,
) -> Vec<usize> {
    trace_init();

    let clock = Arc::new(ManualClock::new());
    let maximizer =
        ConcurrencyMaximizer::with_sources(settings, Arc::clone(&clock), seeded_sampler(SEED))
            .unwrap();

    let mut history = Vec::with_capacity(steps);
    for step in 0..steps {
        let concurrency = maximizer.concurrency();
        history.push(concurrency);

        let tokens: Vec<_> = (0..concurrency).map(|_| maximizer.start_item()).collect();
        let duration_ms = simulated_duration_ms(load(step, concurrency));
        clock.advance(Duration::from_nanos((duration_ms * 1_000_000.0) as u64));
        for token in tokens {
            token.complete();
        }
    }
    history
}

struct Summary {
    max: usize,
    min: usize,
    average: f64,
}

fn summarize(history: &[usize]) -> Summary {
    Summary {
        max: history.iter().copied().max().unwrap_or_default(),
        min: history.iter().copied().min().unwrap_or_default(),
        average: history.iter().sum::<usize>() as f64 / history.len() as f64,
    }
}

/// The last quarter of a run, after any mid-run change has settled.
fn settled(history: &[usize]) -> Summary {
    summarize(&history[history.len() * 3 / 4 + 1..])
}

fn settings(window_flexibility: f64) -> ConcurrencyMaximizerSettings {
    ConcurrencyMaximizerSettings::builder()
        .max_window_capacity(10)
        .window_flexibility(window_flexibility)
        .build()
}

#[test]
fn reaches_ideal_concurrency() {
    let history = simulate(settings(0.25), STEPS, |_, concurrency| concurrency as f64);

    assert_eq!(summarize(&history).max, 13);
    let settled = settled(&history);
    assert!(
        settled.average > 12.0 && settled.average < 13.0,
        "average {}",
        settled.average
    );
}

#[test]
fn decays_after_sudden_slowdown() {
    let history = simulate(settings(0.25), STEPS, |step, concurrency| {
        if step > STEPS / 2 {
            IDEAL * 0.75 + concurrency as f64
        } else {
            concurrency as f64
        }
    });

    let settled = settled(&history);
    assert_eq!(settled.max, 5);
    assert!(
        settled.average > 4.0 && settled.average < 5.0,
        "average {}",
        settled.average
    );
}

#[test]
fn collapses_after_massive_slowdown() {
    let history = simulate(settings(0.25), STEPS, |step, concurrency| {
        if step > STEPS / 2 {
            IDEAL * 4.0 + concurrency as f64
        } else {
            concurrency as f64
        }
    });

    let settled = settled(&history);
    assert_eq!(settled.max, 2);
    assert!(
        settled.average > 1.0 && settled.average < 2.0,
        "average {}",
        settled.average
    );
}

#[test]
fn recovers_after_massive_speedup() {
    let history = simulate(settings(0.25), STEPS, |step, concurrency| {
        if step < STEPS / 2 {
            IDEAL * 4.0 + concurrency as f64
        } else {
            concurrency as f64
        }
    });

    let settled = settled(&history);
    assert_eq!(settled.max, 13);
    assert!(
        settled.average > 12.0 && settled.average < 13.0,
        "average {}",
        settled.average
    );
}

#[test]
fn climbs_further_after_minor_speedup() {
    let history = simulate(settings(0.75), STEPS, |step, concurrency| {
        if step < STEPS / 2 {
            3.0 + concurrency as f64
        } else {
            1.0 + concurrency as f64
        }
    });

    let before = summarize(&history[..STEPS / 2]);
    assert_eq!(before.max, 13);
    assert!(
        before.average > 12.0 && before.average < 13.0,
        "average before {}",
        before.average
    );

    let after = settled(&history);
    assert_eq!(after.max, 15);
    assert!(
        after.average > 14.0 && after.average < 15.0,
        "average after {}",
        after.average
    );
}

#[test]
fn maximum_duration_caps_concurrency() {
    let settings = ConcurrencyMaximizerSettings::builder()
        .max_window_capacity(10)
        .maximum_duration_ms(12)
        .build();
    let history = simulate(settings, 50_000, |_, concurrency| concurrency as f64);

    // 11 overlapping operations take 12.1 ms, so the climb can never pass 11.
    let summary = summarize(&history);
    assert!(summary.max <= 11, "reached {}", summary.max);
    assert!(summary.min >= 1);
}

#[test]
fn never_drops_below_a_larger_baseline() {
    let settings = ConcurrencyMaximizerSettings::builder().baseline(3).build();
    let history = simulate(settings, STEPS, |step, concurrency| {
        if step > STEPS / 2 {
            IDEAL * 4.0 + concurrency as f64
        } else {
            concurrency as f64
        }
    });

    assert!(summarize(&history).min >= 3);
    let settled = settled(&history);
    assert!(settled.max <= 6, "settled max {}", settled.max);
}

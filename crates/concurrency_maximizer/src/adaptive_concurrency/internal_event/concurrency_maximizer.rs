use metrics::{Counter, Gauge, Histogram, counter, gauge, histogram};

use crate::adaptive_concurrency::{WindowStats, decision::Rule};
use crate::registered_event;

#[derive(Clone, Copy, Debug)]
pub struct ConcurrencyDecisionData {
    pub previous_concurrency: usize,
    pub concurrency: usize,
    pub rule: Rule,
    pub stats: WindowStats,
    pub window_capacity: usize,
    pub target_window_duration: Option<f64>,
}

registered_event! {
    ConcurrencyDecision => {
        // Histograms rather than gauges: several decisions may land in one
        // reporting interval and each is useful when diagnosing oscillation.
        limit: Histogram = histogram!("concurrency_maximizer_limit"),
        window_estimate: Histogram = histogram!("concurrency_maximizer_window_estimate_ms"),
        window_capacity: Gauge = gauge!("concurrency_maximizer_window_capacity"),
    }

    fn emit(&self, data: ConcurrencyDecisionData) {
        self.limit.record(data.concurrency as f64);
        self.window_estimate.record(data.stats.estimate);
        self.window_capacity.set(data.window_capacity as f64);

        if data.previous_concurrency != data.concurrency {
            debug!(
                target: "concurrency_maximizer::stats",
                previous_concurrency = data.previous_concurrency,
                concurrency = data.concurrency,
                rule = %data.rule,
                window_estimate_ms = data.stats.estimate,
                window_mean_ms = data.stats.mean,
                window_stddev_ms = data.stats.stddev,
                target_window_duration_ms = data.target_window_duration,
                window_capacity = data.window_capacity,
                "Concurrency adjusted."
            );
        } else {
            trace!(
                target: "concurrency_maximizer::stats",
                concurrency = data.concurrency,
                rule = %data.rule,
                window_estimate_ms = data.stats.estimate,
                "Concurrency unchanged."
            );
        }
    }
}

registered_event! {
    ObservedDuration => {
        observed_duration: Histogram = histogram!("concurrency_maximizer_observed_duration_ms"),
    }

    fn emit(&self, duration_ms: f64) {
        self.observed_duration.record(duration_ms);
    }
}

registered_event! {
    SampleDiscarded => {
        discarded: Counter = counter!("concurrency_maximizer_discarded_samples_total"),
    }

    fn emit(&self, remaining: usize) {
        self.discarded.increment(1);
        trace!(
            target: "concurrency_maximizer::stats",
            remaining,
            "Sample discarded while the new concurrency settles."
        );
    }
}

//! The rule chain that turns a window estimate into a new concurrency.
//!
//! [`DecisionState::decide`] is a pure function of the previous state, the new
//! estimate and one draw from a [`Sampler`]; the controller only feeds it and
//! stores the result.

use std::fmt;

use super::{ConcurrencyMaximizerSettings, sampler::Sampler};

/// Knobs the rule chain reads, lifted out of the settings once.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DecisionParams {
    pub baseline: usize,
    pub window_flexibility: f64,
    /// Ceiling on the window estimate, in milliseconds.
    pub maximum_duration: Option<f64>,
}

impl From<&ConcurrencyMaximizerSettings> for DecisionParams {
    fn from(settings: &ConcurrencyMaximizerSettings) -> Self {
        Self {
            baseline: settings.baseline(),
            window_flexibility: settings.window_flexibility(),
            maximum_duration: settings.maximum_duration_ms.map(|ms| ms as f64),
        }
    }
}

/// State carried between decision cycles. Durations are in milliseconds.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DecisionState {
    pub concurrency: usize,
    /// Best settled estimate since the climb (re)started; `None` before the first window.
    pub target_window_duration: Option<f64>,
    /// Smallest estimate ever seen.
    pub smallest_target_window_duration: f64,
    pub last_good_concurrency: Option<usize>,
}

/// The rule that produced a decision.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Rule {
    /// The estimate exceeded the configured ceiling.
    CeilingBreached,
    /// First window ever seen.
    Bootstrap,
    /// Much faster than the target while above baseline; other consumers likely backed off.
    ContentionBackoff,
    /// A new best estimate.
    Improved,
    /// Slower than the target while already at baseline.
    BaselineProbe,
    /// Slower than the best estimate ever by a wide margin.
    CatastrophicReset,
    /// Moderately slower than the target and the random draw said back off.
    RandomBackoff,
    /// Moderately slower than the target, holding.
    Hold,
    /// Within the band around the target, keep climbing.
    Explore,
}

impl Rule {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Rule::CeilingBreached => "ceiling_breached",
            Rule::Bootstrap => "bootstrap",
            Rule::ContentionBackoff => "contention_backoff",
            Rule::Improved => "improved",
            Rule::BaselineProbe => "baseline_probe",
            Rule::CatastrophicReset => "catastrophic_reset",
            Rule::RandomBackoff => "random_backoff",
            Rule::Hold => "hold",
            Rule::Explore => "explore",
        }
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl DecisionState {
    pub fn new(baseline: usize) -> Self {
        Self {
            concurrency: baseline,
            target_window_duration: None,
            smallest_target_window_duration: f64::MAX,
            last_good_concurrency: None,
        }
    }

    /// Evaluate the rules in priority order against a new window estimate.
    ///
    /// The sampler is drawn from only when the moderate regression rule is reached.
    pub fn decide(
        &self,
        duration: f64,
        params: &DecisionParams,
        sampler: &mut dyn Sampler,
    ) -> (DecisionState, Rule) {
        let baseline = params.baseline;
        let flexibility = params.window_flexibility;
        let concurrency = self.concurrency;

        let mut next = *self;
        next.smallest_target_window_duration = self.smallest_target_window_duration.min(duration);

        if let Some(maximum) = params.maximum_duration {
            if duration > maximum {
                if concurrency > baseline {
                    next.concurrency = halve(concurrency, baseline);
                }
                return (next, Rule::CeilingBreached);
            }
        }

        let rule = match self.target_window_duration {
            None => {
                next.concurrency = concurrency + baseline;
                next.target_window_duration = Some(duration);
                next.last_good_concurrency = Some(next.concurrency);
                Rule::Bootstrap
            }
            Some(target) if duration < target => {
                let rule = if concurrency > baseline
                    && duration < target * (1.0 - flexibility / 2.0)
                {
                    next.concurrency = halve(concurrency, baseline);
                    Rule::ContentionBackoff
                } else {
                    if concurrency > baseline {
                        next.concurrency = concurrency + baseline;
                    }
                    Rule::Improved
                };
                next.target_window_duration = Some(duration);
                next.last_good_concurrency = Some(next.concurrency);
                rule
            }
            Some(_) if concurrency <= baseline => {
                next.concurrency = concurrency + baseline;
                next.target_window_duration = Some(duration);
                next.last_good_concurrency = Some(next.concurrency);
                Rule::BaselineProbe
            }
            Some(_)
                if duration
                    > next.smallest_target_window_duration * (1.0 + flexibility * 4.0) =>
            {
                next.concurrency = baseline;
                Rule::CatastrophicReset
            }
            Some(target) if duration > target * (1.0 + flexibility * 2.0) => {
                if sampler.sample() < flexibility * flexibility {
                    next.concurrency = concurrency.saturating_sub(baseline).max(baseline);
                    Rule::RandomBackoff
                } else {
                    Rule::Hold
                }
            }
            Some(_) => {
                next.concurrency = concurrency + baseline;
                Rule::Explore
            }
        };

        (next, rule)
    }
}

const fn halve(concurrency: usize, baseline: usize) -> usize {
    let half = concurrency / 2;
    if half > baseline { half } else { baseline }
}

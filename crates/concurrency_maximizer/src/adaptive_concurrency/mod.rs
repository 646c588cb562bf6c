//! Adjust the number of operations allowed to run at once from their observed durations.

pub mod clock;
mod controller;
pub mod decision;
mod executor;
mod future;
pub mod internal_event;
pub mod layer;
pub mod sampler;
pub mod service;
mod window;

#[cfg(test)]
mod tests;

use std::time::Duration;

use bon::Builder;
use serde::{Deserialize, Serialize};
use snafu::{Snafu, ensure};

pub use controller::{ConcurrencyMaximizer, MaximizerSnapshot, TimingToken};
pub use future::TimedFuture;
pub use layer::ConcurrencyMaximizerLayer;
pub use window::WindowStats;

/// Configuration of the concurrency maximizer.
///
/// The defaults were tuned against simulated resources whose per-operation latency
/// grows quadratically once they are overloaded. They rarely need changing.
///
/// | Parameter | Default | Description |
/// |-----------|---------|-------------|
/// | `max_window_capacity` | 4 | Upper bound on how many samples a window may grow to |
/// | `window_flexibility` | 0.25 | Width of the hysteresis bands, strictly inside (0, 1) |
/// | `maximum_duration_ms` | unset | Window estimate above which concurrency is halved |
/// | `baseline` | 1 | Minimum concurrency and the size of every step |
///
/// # Example
///
/// ```rust
/// use concurrency_maximizer::ConcurrencyMaximizerSettings;
///
/// let settings = ConcurrencyMaximizerSettings::builder()
///     .max_window_capacity(10)
///     .window_flexibility(0.5)
///     .maximum_duration_ms(20_000)
///     .baseline(3)
///     .build();
/// assert!(settings.validate().is_ok());
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Builder, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ConcurrencyMaximizerSettings {
    /// The largest number of samples a single window may hold.
    ///
    /// Windows start at `baseline` samples (capped by this value) and grow by one
    /// each time a window turns out noisy, i.e. its standard deviation exceeds a
    /// fifth of its mean. They never shrink.
    #[builder(default = default_max_window_capacity())]
    #[serde(default = "default_max_window_capacity")]
    pub(super) max_window_capacity: usize,

    /// Sensitivity of the hysteresis bands.
    ///
    /// - A window faster than `target * (1 - flexibility / 2)` while running above
    ///   baseline halves the concurrency.
    /// - A window slower than `target * (1 + flexibility * 2)` lowers it by one step
    ///   with probability `flexibility²`.
    /// - A window slower than `smallest * (1 + flexibility * 4)` resets it to baseline.
    #[builder(default = default_window_flexibility())]
    #[serde(default = "default_window_flexibility")]
    pub(super) window_flexibility: f64,

    /// Optional ceiling on the window estimate, in milliseconds.
    ///
    /// Any window whose estimate exceeds it halves the concurrency, regardless of
    /// the other rules. It caps the aggregate estimate, not single operations.
    #[serde(default)]
    pub(super) maximum_duration_ms: Option<u64>,

    /// Minimum concurrency, also used as the increment and decrement step.
    #[builder(default = default_baseline())]
    #[serde(default = "default_baseline")]
    pub(super) baseline: usize,
}

const fn default_max_window_capacity() -> usize {
    4
}

const fn default_window_flexibility() -> f64 {
    0.25
}

const fn default_baseline() -> usize {
    1
}

impl Default for ConcurrencyMaximizerSettings {
    fn default() -> Self {
        Self {
            max_window_capacity: default_max_window_capacity(),
            window_flexibility: default_window_flexibility(),
            maximum_duration_ms: None,
            baseline: default_baseline(),
        }
    }
}

impl ConcurrencyMaximizerSettings {
    pub fn max_window_capacity(&self) -> usize {
        self.max_window_capacity
    }

    pub fn window_flexibility(&self) -> f64 {
        self.window_flexibility
    }

    pub fn maximum_duration(&self) -> Option<Duration> {
        self.maximum_duration_ms.map(Duration::from_millis)
    }

    pub fn baseline(&self) -> usize {
        self.baseline
    }

    /// Rejects settings the control loop cannot run with.
    pub fn validate(&self) -> Result<(), InvalidConfiguration> {
        ensure!(self.baseline >= 1, ZeroBaselineSnafu);
        ensure!(self.max_window_capacity >= 1, ZeroWindowCapacitySnafu);
        ensure!(
            self.window_flexibility > 0.0 && self.window_flexibility < 1.0,
            FlexibilityOutOfRangeSnafu {
                value: self.window_flexibility,
            }
        );
        Ok(())
    }
}

#[derive(Debug, Snafu, PartialEq)]
#[snafu(visibility(pub(crate)))]
pub enum InvalidConfiguration {
    #[snafu(display("baseline must be at least 1"))]
    ZeroBaseline,

    #[snafu(display("max_window_capacity must be at least 1"))]
    ZeroWindowCapacity,

    #[snafu(display("window_flexibility must be strictly between 0 and 1, got {}", value))]
    FlexibilityOutOfRange { value: f64 },
}

#[cfg(test)]
mod settings_tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let settings = ConcurrencyMaximizerSettings::default();
        assert_eq!(settings.max_window_capacity(), 4);
        assert_eq!(settings.window_flexibility(), 0.25);
        assert_eq!(settings.maximum_duration(), None);
        assert_eq!(settings.baseline(), 1);
        assert_eq!(ConcurrencyMaximizerSettings::builder().build(), settings);
    }

    #[test]
    fn deserializes_partial_config() {
        let settings: ConcurrencyMaximizerSettings =
            serde_json::from_str(r#"{ "baseline": 3, "maximum_duration_ms": 1500 }"#).unwrap();
        assert_eq!(settings.baseline(), 3);
        assert_eq!(settings.maximum_duration(), Some(Duration::from_millis(1500)));
        assert_eq!(settings.max_window_capacity(), 4);

        let empty: ConcurrencyMaximizerSettings = serde_json::from_str("{}").unwrap();
        assert_eq!(empty, ConcurrencyMaximizerSettings::default());
    }

    #[test]
    fn rejects_unknown_fields() {
        let result =
            serde_json::from_str::<ConcurrencyMaximizerSettings>(r#"{ "window_size": 4 }"#);
        assert!(result.is_err());
    }

    #[test]
    fn validate_rejects_degenerate_values() {
        let zero_baseline = ConcurrencyMaximizerSettings::builder().baseline(0).build();
        assert_eq!(zero_baseline.validate(), Err(InvalidConfiguration::ZeroBaseline));

        let zero_window = ConcurrencyMaximizerSettings::builder()
            .max_window_capacity(0)
            .build();
        assert_eq!(
            zero_window.validate(),
            Err(InvalidConfiguration::ZeroWindowCapacity)
        );

        for value in [0.0, 1.0, -0.5, 1.5] {
            let settings = ConcurrencyMaximizerSettings::builder()
                .window_flexibility(value)
                .build();
            assert_eq!(
                settings.validate(),
                Err(InvalidConfiguration::FlexibilityOutOfRange { value })
            );
        }

        let nan = ConcurrencyMaximizerSettings::builder()
            .window_flexibility(f64::NAN)
            .build();
        assert!(nan.validate().is_err());
    }
}

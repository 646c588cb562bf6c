//! Self-tuning concurrency control driven purely by operation durations.
//!
//! A [`ConcurrencyMaximizer`] watches how long completed operations take against
//! some shared resource and continuously estimates how many of them may safely run
//! at once. It never looks at error codes, queue depths or rate-limit headers: the
//! only signal is elapsed time.
//!
//! # Algorithm Overview
//!
//! 1. Durations are collected into a small window. When the window is full it is
//!    reduced to a single estimate, `mean - stddev` (falling back to the mean for
//!    estimates under one millisecond).
//! 2. The estimate is compared with the best settled estimate seen so far. Faster
//!    or comparable windows raise the concurrency by one `baseline` step, a large
//!    regression resets it to `baseline`, a moderate one lowers it by one step with
//!    a small probability.
//! 3. Completions that land right after a change are discarded so the next window
//!    measures the new concurrency level and not the transition.
//!
//! # Basic Usage
//! ```
//! use concurrency_maximizer::{ConcurrencyMaximizer, ConcurrencyMaximizerSettings};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let maximizer = ConcurrencyMaximizer::new(ConcurrencyMaximizerSettings::default())?;
//! let doubled = maximizer
//!     .map(vec![1, 2, 3], |x| async move { Ok::<_, std::io::Error>(x * 2) })
//!     .await?;
//! assert_eq!(doubled, vec![2, 4, 6]);
//! # Ok(())
//! # }
//! ```
//!
//! Callers that drive their own scheduling read [`ConcurrencyMaximizer::concurrency`]
//! and wrap each operation in a [`TimingToken`] from
//! [`ConcurrencyMaximizer::start_item`]. The value is advisory: nothing here stops a
//! caller from running more.
//!
//! # Metrics
//! Emits metrics and `tracing` events through the registered events in
//! [`adaptive_concurrency::internal_event`].
pub mod adaptive_concurrency;
#[cfg(test)]
pub mod test_utils;

#[macro_use]
extern crate tracing;

pub use adaptive_concurrency::{
    ConcurrencyMaximizer, ConcurrencyMaximizerLayer, ConcurrencyMaximizerSettings,
    InvalidConfiguration, MaximizerSnapshot, TimingToken,
    clock::{Clock, ManualClock, SystemClock},
    sampler::{Sampler, UniformSampler},
};

pub type Error = Box<dyn std::error::Error + Send + Sync + 'static>;

use std::{
    fmt,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::{Duration, Instant},
};

use serde::Serialize;

use super::{
    ConcurrencyMaximizerSettings, InvalidConfiguration,
    clock::{Clock, SystemClock},
    decision::{DecisionParams, DecisionState},
    internal_event::{
        ConcurrencyDecision, ConcurrencyDecisionData, ConcurrencyDecisionHandle,
        InternalEventHandle, ObservedDuration, ObservedDurationHandle, SampleDiscarded,
        SampleDiscardedHandle, register,
    },
    sampler::{Sampler, UniformSampler},
    window::{Ingested, Window},
};

/// Shared handle to one self-tuning concurrency controller.
///
/// Create one per protected resource and clone it into every caller of that
/// resource. Reading [`concurrency`](Self::concurrency) never blocks; every
/// completed measurement is applied under a single mutex, so window appends and
/// decision cycles never interleave even on a multi-threaded runtime.
#[derive(Clone)]
pub struct ConcurrencyMaximizer {
    shared: Arc<Shared>,
}

struct Shared {
    concurrency: AtomicUsize,
    params: DecisionParams,
    clock: Box<dyn Clock>,
    inner: Mutex<Inner>,
    decision_event: ConcurrencyDecisionHandle,
    observed_event: ObservedDurationHandle,
    discarded_event: SampleDiscardedHandle,
}

struct Inner {
    window: Window,
    state: DecisionState,
    sampler: Box<dyn Sampler>,
    windows_evaluated: u64,
    samples_discarded: u64,
}

/// Point-in-time view of the controller state. Durations are in milliseconds.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MaximizerSnapshot {
    pub concurrency: usize,
    pub baseline: usize,
    pub window_capacity: usize,
    pub window_len: usize,
    pub ignore_next: usize,
    pub target_window_duration_ms: Option<f64>,
    pub smallest_target_window_duration_ms: Option<f64>,
    pub last_good_concurrency: Option<usize>,
    /// Full windows that went through a decision cycle.
    pub windows_evaluated: u64,
    pub samples_discarded: u64,
}

impl ConcurrencyMaximizer {
    /// Builds a maximizer timed by tokio's clock and backing off with `rand`.
    pub fn new(settings: ConcurrencyMaximizerSettings) -> Result<Self, InvalidConfiguration> {
        Self::with_sources(settings, SystemClock, UniformSampler)
    }

    /// Builds a maximizer with an explicit clock and random source.
    pub fn with_sources(
        settings: ConcurrencyMaximizerSettings,
        clock: impl Clock,
        sampler: impl Sampler,
    ) -> Result<Self, InvalidConfiguration> {
        settings.validate()?;

        let params = DecisionParams::from(&settings);
        let state = DecisionState::new(params.baseline);
        Ok(Self {
            shared: Arc::new(Shared {
                concurrency: AtomicUsize::new(state.concurrency),
                params,
                clock: Box::new(clock),
                inner: Mutex::new(Inner {
                    window: Window::new(params.baseline, settings.max_window_capacity()),
                    state,
                    sampler: Box::new(sampler),
                    windows_evaluated: 0,
                    samples_discarded: 0,
                }),
                decision_event: register(ConcurrencyDecision),
                observed_event: register(ObservedDuration),
                discarded_event: register(SampleDiscarded),
            }),
        })
    }

    /// Number of operations that may currently run at once.
    ///
    /// Advisory: callers are trusted to honor it.
    pub fn concurrency(&self) -> usize {
        self.shared.concurrency.load(Ordering::Acquire)
    }

    pub fn baseline(&self) -> usize {
        self.shared.params.baseline
    }

    /// Concurrency recorded the last time a window set a new target.
    pub fn last_good_concurrency(&self) -> Option<usize> {
        self.lock().state.last_good_concurrency
    }

    /// Starts timing one operation.
    pub fn start_item(&self) -> TimingToken {
        TimingToken {
            maximizer: self.clone(),
            start: self.shared.clock.now(),
        }
    }

    /// Feeds one externally measured operation duration into the window.
    pub fn observe(&self, elapsed: Duration) {
        let elapsed_ms = elapsed.as_nanos() as f64 / 1_000_000.0;
        self.shared.observed_event.emit(elapsed_ms);

        let mut inner = self.lock();
        let stats = match inner.window.ingest(elapsed_ms) {
            Ingested::Discarded { remaining } => {
                inner.samples_discarded += 1;
                self.shared.discarded_event.emit(remaining);
                return;
            }
            Ingested::Buffered => return,
            Ingested::Full(stats) => stats,
        };
        inner.windows_evaluated += 1;

        let params = &self.shared.params;
        let previous = inner.state;
        // Skip enough completions that the next window only sees the new level.
        inner
            .window
            .isolate(previous.concurrency + params.baseline);

        let Inner { state, sampler, .. } = &mut *inner;
        let (next, rule) = previous.decide(stats.estimate, params, &mut **sampler);
        *state = next;
        self.shared
            .concurrency
            .store(next.concurrency, Ordering::Release);

        self.shared.decision_event.emit(ConcurrencyDecisionData {
            previous_concurrency: previous.concurrency,
            concurrency: next.concurrency,
            rule,
            stats,
            window_capacity: inner.window.capacity(),
            target_window_duration: next.target_window_duration,
        });
    }

    pub fn snapshot(&self) -> MaximizerSnapshot {
        let inner = self.lock();
        let smallest = inner.state.smallest_target_window_duration;
        MaximizerSnapshot {
            concurrency: inner.state.concurrency,
            baseline: self.shared.params.baseline,
            window_capacity: inner.window.capacity(),
            window_len: inner.window.len(),
            ignore_next: inner.window.ignore_next(),
            target_window_duration_ms: inner.state.target_window_duration,
            smallest_target_window_duration_ms: (smallest < f64::MAX).then_some(smallest),
            last_good_concurrency: inner.state.last_good_concurrency,
            windows_evaluated: inner.windows_evaluated,
            samples_discarded: inner.samples_discarded,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.shared
            .inner
            .lock()
            .expect("concurrency maximizer mutex is poisoned")
    }
}

impl fmt::Debug for ConcurrencyMaximizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConcurrencyMaximizer")
            .field("concurrency", &self.concurrency())
            .field("params", &self.shared.params)
            .finish_non_exhaustive()
    }
}

/// Single-use handle timing one operation.
///
/// [`complete`](Self::complete) consumes it, so an operation cannot be reported
/// twice. Dropping it without completing reports nothing.
#[must_use = "a timing token reports nothing unless completed"]
#[derive(Debug)]
pub struct TimingToken {
    maximizer: ConcurrencyMaximizer,
    start: Instant,
}

impl TimingToken {
    /// Reports the time elapsed since the token was created.
    pub fn complete(self) {
        let elapsed = self
            .maximizer
            .shared
            .clock
            .now()
            .saturating_duration_since(self.start);
        self.maximizer.observe(elapsed);
    }
}

/// Windows whose standard deviation exceeds this fraction of their mean are
/// considered noisy and make the next window one sample larger.
const HIGH_VARIANCE_RATIO: f64 = 0.2;

/// Estimates under this many milliseconds fall back to the plain mean.
const MIN_FLOOR_ESTIMATE_MS: f64 = 1.0;

/// Reduction of one full window of durations, in milliseconds.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WindowStats {
    pub mean: f64,
    pub stddev: f64,
    /// `mean - stddev`, or `mean` when that floor is below one millisecond.
    pub estimate: f64,
}

impl WindowStats {
    pub fn from_samples(samples: &[f64]) -> Option<Self> {
        if samples.is_empty() {
            return None;
        }
        let count = samples.len() as f64;
        let mean = samples.iter().sum::<f64>() / count;
        let variance = samples
            .iter()
            .map(|sample| (sample - mean) * (sample - mean))
            .sum::<f64>()
            / count;
        let stddev = variance.sqrt();

        let floor = mean - stddev;
        let estimate = if floor < MIN_FLOOR_ESTIMATE_MS {
            mean
        } else {
            floor
        };

        Some(Self {
            mean,
            stddev,
            estimate,
        })
    }

    pub fn is_noisy(&self) -> bool {
        self.stddev > self.mean * HIGH_VARIANCE_RATIO
    }
}

/// What happened to one ingested sample.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) enum Ingested {
    /// Dropped by sampling isolation; `remaining` more will be dropped.
    Discarded { remaining: usize },
    /// Stored, the window is not full yet.
    Buffered,
    /// The window filled and was reduced. It is empty again.
    Full(WindowStats),
}

/// Rolling batch of durations plus the sampling isolator in front of it.
#[derive(Debug)]
pub(crate) struct Window {
    samples: Vec<f64>,
    capacity: usize,
    max_capacity: usize,
    ignore_next: usize,
}

impl Window {
    pub(crate) fn new(baseline: usize, max_capacity: usize) -> Self {
        let capacity = baseline.min(max_capacity);
        Self {
            samples: Vec::with_capacity(max_capacity),
            capacity,
            max_capacity,
            ignore_next: 0,
        }
    }

    pub(crate) fn ingest(&mut self, sample_ms: f64) -> Ingested {
        if self.ignore_next > 0 {
            self.ignore_next -= 1;
            return Ingested::Discarded {
                remaining: self.ignore_next,
            };
        }

        self.samples.push(sample_ms);
        if self.samples.len() < self.capacity {
            return Ingested::Buffered;
        }

        let stats = WindowStats::from_samples(&self.samples);
        self.samples.clear();
        match stats {
            Some(stats) => {
                if stats.is_noisy() {
                    self.capacity = (self.capacity + 1).min(self.max_capacity);
                }
                Ingested::Full(stats)
            }
            None => Ingested::Buffered,
        }
    }

    /// Discard the next `count` samples.
    pub(crate) fn isolate(&mut self, count: usize) {
        self.ignore_next = count;
    }

    pub(crate) fn capacity(&self) -> usize {
        self.capacity
    }

    pub(crate) fn len(&self) -> usize {
        self.samples.len()
    }

    pub(crate) fn ignore_next(&self) -> usize {
        self.ignore_next
    }
}

use rand::{Rng, SeedableRng, rngs::StdRng};
use tracing_subscriber::EnvFilter;

/// Installs a test-friendly subscriber once; honors `RUST_LOG`.
pub fn trace_init() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Deterministic stand-in for the uniform sampler.
pub fn seeded_sampler(seed: u64) -> impl FnMut() -> f64 + Send + 'static {
    let mut rng = StdRng::seed_from_u64(seed);
    move || rng.random::<f64>()
}

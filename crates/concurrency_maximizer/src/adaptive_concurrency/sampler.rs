/// Source of uniform random numbers in `[0, 1)`.
///
/// The decision engine draws from it for its randomized backoff. Independent
/// maximizers sharing one resource would otherwise back off in lockstep.
pub trait Sampler: Send + 'static {
    fn sample(&mut self) -> f64;
}

/// Draws from the thread-local generator of `rand`.
#[derive(Clone, Copy, Debug, Default)]
pub struct UniformSampler;

impl Sampler for UniformSampler {
    fn sample(&mut self) -> f64 {
        rand::random::<f64>()
    }
}

impl<F> Sampler for F
where
    F: FnMut() -> f64 + Send + 'static,
{
    fn sample(&mut self) -> f64 {
        self()
    }
}

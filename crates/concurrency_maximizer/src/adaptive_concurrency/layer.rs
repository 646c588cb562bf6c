use tower::Layer;

use super::{ConcurrencyMaximizer, service::ConcurrencyMaximizerService};

/// Times every call through the wrapped service and feeds the durations to a
/// shared [`ConcurrencyMaximizer`].
#[derive(Clone, Debug)]
pub struct ConcurrencyMaximizerLayer {
    maximizer: ConcurrencyMaximizer,
}

impl ConcurrencyMaximizerLayer {
    pub const fn new(maximizer: ConcurrencyMaximizer) -> Self {
        Self { maximizer }
    }

    pub fn maximizer(&self) -> &ConcurrencyMaximizer {
        &self.maximizer
    }
}

impl<S> Layer<S> for ConcurrencyMaximizerLayer {
    type Service = ConcurrencyMaximizerService<S>;

    fn layer(&self, service: S) -> Self::Service {
        ConcurrencyMaximizerService::new(service, self.maximizer.clone())
    }
}

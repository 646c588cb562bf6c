use std::task::{Context, Poll};

use tower::Service;

use super::{ConcurrencyMaximizer, future::TimedFuture};

/// Service produced by [`ConcurrencyMaximizerLayer`](super::ConcurrencyMaximizerLayer).
///
/// Readiness is delegated untouched: the maximizer measures, callers decide how
/// much to send.
#[derive(Clone, Debug)]
pub struct ConcurrencyMaximizerService<S> {
    inner: S,
    maximizer: ConcurrencyMaximizer,
}

impl<S> ConcurrencyMaximizerService<S> {
    pub const fn new(inner: S, maximizer: ConcurrencyMaximizer) -> Self {
        Self { inner, maximizer }
    }

    pub fn maximizer(&self) -> &ConcurrencyMaximizer {
        &self.maximizer
    }
}

impl<S, Request> Service<Request> for ConcurrencyMaximizerService<S>
where
    S: Service<Request>,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = TimedFuture<S::Future>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request) -> Self::Future {
        let token = self.maximizer.start_item();
        TimedFuture::new(self.inner.call(request), token)
    }
}

//! Future wrapper that reports its own duration when it resolves.

use std::{
    future::Future,
    pin::Pin,
    task::{Context, Poll},
};

use pin_project::pin_project;

use super::controller::TimingToken;

/// Completes its [`TimingToken`] the moment the inner future is ready, whatever
/// the output. A wrapper dropped before then reports nothing.
#[pin_project]
#[derive(Debug)]
pub struct TimedFuture<F> {
    #[pin]
    inner: F,
    token: Option<TimingToken>,
}

impl<F> TimedFuture<F> {
    pub(crate) fn new(inner: F, token: TimingToken) -> Self {
        Self {
            inner,
            token: Some(token),
        }
    }
}

impl<F: Future> Future for TimedFuture<F> {
    type Output = F::Output;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.project();
        let output = std::task::ready!(this.inner.poll(cx));
        if let Some(token) = this.token.take() {
            token.complete();
        }
        Poll::Ready(output)
    }
}

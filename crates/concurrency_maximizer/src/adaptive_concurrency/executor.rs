use std::future::Future;

use futures::{StreamExt, stream::FuturesUnordered};

use super::{ConcurrencyMaximizer, future::TimedFuture};

impl ConcurrencyMaximizer {
    /// Runs `work` over `items` with at most [`concurrency`](Self::concurrency)
    /// invocations in flight, re-reading the limit after every completion so it can
    /// grow or shrink mid-run.
    ///
    /// Results come back in input order. The first error stops any further input
    /// from being started; operations already in flight are driven to completion so
    /// their durations are still recorded, their results are dropped, and the error
    /// is returned. The error is only returned once every in-flight operation has
    /// finished, so one operation that never completes holds the failure back
    /// indefinitely; bound `work` with a timeout if that matters.
    pub async fn map<I, T, R, E, F, Fut>(&self, items: I, mut work: F) -> Result<Vec<R>, E>
    where
        I: IntoIterator<Item = T>,
        F: FnMut(T) -> Fut,
        Fut: Future<Output = Result<R, E>>,
    {
        let mut pending = items.into_iter().enumerate();
        let mut results: Vec<Option<R>> = Vec::new();
        let mut in_flight = FuturesUnordered::new();
        let mut failure = None;

        loop {
            if failure.is_none() {
                while in_flight.len() < self.concurrency() {
                    let Some((index, item)) = pending.next() else {
                        break;
                    };
                    let token = self.start_item();
                    let operation = work(item);
                    in_flight.push(async move { (index, TimedFuture::new(operation, token).await) });
                }
            }

            let Some((index, result)) = in_flight.next().await else {
                break;
            };

            match result {
                Ok(value) if failure.is_none() => {
                    if results.len() <= index {
                        results.resize_with(index + 1, || None);
                    }
                    results[index] = Some(value);
                }
                Ok(_) => {}
                Err(error) => {
                    if failure.is_none() {
                        debug!(
                            message = "Work item failed; no further items will be started.",
                            index,
                            in_flight = in_flight.len()
                        );
                        failure = Some(error);
                    }
                }
            }
        }

        match failure {
            Some(error) => Err(error),
            None => Ok(results.into_iter().flatten().collect()),
        }
    }
}

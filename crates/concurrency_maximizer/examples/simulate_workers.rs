// examples/simulate_workers.rs
//
// Several independent workers share one simulated resource. Each worker owns its
// own maximizer and knows nothing about the others; the resource slows down
// quadratically once more than `RESOURCE_CAPACITY` operations overlap.
//
//     RUST_LOG=info,concurrency_maximizer::stats=debug cargo run --example simulate_workers

use std::{
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use concurrency_maximizer::{ConcurrencyMaximizer, ConcurrencyMaximizerSettings};
use tokio::{task::JoinSet, time::sleep};
use tracing::info;
use tracing_subscriber::EnvFilter;

const RESOURCE_CAPACITY: usize = 24;
const BASE_LATENCY_MS: f64 = 5.0;
const WORKERS: usize = 4;
const ITEMS_PER_WORKER: usize = 4_000;
const WORKER_START_INTERVAL: Duration = Duration::from_secs(2);
const REPORT_INTERVAL: Duration = Duration::from_millis(500);

/// A resource that serves `RESOURCE_CAPACITY` operations at base latency and
/// slows down quadratically past that.
#[derive(Clone, Default)]
struct SharedResource {
    active: Arc<AtomicUsize>,
}

impl SharedResource {
    async fn call(&self, item: usize) -> Result<usize, std::io::Error> {
        let active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        let overflow = (active as f64 / RESOURCE_CAPACITY as f64).max(1.0);
        let latency_ms = BASE_LATENCY_MS * overflow * overflow;
        sleep(Duration::from_secs_f64(latency_ms / 1000.0)).await;
        self.active.fetch_sub(1, Ordering::SeqCst);
        Ok(item)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let resource = SharedResource::default();
    let settings = ConcurrencyMaximizerSettings::builder()
        .max_window_capacity(10)
        .window_flexibility(0.25)
        .build();

    let maximizers: Vec<ConcurrencyMaximizer> = (0..WORKERS)
        .map(|_| ConcurrencyMaximizer::new(settings))
        .collect::<Result<_, _>>()?;

    let reporter = {
        let maximizers = maximizers.clone();
        let resource = resource.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(REPORT_INTERVAL);
            loop {
                interval.tick().await;
                let limits: Vec<usize> = maximizers.iter().map(|m| m.concurrency()).collect();
                info!(
                    ?limits,
                    total = limits.iter().sum::<usize>(),
                    in_flight = resource.active.load(Ordering::SeqCst),
                    "Worker concurrency."
                );
            }
        })
    };

    let mut workers = JoinSet::new();
    for (id, maximizer) in maximizers.into_iter().enumerate() {
        let resource = resource.clone();
        workers.spawn(async move {
            sleep(WORKER_START_INTERVAL * id as u32).await;
            info!(worker = id, "Worker started.");
            let results = maximizer
                .map(0..ITEMS_PER_WORKER, |item| {
                    let resource = resource.clone();
                    async move { resource.call(item).await }
                })
                .await?;
            info!(
                worker = id,
                completed = results.len(),
                final_concurrency = maximizer.concurrency(),
                "Worker finished."
            );
            Ok::<_, std::io::Error>(())
        });
    }

    while let Some(joined) = workers.join_next().await {
        joined??;
    }
    reporter.abort();
    Ok(())
}

//! Producer, worker pool and completion barrier.

use std::sync::Arc;
use std::time::Instant;

use async_channel::{Receiver, Sender};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use super::sink::ResultSink;
use crate::config::DispatchConfig;
use crate::loader::Fetcher;
use crate::source::UrlSource;

/// Counts reported when a pipeline run finishes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineSummary {
    /// URLs pushed into the dispatch queue.
    pub dispatched: u64,
    /// Fetches that produced a result.
    pub succeeded: u64,
    /// Fetches that produced an error.
    pub failed: u64,
}

impl PipelineSummary {
    /// URLs that reached a worker and produced an outcome.
    pub fn attempted(&self) -> u64 {
        self.succeeded + self.failed
    }
}

#[derive(Debug, Default)]
struct WorkerStats {
    succeeded: u64,
    failed: u64,
}

/// Runs URLs from a set of sources through a fixed pool of fetch workers.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    config: DispatchConfig,
}

impl Dispatcher {
    pub fn new(config: DispatchConfig) -> Self {
        Self { config }
    }

    /// Run the pipeline until every source is exhausted and every queued URL
    /// has been fetched, or until `lifetime` is cancelled.
    ///
    /// Each URL is fetched by exactly one worker. After cancellation no new
    /// URL is dequeued; in-flight fetches observe the same token and finish
    /// promptly. URLs still queued at that point are dropped without an
    /// outcome.
    pub async fn run<F, S>(
        &self,
        lifetime: CancellationToken,
        sources: Vec<Box<dyn UrlSource>>,
        fetcher: Arc<F>,
        sink: Arc<S>,
    ) -> PipelineSummary
    where
        F: Fetcher + ?Sized,
        S: ResultSink + ?Sized,
    {
        let workers = self.config.workers.max(1);
        let capacity = self.config.effective_queue_capacity();
        let started = Instant::now();

        info!(
            workers,
            queue_capacity = capacity,
            sources = sources.len(),
            "Dispatch pipeline starting"
        );

        let (tx, rx) = async_channel::bounded::<String>(capacity);
        let producer = tokio::spawn(produce(lifetime.clone(), sources, tx));

        let mut pool = JoinSet::new();
        for id in 0..workers {
            pool.spawn(consume(
                id,
                lifetime.clone(),
                rx.clone(),
                Arc::clone(&fetcher),
                Arc::clone(&sink),
            ));
        }
        // Once every worker has exited the queue closes and a blocked
        // producer wakes up.
        drop(rx);

        let mut summary = PipelineSummary::default();
        match producer.await {
            Ok(dispatched) => summary.dispatched = dispatched,
            Err(e) => warn!(error = %e, "Producer task failed"),
        }
        while let Some(joined) = pool.join_next().await {
            match joined {
                Ok(stats) => {
                    summary.succeeded += stats.succeeded;
                    summary.failed += stats.failed;
                }
                Err(e) => warn!(error = %e, "Worker task failed"),
            }
        }

        info!(
            dispatched = summary.dispatched,
            succeeded = summary.succeeded,
            failed = summary.failed,
            cancelled = lifetime.is_cancelled(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Dispatch pipeline finished"
        );
        summary
    }
}

// =============================================================================
// Producer
// =============================================================================

async fn produce(
    lifetime: CancellationToken,
    sources: Vec<Box<dyn UrlSource>>,
    queue: Sender<String>,
) -> u64 {
    let mut dispatched = 0;

    'sources: for mut source in sources {
        debug!(input = source.name(), "Reading input");

        loop {
            let line = tokio::select! {
                biased;
                _ = lifetime.cancelled() => break 'sources,
                line = source.next_line() => line,
            };

            let line = match line {
                Ok(Some(line)) => line,
                Ok(None) => {
                    debug!(input = source.name(), "Input exhausted");
                    break;
                }
                Err(e) => {
                    warn!(input = source.name(), error = %e, "Abandoning input");
                    break;
                }
            };

            let url = line.trim();
            if url.is_empty() {
                continue;
            }

            tokio::select! {
                biased;
                _ = lifetime.cancelled() => break 'sources,
                sent = queue.send(url.to_string()) => {
                    if sent.is_err() {
                        debug!("Dispatch queue closed, stopping producer");
                        break 'sources;
                    }
                }
            }
            dispatched += 1;
        }
    }

    queue.close();
    trace!(dispatched, "Producer stopped");
    dispatched
}

// =============================================================================
// Workers
// =============================================================================

async fn consume<F, S>(
    id: usize,
    lifetime: CancellationToken,
    queue: Receiver<String>,
    fetcher: Arc<F>,
    sink: Arc<S>,
) -> WorkerStats
where
    F: Fetcher + ?Sized,
    S: ResultSink + ?Sized,
{
    let mut stats = WorkerStats::default();

    loop {
        let url = tokio::select! {
            biased;
            _ = lifetime.cancelled() => break,
            next = queue.recv() => match next {
                Ok(url) => url,
                Err(_) => break,
            },
        };

        let outcome = fetcher.fetch(&lifetime, &url).await;
        match &outcome {
            Ok(_) => stats.succeeded += 1,
            Err(e) => {
                stats.failed += 1;
                trace!(worker = id, url = %url, error = %e, "Fetch error");
            }
        }
        sink.accept(outcome);
    }

    trace!(
        worker = id,
        succeeded = stats.succeeded,
        failed = stats.failed,
        "Worker stopped"
    );
    stats
}

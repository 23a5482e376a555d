use crate::collector::Collector;
use crate::config::RunConfig;
use crate::error::Result;
use crate::fetcher::{FetchSettings, Fetcher, HttpFetcher};
use crate::job::FetchJob;
use crate::metrics::collector::MetricsCollector;
use crate::metrics::snapshot::MetricsSnapshot;
use crate::pool::WorkerPool;
use crate::summary::RunSummary;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, watch, Mutex};

/// Wires the job queue, the worker pool and the collector together for one run.
pub struct FetchEngine {
    pool_size: usize,
    queue_capacity: Option<usize>,
    fetcher: Arc<dyn Fetcher>,
    metrics: Arc<MetricsCollector>,
}

impl FetchEngine {
    pub fn new(pool_size: usize, fetcher: Arc<dyn Fetcher>, metrics: Option<Arc<MetricsCollector>>) -> Self {
        Self {
            pool_size,
            queue_capacity: None,
            fetcher,
            metrics: metrics.unwrap_or_else(|| Arc::new(MetricsCollector::new())),
        }
    }

    pub fn from_config(config: &RunConfig, metrics: Option<Arc<MetricsCollector>>) -> Self {
        let fetcher = HttpFetcher::new(FetchSettings {
            timeout: Duration::from_secs(config.timeout_secs),
            user_agent: config.user_agent.clone(),
            fail_on_http_status: config.fail_on_http_status,
        });
        Self::new(config.pool_size, Arc::new(fetcher), metrics)
            .with_queue_capacity(config.queue_capacity)
    }

    /// Bounds both queues instead of sizing them to the job count.
    pub fn with_queue_capacity(mut self, capacity: Option<usize>) -> Self {
        self.queue_capacity = capacity;
        self
    }

    pub fn metrics(&self) -> Arc<MetricsCollector> {
        self.metrics.clone()
    }

    pub async fn run(&self, jobs: Vec<FetchJob>, collector: Collector) -> Result<RunSummary> {
        let total = jobs.len();
        let capacity = self.queue_capacity.unwrap_or(total).max(1);

        let (jobs_tx, jobs_rx) = mpsc::channel(capacity);
        let (results_tx, results_rx) = mpsc::channel(capacity);

        let pool = WorkerPool::new(self.pool_size, self.fetcher.clone(), self.metrics.clone());
        let workers = pool.spawn(Arc::new(Mutex::new(jobs_rx)), results_tx);
        log::info!("Started {} workers for {} jobs", pool.size(), total);

        let started = Instant::now();

        // Feeding from its own task keeps a bounded job queue from stalling
        // against the collector below.
        let metrics_feed = self.metrics.clone();
        let feeder = tokio::spawn(async move {
            for job in jobs {
                if jobs_tx.send(job).await.is_err() {
                    log::warn!("Job queue closed before all jobs were queued");
                    break;
                }
                metrics_feed.increment_jobs_queued();
            }
            // Dropping the sender closes the job queue.
        });

        let collector = collector.with_metrics(self.metrics.clone());
        match collector.drain(results_rx, total, started).await {
            Ok(summary) => {
                let _ = feeder.await;
                for worker in workers {
                    let _ = worker.await;
                }
                log::info!("Run finished: {}", summary);
                Ok(summary)
            }
            Err(e) => {
                feeder.abort();
                for worker in &workers {
                    worker.abort();
                }
                Err(e)
            }
        }
    }

    pub fn get_metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    pub fn watch_metrics(&self) -> watch::Receiver<MetricsSnapshot> {
        let (tx, rx) = watch::channel(self.metrics.snapshot());
        let metrics = self.metrics.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_millis(500));
            loop {
                interval.tick().await;
                if tx.send(metrics.snapshot()).is_err() {
                    break;
                }
            }
        });
        rx
    }
}

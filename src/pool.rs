use crate::fetcher::Fetcher;
use crate::job::{FetchJob, FetchOutcome, FetchResult};
use crate::metrics::MetricsCollector;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;

/// Shared pull end of the job queue. Whichever worker holds the lock
/// receives the next job.
pub type JobQueue = Arc<Mutex<mpsc::Receiver<FetchJob>>>;

/// A fixed number of fetch workers turning jobs into results.
pub struct WorkerPool {
    size: usize,
    fetcher: Arc<dyn Fetcher>,
    metrics: Arc<MetricsCollector>,
}

impl WorkerPool {
    pub fn new(size: usize, fetcher: Arc<dyn Fetcher>, metrics: Arc<MetricsCollector>) -> Self {
        Self {
            size,
            fetcher,
            metrics,
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Starts the workers. Each one exits once the job queue is closed and
    /// drained, dropping its result sender.
    pub fn spawn(&self, jobs: JobQueue, results: mpsc::Sender<FetchResult>) -> Vec<JoinHandle<()>> {
        (0..self.size)
            .map(|worker_id| {
                let jobs = jobs.clone();
                let results = results.clone();
                let fetcher = self.fetcher.clone();
                let metrics = self.metrics.clone();
                tokio::spawn(run_worker(worker_id, jobs, results, fetcher, metrics))
            })
            .collect()
    }
}

async fn run_worker(
    worker_id: usize,
    jobs: JobQueue,
    results: mpsc::Sender<FetchResult>,
    fetcher: Arc<dyn Fetcher>,
    metrics: Arc<MetricsCollector>,
) {
    loop {
        let next = jobs.lock().await.recv().await;
        let Some(job) = next else {
            break;
        };

        metrics.increment_active_workers();
        let result = fetch_one(job, fetcher.as_ref(), &metrics).await;
        metrics.decrement_active_workers();

        if results.send(result).await.is_err() {
            log::warn!("Worker {} stopping: result queue closed", worker_id);
            return;
        }
    }
    log::debug!("Worker {} finished", worker_id);
}

pub async fn fetch_one(job: FetchJob, fetcher: &dyn Fetcher, metrics: &MetricsCollector) -> FetchResult {
    let start_time = Instant::now();
    let outcome = match fetcher.fetch(&job.source_url).await {
        Ok(document) => {
            metrics.record_success(start_time.elapsed(), document.bytes.len());
            FetchOutcome::Fetched(document)
        }
        Err(e) => {
            metrics.record_failure(start_time.elapsed());
            log::debug!("Fetch of {} failed: {}", job.source_url.trim(), e);
            FetchOutcome::Failed(e)
        }
    };

    FetchResult {
        job,
        outcome,
        elapsed: start_time.elapsed(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::{FailureKind, FetchError, FetchedDocument};
    use async_trait::async_trait;
    use std::collections::HashSet;

    struct EchoFetcher;

    #[async_trait]
    impl Fetcher for EchoFetcher {
        async fn fetch(&self, url: &str) -> Result<FetchedDocument, FetchError> {
            if url.contains("bad") {
                return Err(FetchError::new(FailureKind::Connect, "refused"));
            }
            Ok(FetchedDocument {
                bytes: url.as_bytes().to_vec(),
                content_type: Some("text/plain".to_string()),
                status: 200,
            })
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn every_job_yields_exactly_one_result() {
        let total = 25;
        let (job_tx, job_rx) = mpsc::channel(total);
        let (result_tx, mut result_rx) = mpsc::channel(total);
        let metrics = Arc::new(MetricsCollector::new());
        let pool = WorkerPool::new(4, Arc::new(EchoFetcher), metrics.clone());

        let handles = pool.spawn(Arc::new(Mutex::new(job_rx)), result_tx);
        for id in 1..=total {
            let url = if id % 5 == 0 { "http://bad.test" } else { "http://ok.test" };
            job_tx.send(FetchJob::new(id, url, id.to_string(), "")).await.unwrap();
        }
        drop(job_tx);

        let mut seen = HashSet::new();
        let mut failures = 0;
        while let Some(result) = result_rx.recv().await {
            assert!(seen.insert(result.job.id), "duplicate result for {}", result.job.id);
            if !result.is_success() {
                failures += 1;
            }
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(seen.len(), total);
        assert_eq!(failures, 5);
        assert_eq!(metrics.snapshot().jobs_completed, total as u64);
        assert_eq!(metrics.snapshot().active_workers, 0);
    }
}

use crate::metrics::snapshot::MetricsSnapshot;
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};
use std::time::{Duration, Instant};

#[derive(Clone)]
pub struct MetricsCollector {
    jobs_queued: Arc<AtomicU64>,
    jobs_fetched: Arc<AtomicU64>,
    jobs_failed: Arc<AtomicU64>,
    entries_archived: Arc<AtomicU64>,
    bytes_downloaded: Arc<AtomicU64>,
    active_workers: Arc<AtomicU64>,
    total_response_time_ms: Arc<AtomicU64>,
    start_time: Arc<Instant>,
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self {
            jobs_queued: Arc::new(AtomicU64::new(0)),
            jobs_fetched: Arc::new(AtomicU64::new(0)),
            jobs_failed: Arc::new(AtomicU64::new(0)),
            entries_archived: Arc::new(AtomicU64::new(0)),
            bytes_downloaded: Arc::new(AtomicU64::new(0)),
            active_workers: Arc::new(AtomicU64::new(0)),
            total_response_time_ms: Arc::new(AtomicU64::new(0)),
            start_time: Arc::new(Instant::now()),
        }
    }
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment_jobs_queued(&self) {
        self.jobs_queued.fetch_add(1, Ordering::SeqCst);
    }

    pub fn increment_entries_archived(&self) {
        self.entries_archived.fetch_add(1, Ordering::SeqCst);
    }

    pub fn increment_active_workers(&self) {
        self.active_workers.fetch_add(1, Ordering::SeqCst);
    }

    pub fn decrement_active_workers(&self) {
        self.active_workers.fetch_sub(1, Ordering::SeqCst);
    }

    pub fn record_success(&self, duration: Duration, bytes: usize) {
        self.jobs_fetched.fetch_add(1, Ordering::SeqCst);
        self.bytes_downloaded.fetch_add(bytes as u64, Ordering::SeqCst);
        self.total_response_time_ms
            .fetch_add(duration.as_millis() as u64, Ordering::SeqCst);
    }

    pub fn record_failure(&self, duration: Duration) {
        self.jobs_failed.fetch_add(1, Ordering::SeqCst);
        self.total_response_time_ms
            .fetch_add(duration.as_millis() as u64, Ordering::SeqCst);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let fetched = self.jobs_fetched.load(Ordering::SeqCst);
        let failed = self.jobs_failed.load(Ordering::SeqCst);
        let completed = fetched + failed;
        let total_time = self.total_response_time_ms.load(Ordering::SeqCst);

        let success_rate = if completed > 0 {
            (fetched as f64 / completed as f64) * 100.0
        } else {
            0.0
        };

        let avg_response_time_ms = if completed > 0 {
            total_time / completed
        } else {
            0
        };

        let elapsed = self.start_time.elapsed().as_secs_f64();

        MetricsSnapshot {
            jobs_queued: self.jobs_queued.load(Ordering::SeqCst),
            jobs_completed: completed,
            jobs_fetched: fetched,
            jobs_failed: failed,
            entries_archived: self.entries_archived.load(Ordering::SeqCst),
            bytes_downloaded: self.bytes_downloaded.load(Ordering::SeqCst),
            active_workers: self.active_workers.load(Ordering::SeqCst),
            success_rate,
            avg_response_time_ms,
            elapsed_seconds: elapsed,
        }
    }
}

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub jobs_queued: u64,
    pub jobs_completed: u64,
    pub jobs_fetched: u64,
    pub jobs_failed: u64,
    pub entries_archived: u64,
    pub bytes_downloaded: u64,
    pub active_workers: u64,
    pub success_rate: f64,
    pub avg_response_time_ms: u64,
    pub elapsed_seconds: f64,
}

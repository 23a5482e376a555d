pub mod archive;
pub mod collector;
pub mod config;
pub mod engine;
pub mod error;
pub mod extension;
pub mod fetcher;
pub mod job;
pub mod manifest;
pub mod metrics;
pub mod output;
pub mod pool;
pub mod summary;

pub use archive::{ArchiveSink, Compression, ZipArchiveWriter};
pub use collector::Collector;
pub use engine::FetchEngine;
pub use error::{Error, Result};
pub use fetcher::{FetchSettings, Fetcher, HttpFetcher};
pub use job::{FailureKind, FetchError, FetchJob, FetchOutcome, FetchResult, FetchedDocument};
pub use metrics::collector::MetricsCollector;
pub use metrics::snapshot::MetricsSnapshot;
pub use summary::RunSummary;

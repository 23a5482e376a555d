use crate::archive::{entry_path, ArchiveSink, ZipArchiveWriter};
use crate::config::{ArchiveErrorPolicy, RunConfig, Verbosity};
use crate::error::{Error, Result};
use crate::extension::{file_name, NamingPolicy};
use crate::job::{FetchOutcome, FetchResult};
use crate::metrics::MetricsCollector;
use crate::output::{create_report, ItemStatus, ReportHandler, ReportRecord};
use crate::summary::RunSummary;
use futures::stream::StreamExt;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;

/// The single consumer of fetch results. It owns the archive exclusively.
pub struct Collector {
    archive: Box<dyn ArchiveSink>,
    naming: NamingPolicy,
    on_archive_error: ArchiveErrorPolicy,
    verbosity: Verbosity,
    report: Option<Box<dyn ReportHandler>>,
    metrics: Option<Arc<MetricsCollector>>,
}

impl Collector {
    pub fn new(archive: Box<dyn ArchiveSink>) -> Self {
        Self {
            archive,
            naming: NamingPolicy::default(),
            on_archive_error: ArchiveErrorPolicy::default(),
            verbosity: Verbosity::default(),
            report: None,
            metrics: None,
        }
    }

    /// Creates the output archive and report sink named in `config`.
    pub fn from_config(config: &RunConfig) -> Result<Self> {
        let archive = ZipArchiveWriter::create(&config.output, config.compression)?;
        let mut collector = Self::new(Box::new(archive))
            .with_naming(config.naming)
            .with_archive_error_policy(config.on_archive_error)
            .with_verbosity(config.verbosity);
        if let Some(report) = &config.report {
            collector = collector.with_report(create_report(report)?);
        }
        Ok(collector)
    }

    pub fn with_naming(mut self, naming: NamingPolicy) -> Self {
        self.naming = naming;
        self
    }

    pub fn with_archive_error_policy(mut self, policy: ArchiveErrorPolicy) -> Self {
        self.on_archive_error = policy;
        self
    }

    pub fn with_verbosity(mut self, verbosity: Verbosity) -> Self {
        self.verbosity = verbosity;
        self
    }

    pub fn with_report(mut self, report: Box<dyn ReportHandler>) -> Self {
        self.report = Some(report);
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<MetricsCollector>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Consumes exactly `expected` results, then finalizes the archive.
    ///
    /// The result queue is never closed on purpose, so the job count is the
    /// only stop condition. A queue that runs dry first means workers died.
    pub async fn drain(
        mut self,
        results: mpsc::Receiver<FetchResult>,
        expected: usize,
        started: Instant,
    ) -> Result<RunSummary> {
        let mut succeeded = 0;
        let mut failed = 0;

        let mut results = tokio_stream::wrappers::ReceiverStream::new(results).take(expected);
        while let Some(result) = results.next().await {
            if self.handle(result).await? {
                succeeded += 1;
            } else {
                failed += 1;
            }
        }

        let received = succeeded + failed;
        if received != expected {
            return Err(Error::Internal(format!(
                "result queue closed after {} of {} results",
                received, expected
            )));
        }

        self.archive.finish()?;
        if let Some(report) = self.report.as_mut() {
            report.close().await?;
        }

        Ok(RunSummary {
            total: expected,
            succeeded,
            failed,
            elapsed: started.elapsed(),
        })
    }

    /// Returns whether the item ended up in the archive.
    async fn handle(&mut self, result: FetchResult) -> Result<bool> {
        let FetchResult {
            job,
            outcome,
            elapsed,
        } = result;

        let mut record = ReportRecord {
            record: job.id,
            url: job.source_url.trim().to_string(),
            status: ItemStatus::Failed,
            entry: None,
            content_type: None,
            bytes: 0,
            error: None,
            duration_ms: elapsed.as_millis() as u64,
            finished_at: String::new(),
        };

        let archived = match outcome {
            FetchOutcome::Failed(e) => {
                log::error!(
                    "error: record {} ({}) bad file: {}",
                    job.id,
                    job.output_name,
                    e
                );
                record.error = Some(e.to_string());
                false
            }
            FetchOutcome::Fetched(document) => {
                let name = file_name(&job.output_name, document.content_type.as_deref(), self.naming);
                let entry = entry_path(&job.destination_path, &name);
                record.content_type = document.content_type.clone();
                record.bytes = document.bytes.len() as u64;

                match self.archive.add_entry(&entry, &document.bytes) {
                    Ok(()) => {
                        match self.verbosity {
                            Verbosity::All => log::info!("Added to archive: {}", entry),
                            Verbosity::Report => log::debug!("Added to archive: {}", entry),
                        }
                        if let Some(metrics) = &self.metrics {
                            metrics.increment_entries_archived();
                        }
                        record.status = ItemStatus::Archived;
                        record.entry = Some(entry);
                        true
                    }
                    Err(e) => match self.on_archive_error {
                        ArchiveErrorPolicy::Abort => {
                            log::error!("Cannot write {} to archive: {}", entry, e);
                            return Err(e);
                        }
                        ArchiveErrorPolicy::Skip => {
                            log::error!("error: record {} skipped, cannot archive {}: {}", job.id, entry, e);
                            record.error = Some(e.to_string());
                            false
                        }
                    },
                }
            }
        };

        if let Some(report) = self.report.as_mut() {
            record.finished_at = chrono::Utc::now().to_rfc3339();
            report.write(&record).await?;
        }

        Ok(archived)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::{FailureKind, FetchError, FetchJob, FetchedDocument};
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Records entries in memory and refuses names listed in `reject`.
    #[derive(Clone, Default)]
    struct MemorySink {
        entries: Arc<Mutex<HashMap<String, Vec<u8>>>>,
        finished: Arc<Mutex<usize>>,
        reject: Vec<String>,
    }

    impl ArchiveSink for MemorySink {
        fn add_entry(&mut self, path: &str, bytes: &[u8]) -> Result<()> {
            if self.reject.iter().any(|r| r == path) {
                return Err(Error::Io(std::io::Error::other("disk full")));
            }
            self.entries.lock().unwrap().insert(path.to_string(), bytes.to_vec());
            Ok(())
        }

        fn finish(&mut self) -> Result<()> {
            *self.finished.lock().unwrap() += 1;
            Ok(())
        }
    }

    fn fetched(id: usize, name: &str, dir: &str, body: &[u8]) -> FetchResult {
        FetchResult {
            job: FetchJob::new(id, "http://docs.test/x", name, dir),
            outcome: FetchOutcome::Fetched(FetchedDocument {
                bytes: body.to_vec(),
                content_type: Some("application/pdf".to_string()),
                status: 200,
            }),
            elapsed: Duration::from_millis(5),
        }
    }

    fn failed(id: usize, name: &str) -> FetchResult {
        FetchResult {
            job: FetchJob::new(id, "http://docs.test/y", name, ""),
            outcome: FetchOutcome::Failed(FetchError::new(FailureKind::Timeout, "deadline")),
            elapsed: Duration::from_millis(5),
        }
    }

    /// The sender is handed back so the queue stays open, as it does while
    /// workers are alive.
    async fn queue(
        results: Vec<FetchResult>,
    ) -> (mpsc::Sender<FetchResult>, mpsc::Receiver<FetchResult>) {
        let (tx, rx) = mpsc::channel(results.len().max(1));
        for result in results {
            tx.send(result).await.unwrap();
        }
        (tx, rx)
    }

    #[tokio::test]
    async fn archives_successes_and_counts_failures() {
        let sink = MemorySink::default();
        let collector = Collector::new(Box::new(sink.clone()));
        let (_tx, rx) = queue(vec![
            fetched(1, "a", "dir/", b"one"),
            failed(2, "b"),
            fetched(3, "c", "dir/", b"three"),
        ])
        .await;

        let summary = collector.drain(rx, 3, Instant::now()).await.unwrap();
        assert_eq!((summary.succeeded, summary.failed, summary.total), (2, 1, 3));

        let entries = sink.entries.lock().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries["dir/a.pdf"], b"one");
        assert_eq!(entries["dir/c.pdf"], b"three");
        assert_eq!(*sink.finished.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn stops_after_expected_count_without_closed_queue() {
        let sink = MemorySink::default();
        let (_tx, rx) = queue(vec![failed(1, "a"), failed(2, "b")]).await;

        let summary = Collector::new(Box::new(sink.clone()))
            .drain(rx, 2, Instant::now())
            .await
            .unwrap();
        assert_eq!(summary.failed, 2);
        assert_eq!(summary.succeeded, 0);
        assert_eq!(*sink.finished.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn early_close_is_an_internal_error() {
        let (tx, rx) = mpsc::channel(4);
        tx.send(failed(1, "a")).await.unwrap();
        drop(tx);

        let err = Collector::new(Box::new(MemorySink::default()))
            .drain(rx, 3, Instant::now())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Internal(_)));
    }

    #[tokio::test]
    async fn archive_error_aborts_by_default() {
        let sink = MemorySink {
            reject: vec!["a.pdf".to_string()],
            ..Default::default()
        };
        let (_tx, rx) = queue(vec![fetched(1, "a", "", b"x"), fetched(2, "b", "", b"y")]).await;

        let err = Collector::new(Box::new(sink.clone()))
            .drain(rx, 2, Instant::now())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Io(_)));
        assert_eq!(*sink.finished.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn archive_error_can_be_skipped() {
        let sink = MemorySink {
            reject: vec!["a.pdf".to_string()],
            ..Default::default()
        };
        let (_tx, rx) = queue(vec![fetched(1, "a", "", b"x"), fetched(2, "b", "", b"y")]).await;

        let summary = Collector::new(Box::new(sink.clone()))
            .with_archive_error_policy(ArchiveErrorPolicy::Skip)
            .drain(rx, 2, Instant::now())
            .await
            .unwrap();
        assert_eq!((summary.succeeded, summary.failed), (1, 1));
        assert!(sink.entries.lock().unwrap().contains_key("b.pdf"));
    }
}

use serde::Serialize;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// 1-based manifest record index.
pub type JobId = usize;

/// One manifest record: what to fetch and where it lands in the archive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FetchJob {
    pub id: JobId,
    pub source_url: String,
    pub output_name: String,
    pub destination_path: String,
}

impl FetchJob {
    pub fn new(
        id: JobId,
        source_url: impl Into<String>,
        output_name: impl Into<String>,
        destination_path: impl Into<String>,
    ) -> Self {
        Self {
            id,
            source_url: source_url.into(),
            output_name: output_name.into(),
            destination_path: destination_path.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    InvalidUrl,
    Timeout,
    Connect,
    Body,
    HttpStatus(u16),
    Network,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::InvalidUrl => write!(f, "invalid url"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::Connect => write!(f, "connection failed"),
            FailureKind::Body => write!(f, "body read failed"),
            FailureKind::HttpStatus(code) => write!(f, "http status {}", code),
            FailureKind::Network => write!(f, "network error"),
        }
    }
}

/// Why a single job could not be fetched. Never aborts the run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct FetchError {
    pub kind: FailureKind,
    pub message: String,
}

impl FetchError {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedDocument {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
    pub status: u16,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    Fetched(FetchedDocument),
    Failed(FetchError),
}

/// Produced by exactly one worker for exactly one job.
#[derive(Debug, Clone)]
pub struct FetchResult {
    pub job: FetchJob,
    pub outcome: FetchOutcome,
    pub elapsed: Duration,
}

impl FetchResult {
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, FetchOutcome::Fetched(_))
    }
}

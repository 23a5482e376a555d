use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub mod csv;
pub mod json;

pub use self::csv::CsvReport;
pub use self::json::JsonReport;

/// One line of the per-item run report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportRecord {
    pub record: usize,
    pub url: String,
    pub status: ItemStatus,
    pub entry: Option<String>,
    pub content_type: Option<String>,
    pub bytes: u64,
    pub error: Option<String>,
    pub duration_ms: u64,
    pub finished_at: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
    Archived,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ReportConfig {
    Json { path: String },
    Csv { path: String },
}

#[async_trait]
pub trait ReportHandler: Send + Sync {
    async fn write(&mut self, record: &ReportRecord) -> Result<()>;
    async fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

pub fn create_report(config: &ReportConfig) -> Result<Box<dyn ReportHandler>> {
    let handler: Box<dyn ReportHandler> = match config {
        ReportConfig::Json { path } => Box::new(JsonReport::new(PathBuf::from(path))?),
        ReportConfig::Csv { path } => Box::new(CsvReport::new(PathBuf::from(path))?),
    };
    Ok(handler)
}

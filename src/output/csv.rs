use super::{ReportHandler, ReportRecord};
use crate::error::Result;
use async_trait::async_trait;
use std::path::PathBuf;

pub struct CsvReport {
    writer: csv::Writer<std::fs::File>,
}

impl CsvReport {
    pub fn new(path: PathBuf) -> Result<Self> {
        let writer = csv::Writer::from_path(path)?;
        Ok(Self { writer })
    }
}

#[async_trait]
impl ReportHandler for CsvReport {
    async fn write(&mut self, record: &ReportRecord) -> Result<()> {
        // Header row comes from the first serialized record.
        self.writer.serialize(record)?;
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

use super::{ReportHandler, ReportRecord};
use crate::error::Result;
use async_trait::async_trait;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::PathBuf;

/// Streams report records into a JSON array file.
pub struct JsonReport {
    file: File,
    first: bool,
}

impl JsonReport {
    pub fn new(path: PathBuf) -> Result<Self> {
        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)?;

        write!(file, "[")?;

        Ok(Self {
            file,
            first: true,
        })
    }
}

#[async_trait]
impl ReportHandler for JsonReport {
    async fn write(&mut self, record: &ReportRecord) -> Result<()> {
        if !self.first {
            write!(self.file, ",")?;
        } else {
            self.first = false;
        }

        serde_json::to_writer(&mut self.file, record)?;
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        write!(self.file, "]")?;
        self.file.flush()?;
        Ok(())
    }
}

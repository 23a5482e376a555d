use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{Seek, Write};
use std::path::Path;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Compression {
    #[default]
    Deflated,
    Stored,
}

impl From<Compression> for CompressionMethod {
    fn from(value: Compression) -> Self {
        match value {
            Compression::Deflated => CompressionMethod::Deflated,
            Compression::Stored => CompressionMethod::Stored,
        }
    }
}

/// Sequential, write-once archive. Entries are appended one at a time and
/// the archive is unusable until `finish` has returned.
pub trait ArchiveSink: Send {
    fn add_entry(&mut self, path: &str, bytes: &[u8]) -> Result<()>;
    fn finish(&mut self) -> Result<()>;
}

pub struct ZipArchiveWriter<W: Write + Seek> {
    writer: ZipWriter<W>,
    options: FileOptions,
    entries: usize,
}

impl ZipArchiveWriter<File> {
    pub fn create<P: AsRef<Path>>(path: P, compression: Compression) -> Result<Self> {
        let file = File::create(path)?;
        Ok(Self::new(file, compression))
    }
}

impl<W: Write + Seek> ZipArchiveWriter<W> {
    pub fn new(inner: W, compression: Compression) -> Self {
        Self {
            writer: ZipWriter::new(inner),
            options: FileOptions::default().compression_method(compression.into()),
            entries: 0,
        }
    }

    pub fn entries(&self) -> usize {
        self.entries
    }

    /// Finalizes the archive and hands back the underlying writer.
    pub fn into_inner(mut self) -> Result<W> {
        Ok(self.writer.finish()?)
    }
}

impl<W: Write + Seek + Send> ArchiveSink for ZipArchiveWriter<W> {
    fn add_entry(&mut self, path: &str, bytes: &[u8]) -> Result<()> {
        self.writer.start_file(path, self.options)?;
        self.writer.write_all(bytes)?;
        self.entries += 1;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.writer.finish()?;
        log::debug!("Archive finalized with {} entries", self.entries);
        Ok(())
    }
}

/// Joins an archive directory prefix and a file name into a clean
/// `/`-separated entry path. Empty, `.` and `..` segments are dropped so an
/// entry can never point outside the archive root.
pub fn entry_path(destination: &str, file_name: &str) -> String {
    destination
        .split(['/', '\\'])
        .chain(file_name.split(['/', '\\']))
        .filter(|segment| !matches!(*segment, "" | "." | ".."))
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Read};

    #[test]
    fn entry_path_joins_cleanly() {
        assert_eq!(entry_path("dir/", "a.pdf"), "dir/a.pdf");
        assert_eq!(entry_path("dir", "a.pdf"), "dir/a.pdf");
        assert_eq!(entry_path("", "b.txt"), "b.txt");
        assert_eq!(entry_path("/x//y/./", "c.png"), "x/y/c.png");
        assert_eq!(entry_path("win\\dir", "d.doc"), "win/dir/d.doc");
    }

    #[test]
    fn entry_path_stays_inside_archive_root() {
        assert_eq!(entry_path("../../etc", "a.pdf"), "etc/a.pdf");
        assert_eq!(entry_path("dir/../..", "a.pdf"), "dir/a.pdf");
        assert_eq!(entry_path("dir", "../x/b.pdf"), "dir/x/b.pdf");
        assert_eq!(entry_path("", "..\\..\\c.txt"), "c.txt");
    }

    #[test]
    fn entries_round_trip_through_zip() {
        let mut sink = ZipArchiveWriter::new(Cursor::new(Vec::new()), Compression::Deflated);
        sink.add_entry("dir/a.pdf", b"%PDF-1.4 hello").unwrap();
        sink.add_entry("b.txt", b"").unwrap();
        assert_eq!(sink.entries(), 2);

        let cursor = sink.into_inner().unwrap();
        let mut archive = zip::ZipArchive::new(cursor).unwrap();
        assert_eq!(archive.len(), 2);

        let mut content = Vec::new();
        archive
            .by_name("dir/a.pdf")
            .unwrap()
            .read_to_end(&mut content)
            .unwrap();
        assert_eq!(content, b"%PDF-1.4 hello");
    }

    #[test]
    fn empty_archive_is_still_valid() {
        let sink = ZipArchiveWriter::new(Cursor::new(Vec::new()), Compression::Stored);
        let cursor = sink.into_inner().unwrap();
        let archive = zip::ZipArchive::new(cursor).unwrap();
        assert_eq!(archive.len(), 0);
    }
}

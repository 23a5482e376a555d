//! Reads the delimited manifest into fetch jobs.
//!
//! Each record is `url<sep>output_name<sep>destination_path`. There is no
//! header row. Records are numbered from 1 in the order they appear.

use crate::error::{Error, Result};
use crate::job::FetchJob;
use std::fs::File;
use std::io::Read;
use std::path::Path;

const FIELDS_PER_RECORD: usize = 3;

/// Checks that `delimiter` can separate csv fields and returns it as a byte.
pub fn delimiter_byte(delimiter: char) -> Result<u8> {
    if !delimiter.is_ascii() {
        return Err(Error::Config(format!(
            "Invalid csv separator {:?}: separator must be one ASCII char",
            delimiter
        )));
    }
    if matches!(delimiter, '"' | '\r' | '\n') {
        return Err(Error::Config(format!(
            "Invalid csv separator {:?}: quote and line breaks are reserved",
            delimiter
        )));
    }
    Ok(delimiter as u8)
}

pub fn load_jobs<P: AsRef<Path>>(path: P, delimiter: char) -> Result<Vec<FetchJob>> {
    let path = path.as_ref();
    let file = File::open(path)
        .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
    parse_jobs(file, delimiter)
}

pub fn parse_jobs<R: Read>(reader: R, delimiter: char) -> Result<Vec<FetchJob>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(delimiter_byte(delimiter)?)
        .from_reader(reader);

    let mut jobs = Vec::new();
    for (index, record) in reader.records().enumerate() {
        let record = record?;
        let id = index + 1;

        if record.len() != FIELDS_PER_RECORD {
            return Err(Error::InvalidRecord {
                record: id,
                reason: format!(
                    "expected {} fields, found {}",
                    FIELDS_PER_RECORD,
                    record.len()
                ),
            });
        }

        let url = &record[0];
        if url.trim().is_empty() {
            return Err(Error::InvalidRecord {
                record: id,
                reason: "empty url".to_string(),
            });
        }

        jobs.push(FetchJob::new(id, url, &record[1], &record[2]));
    }

    log::debug!("Manifest yielded {} jobs", jobs.len());
    Ok(jobs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_records_in_order() {
        let input = "http://a.test/1, a ,docs/\nhttp://a.test/2,b,\n";
        let jobs = parse_jobs(input.as_bytes(), ',').unwrap();

        assert_eq!(jobs.len(), 2);
        assert_eq!(jobs[0], FetchJob::new(1, "http://a.test/1", " a ", "docs/"));
        assert_eq!(jobs[1].id, 2);
        assert_eq!(jobs[1].destination_path, "");
    }

    #[test]
    fn honours_custom_delimiter() {
        let input = "http://a.test/x;report;2024/q1\n";
        let jobs = parse_jobs(input.as_bytes(), ';').unwrap();
        assert_eq!(jobs[0].output_name, "report");
        assert_eq!(jobs[0].destination_path, "2024/q1");
    }

    #[test]
    fn rejects_wrong_field_count_with_record_index() {
        let input = "http://a.test/1,a,dir\nhttp://a.test/2,b\nhttp://a.test/3,c,dir\n";
        let err = parse_jobs(input.as_bytes(), ',').unwrap_err();
        match err {
            Error::InvalidRecord { record, reason } => {
                assert_eq!(record, 2);
                assert!(reason.contains("found 2"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn rejects_blank_url() {
        let input = "   ,a,dir\n";
        let err = parse_jobs(input.as_bytes(), ',').unwrap_err();
        assert!(matches!(err, Error::InvalidRecord { record: 1, .. }));
    }

    #[test]
    fn skips_blank_lines() {
        let input = "http://a.test/1,a,\n\nhttp://a.test/2,b,\n";
        let jobs = parse_jobs(input.as_bytes(), ',').unwrap();
        assert_eq!(jobs.len(), 2);
    }

    #[test]
    fn rejects_non_ascii_and_reserved_delimiters() {
        assert!(matches!(delimiter_byte('§'), Err(Error::Config(_))));
        assert!(matches!(delimiter_byte('"'), Err(Error::Config(_))));
        assert_eq!(delimiter_byte('\t').unwrap(), b'\t');
    }

    #[test]
    fn missing_manifest_is_config_error() {
        let err = load_jobs("/definitely/not/here.csv", ',').unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}

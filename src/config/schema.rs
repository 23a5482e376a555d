use crate::archive::Compression;
use crate::extension::NamingPolicy;
use crate::output::ReportConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RunConfig {
    #[serde(default = "default_manifest")]
    pub manifest: PathBuf,

    #[serde(default = "default_pool_size")]
    #[validate(range(min = 1))]
    pub pool_size: usize,

    #[serde(default = "default_timeout")]
    #[validate(range(min = 1))]
    pub timeout_secs: u64,

    #[serde(default = "default_delimiter")]
    pub delimiter: char,

    #[serde(default)]
    pub verbosity: Verbosity,

    #[serde(default = "default_output")]
    pub output: PathBuf,

    #[serde(default)]
    pub naming: NamingPolicy,

    #[serde(default)]
    pub on_archive_error: ArchiveErrorPolicy,

    #[serde(default)]
    pub compression: Compression,

    /// Bounded job/result queue size. Unset means one slot per job.
    #[serde(default)]
    #[validate(range(min = 1))]
    pub queue_capacity: Option<usize>,

    #[serde(default)]
    pub fail_on_http_status: bool,

    #[serde(default = "default_user_agent")]
    #[validate(length(min = 1))]
    pub user_agent: String,

    #[serde(default)]
    pub report: Option<ReportConfig>,

    /// Optional path to a parent configuration file to inherit from
    #[serde(default)]
    pub extends: Option<String>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            manifest: default_manifest(),
            pool_size: default_pool_size(),
            timeout_secs: default_timeout(),
            delimiter: default_delimiter(),
            verbosity: Verbosity::default(),
            output: default_output(),
            naming: NamingPolicy::default(),
            on_archive_error: ArchiveErrorPolicy::default(),
            compression: Compression::default(),
            queue_capacity: None,
            fail_on_http_status: false,
            user_agent: default_user_agent(),
            report: None,
            extends: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Verbosity {
    /// Summary and failures only
    #[default]
    Report,
    /// Also log every archived item
    All,
}

/// What to do when writing a fetched document into the archive fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArchiveErrorPolicy {
    /// Stop the run with the archive error.
    #[default]
    Abort,
    /// Count the item as failed and keep going.
    Skip,
}

fn default_manifest() -> PathBuf {
    PathBuf::from("urls.csv")
}

fn default_pool_size() -> usize {
    10
}

fn default_timeout() -> u64 {
    5
}

fn default_delimiter() -> char {
    ','
}

fn default_output() -> PathBuf {
    PathBuf::from("documents.zip")
}

fn default_user_agent() -> String {
    crate::fetcher::DEFAULT_USER_AGENT.to_string()
}

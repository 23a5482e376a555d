use crate::config::schema::{RunConfig, Verbosity};
use crate::error::{Error, Result};
use crate::manifest::delimiter_byte;
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use validator::Validate;

/// Values given on the command line. Anything set here wins over the file.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub manifest: Option<PathBuf>,
    pub pool_size: Option<usize>,
    pub timeout_secs: Option<u64>,
    pub delimiter: Option<char>,
    pub verbosity: Option<Verbosity>,
    pub output: Option<PathBuf>,
}

pub struct ConfigLoader;

impl ConfigLoader {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<RunConfig> {
        let config = Self::load_unvalidated(path.as_ref())?;
        Self::validate(&config)?;
        Ok(config)
    }

    /// Builds the effective config: file (or defaults), then CLI overrides,
    /// then validation.
    pub fn resolve(path: Option<&Path>, overrides: ConfigOverrides) -> Result<RunConfig> {
        let config = match path {
            Some(path) => Self::load_unvalidated(path)?,
            None => RunConfig::default(),
        };
        let config = Self::apply_overrides(config, overrides);
        Self::validate(&config)?;
        Ok(config)
    }

    pub fn apply_overrides(mut config: RunConfig, overrides: ConfigOverrides) -> RunConfig {
        if let Some(manifest) = overrides.manifest {
            config.manifest = manifest;
        }
        if let Some(pool_size) = overrides.pool_size {
            config.pool_size = pool_size;
        }
        if let Some(timeout_secs) = overrides.timeout_secs {
            config.timeout_secs = timeout_secs;
        }
        if let Some(delimiter) = overrides.delimiter {
            config.delimiter = delimiter;
        }
        if let Some(verbosity) = overrides.verbosity {
            config.verbosity = verbosity;
        }
        if let Some(output) = overrides.output {
            config.output = output;
        }
        config
    }

    pub fn validate(config: &RunConfig) -> Result<()> {
        config.validate().map_err(Error::Validation)?;
        delimiter_byte(config.delimiter)?;
        Ok(())
    }

    fn load_unvalidated(path: &Path) -> Result<RunConfig> {
        let top = fs::canonicalize(path)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        let mut visited = HashSet::new();
        let value = Self::load_with_inheritance(&top, &mut visited)?;
        let mut config: RunConfig = serde_json::from_value(value)?;

        // Keys set in any file are already absolute; what is left are
        // defaults, which belong to the top-level file.
        if let Some(base) = top.parent() {
            if config.manifest.is_relative() {
                config.manifest = base.join(&config.manifest);
            }
            if config.output.is_relative() {
                config.output = base.join(&config.output);
            }
        }
        config.extends = None;

        Ok(config)
    }

    fn load_with_inheritance(path: &Path, visited: &mut HashSet<PathBuf>) -> Result<Value> {
        let path = fs::canonicalize(path).map_err(|e| {
            Error::Config(format!("{}: {}", path.display(), e))
        })?;

        if visited.contains(&path) {
            return Err(Error::Config(format!(
                "Circular inheritance detected involving {}",
                path.display()
            )));
        }
        visited.insert(path.clone());

        let base = path.parent()
            .ok_or_else(|| Error::Config(format!(
                "Cannot determine parent directory for {}",
                path.display()
            )))?
            .to_path_buf();

        let mut table = Self::load_file(&path)?;
        Self::rebase_paths(&mut table, &base);

        match table.remove("extends") {
            None => Ok(Value::Object(table)),
            Some(Value::String(parent_path_str)) => {
                let parent = Self::load_with_inheritance(&base.join(parent_path_str), visited)?;
                let Value::Object(mut merged) = parent else {
                    return Err(Error::Internal("parent config is not a table".to_string()));
                };
                // Only keys written in the child file replace the parent's.
                merged.extend(table);
                Ok(Value::Object(merged))
            }
            Some(other) => Err(Error::Config(format!(
                "{}: extends must be a path, got {}",
                path.display(),
                other
            ))),
        }
    }

    fn load_file(path: &Path) -> Result<Map<String, Value>> {
        let content = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;

        let value: Value = match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => serde_json::from_str(&content)?,
            Some("yaml") | Some("yml") => serde_yaml::from_str(&content)?,
            Some("toml") => toml::from_str(&content)?,
            _ => {
                return Err(Error::Config(format!(
                    "Unsupported file extension: {}",
                    path.display()
                )))
            }
        };

        match value {
            Value::Object(table) => Ok(table),
            Value::Null => Ok(Map::new()),
            _ => Err(Error::Config(format!(
                "{}: top level must be a table",
                path.display()
            ))),
        }
    }

    /// Paths written in a config file are relative to that file.
    fn rebase_paths(table: &mut Map<String, Value>, base: &Path) {
        for key in ["manifest", "output"] {
            if let Some(value) = table.get_mut(key) {
                rebase_value(value, base);
            }
        }
        if let Some(report_path) = table
            .get_mut("report")
            .and_then(Value::as_object_mut)
            .and_then(|report| report.get_mut("path"))
        {
            rebase_value(report_path, base);
        }
    }
}

fn rebase_value(value: &mut Value, base: &Path) {
    if let Value::String(raw) = value {
        if Path::new(raw.as_str()).is_relative() {
            *raw = base.join(raw.as_str()).to_string_lossy().into_owned();
        }
    }
}

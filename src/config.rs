//! Configuration for the sleet converter.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use snafu::prelude::*;
use std::path::{Path, PathBuf};

use crate::decode::{ColumnDecoders, DecoderSet};
use crate::error::{
    ConfigError, ReadFileSnafu, YamlParseSnafu, ZeroFlushBatchSizeSnafu, ZeroIdleTimeoutSnafu,
};
use crate::filter::TableFilter;

/// Main configuration for a conversion run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Path to the input SQL dump (.sql, .sql.gz, .sql.zst).
    #[serde(default)]
    pub input: PathBuf,

    /// Table name patterns to convert (anchored regex). Absent means all.
    #[serde(default)]
    pub tables: Option<Vec<String>>,

    /// Column value decoders, keyed by table pattern then column name.
    #[serde(default)]
    pub parsers: Option<IndexMap<String, ColumnDecoders>>,

    /// Directory receiving one JSON file per table.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Records buffered per table before a flush.
    #[serde(default = "default_flush_batch_size")]
    pub flush_batch_size: usize,

    /// Seconds a table worker waits for a new record before retiring.
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_flush_batch_size() -> usize {
    10_000
}

fn default_idle_timeout() -> u64 {
    10
}

impl Default for Config {
    fn default() -> Self {
        Self {
            input: PathBuf::new(),
            tables: None,
            parsers: None,
            output_dir: default_output_dir(),
            flush_batch_size: default_flush_batch_size(),
            idle_timeout_secs: default_idle_timeout(),
        }
    }
}

impl Config {
    /// Load configuration from a YAML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).context(ReadFileSnafu { path })?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string.
    pub fn parse(contents: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_yaml::from_str(contents).context(YamlParseSnafu)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration, including pattern compilation.
    pub fn validate(&self) -> Result<(), ConfigError> {
        ensure!(self.flush_batch_size > 0, ZeroFlushBatchSizeSnafu);
        ensure!(self.idle_timeout_secs > 0, ZeroIdleTimeoutSnafu);
        TableFilter::new(self.tables.as_deref())?;
        DecoderSet::new(self.parsers.as_ref())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::DecoderKind;

    #[test]
    fn test_parse_full_config() {
        let yaml = r#"
tables:
  - "^users$"
  - "^orders_.*"
parsers:
  "^wp_.*":
    meta_value: [phps, json]
output_dir: /tmp/out
flush_batch_size: 500
idle_timeout_secs: 3
"#;
        let config = Config::parse(yaml).unwrap();
        assert_eq!(config.tables.as_deref().unwrap().len(), 2);
        assert_eq!(config.output_dir, PathBuf::from("/tmp/out"));
        assert_eq!(config.flush_batch_size, 500);
        assert_eq!(config.idle_timeout_secs, 3);

        let parsers = config.parsers.unwrap();
        let columns = parsers.get("^wp_.*").unwrap();
        assert_eq!(
            columns.get("meta_value").unwrap(),
            &vec![DecoderKind::Phps, DecoderKind::Json]
        );
    }

    #[test]
    fn test_defaults() {
        let config = Config::parse("{}").unwrap();
        assert!(config.tables.is_none());
        assert!(config.parsers.is_none());
        assert_eq!(config.output_dir, PathBuf::from("."));
        assert_eq!(config.flush_batch_size, 10_000);
        assert_eq!(config.idle_timeout_secs, 10);
    }

    #[test]
    fn test_zero_flush_batch_size_rejected() {
        let err = Config::parse("flush_batch_size: 0").unwrap_err();
        assert!(matches!(err, ConfigError::ZeroFlushBatchSize));
    }

    #[test]
    fn test_zero_idle_timeout_rejected() {
        let err = Config::parse("idle_timeout_secs: 0").unwrap_err();
        assert!(matches!(err, ConfigError::ZeroIdleTimeout));
    }

    #[test]
    fn test_bad_table_pattern_rejected() {
        let err = Config::parse("tables: [\"[\"]").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidTablePattern { .. }));
    }
}

//! Error types for the sleet converter.

use snafu::prelude::*;
use std::path::PathBuf;

/// Errors that can occur during configuration parsing and validation.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[snafu(display("Failed to read configuration file {}: {source}", path.display()))]
    ReadFile {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to parse YAML configuration.
    #[snafu(display("Failed to parse YAML configuration: {source}"))]
    YamlParse { source: serde_yaml::Error },

    /// A table pattern failed to compile.
    #[snafu(display("Invalid table pattern {pattern:?}: {source}"))]
    InvalidTablePattern {
        pattern: String,
        source: regex::Error,
    },

    /// Flush batch size must be positive.
    #[snafu(display("flush_batch_size must be greater than zero"))]
    ZeroFlushBatchSize,

    /// Idle timeout must be positive.
    #[snafu(display("idle_timeout_secs must be greater than zero"))]
    ZeroIdleTimeout,
}

/// Errors that can occur while reading the input dump.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum SourceError {
    /// Failed to open the input file.
    #[snafu(display("Failed to open input file {}: {source}", path.display()))]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to read from the input stream.
    #[snafu(display("Failed to read from input: {source}"))]
    Read { source: std::io::Error },
}

/// Errors that can occur while flushing records to a destination.
///
/// Any of these is fatal for the whole pipeline, not just the one table:
/// an unusable destination means continuing would silently lose data.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum SinkError {
    /// Failed to create the output directory.
    #[snafu(display("Failed to create output directory {}: {source}", path.display()))]
    CreateOutputDir {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to encode a batch of records.
    #[snafu(display("Failed to encode records as JSON: {source}"))]
    Encode { source: serde_json::Error },

    /// Failed to write a destination file.
    #[snafu(display("Failed to write output file {}: {source}", path.display()))]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Top-level pipeline errors.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum PipelineError {
    /// Configuration error.
    #[snafu(display("Configuration error: {source}"))]
    Config { source: ConfigError },

    /// Input error.
    #[snafu(display("Input error: {source}"))]
    Source { source: SourceError },

    /// Sink error.
    #[snafu(display("Sink error: {source}"))]
    Sink { source: SinkError },

    /// Task join error.
    #[snafu(display("Task join error: {source}"))]
    TaskJoin { source: tokio::task::JoinError },
}

impl From<ConfigError> for PipelineError {
    fn from(source: ConfigError) -> Self {
        PipelineError::Config { source }
    }
}

impl From<SourceError> for PipelineError {
    fn from(source: SourceError) -> Self {
        PipelineError::Source { source }
    }
}

impl From<SinkError> for PipelineError {
    fn from(source: SinkError) -> Self {
        PipelineError::Sink { source }
    }
}

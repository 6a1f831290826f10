//! sleet CLI: convert SQL dumps to per-table JSON files.

use std::path::PathBuf;
use std::time::Instant;

use clap::Parser;
use snafu::prelude::*;
use tracing::info;
use tracing_subscriber::EnvFilter;

use sleet::config::Config;
use sleet::error::{ConfigSnafu, PipelineError};
use sleet::pipeline::run_pipeline;

/// SQL dump to JSON conversion tool.
#[derive(Parser, Debug)]
#[command(name = "sleet")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output directory for the per-table JSON files.
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Comma-separated table patterns to convert.
    #[arg(long, value_delimiter = ',')]
    tables: Option<Vec<String>>,

    /// Records to buffer per table before flushing to file.
    #[arg(long)]
    flush_batch_size: Option<usize>,

    /// Seconds a table worker waits for new records before retiring.
    #[arg(long)]
    idle_timeout_secs: Option<u64>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Dry run - validate configuration without processing.
    #[arg(long)]
    dry_run: bool,

    /// SQL dump file path (.sql, .sql.gz, .sql.zst).
    sql_file: PathBuf,
}

#[snafu::report]
#[tokio::main]
async fn main() -> Result<(), PipelineError> {
    let args = Args::parse();

    // Initialize logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let config = build_config(&args)?;

    if args.dry_run {
        info!("Dry run mode - validating configuration");
        info!("Input: {}", config.input.display());
        info!("Output directory: {}", config.output_dir.display());
        match &config.tables {
            Some(tables) => info!("Tables: {}", tables.join(", ")),
            None => info!("Tables: all"),
        }
        info!("Flush batch size: {}", config.flush_batch_size);
        info!("Idle timeout: {}s", config.idle_timeout_secs);
        info!("Configuration is valid");
        return Ok(());
    }

    info!("Converting {}", config.input.display());
    let start = Instant::now();

    let stats = run_pipeline(config).await?;

    info!("Finished in {:.2}s", start.elapsed().as_secs_f64());
    info!("  Statements parsed: {}", stats.statements_parsed);
    info!("  Records dispatched: {}", stats.records_dispatched);
    info!("  Records written: {}", stats.records_written);
    info!("  Flushes: {}", stats.flushes);
    info!("  Tables written: {}", stats.tables_written);

    Ok(())
}

/// Merge the config file (if any) with command line overrides.
fn build_config(args: &Args) -> Result<Config, PipelineError> {
    let mut config = match &args.config {
        Some(path) => Config::from_file(path).context(ConfigSnafu)?,
        None => Config::default(),
    };

    config.input = args.sql_file.clone();
    if let Some(dir) = &args.output_dir {
        config.output_dir = dir.clone();
    }
    if let Some(tables) = &args.tables {
        config.tables = Some(tables.clone());
    }
    if let Some(n) = args.flush_batch_size {
        config.flush_batch_size = n;
    }
    if let Some(n) = args.idle_timeout_secs {
        config.idle_timeout_secs = n;
    }

    config.validate().context(ConfigSnafu)?;
    Ok(config)
}

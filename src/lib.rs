//! sleet: stream SQL dump files into per-table JSON files.
//!
//! Reads a (possibly gzip- or zstd-compressed) SQL dump line by line,
//! extracts the rows of every INSERT statement, and fans records out to
//! per-table workers that batch and flush them into one JSON array file
//! per table. Tables are discovered on the fly; workers retire after an
//! idle window and are recreated if their table shows up again.
//!
//! # Example
//!
//! ```ignore
//! use sleet::{Config, run_pipeline, PipelineError};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), PipelineError> {
//!     let mut config = Config::default();
//!     config.input = "dump.sql.gz".into();
//!     config.output_dir = "out".into();
//!     let stats = run_pipeline(config).await?;
//!     println!("wrote {} records", stats.records_written);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod decode;
pub mod error;
pub mod filter;
pub mod pipeline;
pub mod sink;
pub mod source;
pub mod statement;

// Re-export main types
pub use config::Config;
pub use error::PipelineError;
pub use pipeline::{run_pipeline, PipelineStats};
pub use statement::Record;

//! Streaming line reader for SQL dump files.
//!
//! Decompression and line splitting run on the blocking pool; lines reach
//! the async dispatcher through a bounded channel, so a slow consumer
//! applies backpressure to the reader instead of buffering the whole dump.

use std::fs::File;
use std::io::BufRead;
use std::path::Path;

use snafu::ResultExt;
use tokio::sync::mpsc;
use tracing::debug;

use super::compression::Compression;
use crate::error::{OpenSnafu, SourceError};

/// Lines buffered between the blocking reader and the dispatcher.
const LINE_CHANNEL_CAPACITY: usize = 1024;

/// The dump file as an async stream of lines.
#[derive(Debug)]
pub struct LineSource {
    rx: mpsc::Receiver<Result<String, SourceError>>,
}

impl LineSource {
    /// Open the dump file and start the blocking reader task.
    ///
    /// An unopenable input is fatal and reported before any worker starts;
    /// read errors mid-stream travel through the channel.
    pub fn open(path: &Path) -> Result<Self, SourceError> {
        let file = File::open(path).context(OpenSnafu { path })?;
        let compression = Compression::from_path(path);
        debug!(path = %path.display(), codec = compression.name(), "opened dump file");

        let (tx, rx) = mpsc::channel(LINE_CHANNEL_CAPACITY);
        tokio::task::spawn_blocking(move || {
            let reader = match compression.wrap(Box::new(file)) {
                Ok(reader) => reader,
                Err(e) => {
                    let _ = tx.blocking_send(Err(SourceError::Read { source: e }));
                    return;
                }
            };

            for line in reader.lines() {
                let message = line.map_err(|e| SourceError::Read { source: e });
                let failed = message.is_err();
                if tx.blocking_send(message).is_err() {
                    // Receiver dropped: the dispatcher stopped early.
                    return;
                }
                if failed {
                    return;
                }
            }
        });

        Ok(Self { rx })
    }

    /// Next line from the dump, or `None` once the file is exhausted.
    pub async fn recv(&mut self) -> Option<Result<String, SourceError>> {
        self.rx.recv().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    async fn collect(path: &Path) -> Vec<String> {
        let mut source = LineSource::open(path).unwrap();
        let mut lines = Vec::new();
        while let Some(line) = source.recv().await {
            lines.push(line.unwrap());
        }
        lines
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_reads_plain_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("dump.sql");
        std::fs::write(&path, "line one\nline two\n").unwrap();

        assert_eq!(collect(&path).await, vec!["line one", "line two"]);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_reads_gzip_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("dump.sql.gz");
        let file = std::fs::File::create(&path).unwrap();
        let mut encoder = flate2::write::GzEncoder::new(file, flate2::Compression::default());
        encoder.write_all(b"alpha\nbeta\n").unwrap();
        encoder.finish().unwrap();

        assert_eq!(collect(&path).await, vec!["alpha", "beta"]);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_missing_file_fails_to_open() {
        let dir = TempDir::new().unwrap();
        let err = LineSource::open(&dir.path().join("absent.sql")).unwrap_err();
        assert!(matches!(err, SourceError::Open { .. }));
    }
}

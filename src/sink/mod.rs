//! Per-table JSON sink.
//!
//! Each table maps to `<output_dir>/<table>.json`. The first flush of a run
//! truncates whatever a previous run left behind; later flushes splice
//! their records into the existing array, so the destination is always one
//! valid JSON document no matter how many flushes produced it.

use std::collections::HashSet;
use std::io::SeekFrom;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use snafu::ResultExt;
use tokio::fs::OpenOptions;
use tokio::io::{AsyncSeekExt, AsyncWriteExt};
use tracing::debug;

use crate::error::{CreateOutputDirSnafu, EncodeSnafu, SinkError, WriteSnafu};
use crate::statement::Record;

/// Writes batches of records to per-table JSON files.
pub struct JsonSink {
    output_dir: PathBuf,
    /// Tables already written in this run: decides truncate vs. append.
    seen: Mutex<HashSet<String>>,
}

impl JsonSink {
    /// Create the sink, making sure the output directory exists.
    pub fn new(output_dir: impl Into<PathBuf>) -> Result<Self, SinkError> {
        let output_dir = output_dir.into();
        std::fs::create_dir_all(&output_dir).context(CreateOutputDirSnafu {
            path: output_dir.clone(),
        })?;
        Ok(Self {
            output_dir,
            seen: Mutex::new(HashSet::new()),
        })
    }

    /// Destination file for a table.
    pub fn destination(&self, table: &str) -> PathBuf {
        self.output_dir.join(format!("{table}.json"))
    }

    /// Number of distinct tables written so far in this run.
    pub fn tables_written(&self) -> usize {
        self.seen.lock().len()
    }

    /// Flush a batch of records for `table`. Empty batches are a no-op.
    pub async fn write(&self, table: &str, records: &[Record]) -> Result<(), SinkError> {
        if records.is_empty() {
            return Ok(());
        }

        let path = self.destination(table);
        let body = serde_json::to_vec(records).context(EncodeSnafu)?;
        let first_write = self.seen.lock().insert(table.to_string());

        if first_write {
            tokio::fs::write(&path, &body)
                .await
                .context(WriteSnafu { path: path.clone() })?;
        } else {
            self.append(&path, &body).await?;
        }

        debug!(
            table,
            records = records.len(),
            path = %path.display(),
            "flushed batch"
        );
        Ok(())
    }

    /// Splice a new batch into the existing array: the file's trailing `]`
    /// becomes a `,`, then the batch is appended without its leading `[`.
    async fn append(&self, path: &Path, body: &[u8]) -> Result<(), SinkError> {
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .await
            .context(WriteSnafu { path: path.to_path_buf() })?;

        file.seek(SeekFrom::End(-1))
            .await
            .context(WriteSnafu { path: path.to_path_buf() })?;
        file.write_all(b",")
            .await
            .context(WriteSnafu { path: path.to_path_buf() })?;
        file.write_all(&body[1..])
            .await
            .context(WriteSnafu { path: path.to_path_buf() })?;
        file.flush()
            .await
            .context(WriteSnafu { path: path.to_path_buf() })?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn record(id: i64) -> Record {
        let mut record = Record::new();
        record.insert("id".to_string(), json!(id));
        record
    }

    fn read_records(path: &Path) -> Vec<Record> {
        serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
    }

    #[tokio::test]
    async fn test_empty_batch_is_a_noop() {
        let dir = TempDir::new().unwrap();
        let sink = JsonSink::new(dir.path()).unwrap();

        sink.write("t1", &[]).await.unwrap();

        assert!(!sink.destination("t1").exists());
        assert_eq!(sink.tables_written(), 0);
    }

    #[tokio::test]
    async fn test_first_write_truncates_leftovers() {
        let dir = TempDir::new().unwrap();
        let sink = JsonSink::new(dir.path()).unwrap();
        std::fs::write(sink.destination("t1"), "stale content from a previous run").unwrap();

        sink.write("t1", &[record(1)]).await.unwrap();

        assert_eq!(read_records(&sink.destination("t1")), vec![record(1)]);
    }

    #[tokio::test]
    async fn test_appends_splice_into_one_array() {
        let dir = TempDir::new().unwrap();
        let sink = JsonSink::new(dir.path()).unwrap();

        sink.write("t1", &[record(1), record(2)]).await.unwrap();
        sink.write("t1", &[record(3)]).await.unwrap();
        sink.write("t1", &[record(4), record(5)]).await.unwrap();

        let records = read_records(&sink.destination("t1"));
        assert_eq!(records, vec![record(1), record(2), record(3), record(4), record(5)]);
    }

    #[tokio::test]
    async fn test_tables_get_independent_destinations() {
        let dir = TempDir::new().unwrap();
        let sink = JsonSink::new(dir.path()).unwrap();

        sink.write("a", &[record(1)]).await.unwrap();
        sink.write("b", &[record(2)]).await.unwrap();

        assert_eq!(read_records(&sink.destination("a")), vec![record(1)]);
        assert_eq!(read_records(&sink.destination("b")), vec![record(2)]);
        assert_eq!(sink.tables_written(), 2);
    }

    #[tokio::test]
    async fn test_missing_output_dir_is_created() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("out/json");
        let sink = JsonSink::new(&nested).unwrap();

        sink.write("t1", &[record(1)]).await.unwrap();
        assert!(nested.join("t1.json").exists());
    }
}

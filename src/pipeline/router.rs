//! Lazy per-table routing.
//!
//! The registry maps each table to the sending half of its worker's queue.
//! It is owned by the dispatcher task alone, so lookups need no lock; the
//! liveness race is closed by the channel itself. A worker that decides to
//! retire first closes its receiver (refusing further sends) and only then
//! drains what is already buffered — so a successful send guarantees the
//! record will be processed, and a failed send hands the record back for
//! re-dispatch to a replacement worker.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::debug;

use crate::error::{PipelineError, SinkError};
use crate::statement::Record;

use super::worker::{Worker, WorkerStats};
use super::PipelineContext;

pub(crate) struct TableRouter {
    ctx: Arc<PipelineContext>,
    entries: HashMap<String, mpsc::UnboundedSender<Record>>,
    workers: JoinSet<Result<WorkerStats, SinkError>>,
}

impl TableRouter {
    pub fn new(ctx: Arc<PipelineContext>) -> Self {
        Self {
            ctx,
            entries: HashMap::new(),
            workers: JoinSet::new(),
        }
    }

    /// Enqueue a record for `table`, creating or replacing the worker as
    /// needed. Never drops a record: a send refused by a retiring worker
    /// is re-dispatched to a fresh one.
    pub fn dispatch(&mut self, table: &str, mut record: Record) {
        loop {
            let tx = match self.entries.get(table) {
                Some(tx) => tx.clone(),
                None => self.register(table),
            };
            match tx.send(record) {
                Ok(()) => return,
                Err(mpsc::error::SendError(refused)) => {
                    // The worker retired between lookup and send. A fresh
                    // worker accepts unconditionally until its first idle
                    // timeout, so the retry terminates.
                    debug!(table, "worker retired, replacing");
                    record = refused;
                    self.entries.remove(table);
                }
            }
        }
    }

    fn register(&mut self, table: &str) -> mpsc::UnboundedSender<Record> {
        let (tx, rx) = mpsc::unbounded_channel();
        let worker = Worker::new(table.to_string(), rx, Arc::clone(&self.ctx));
        self.workers.spawn(worker.run());
        self.entries.insert(table.to_string(), tx.clone());
        tx
    }

    /// Close every queue and wait for all workers to drain and retire.
    ///
    /// Returns aggregated worker totals, or the first failure.
    pub async fn finish(mut self) -> Result<WorkerStats, PipelineError> {
        // Dropping the senders closes each queue once it is drained.
        drop(self.entries);

        let mut totals = WorkerStats::default();
        let mut first_error = None;
        while let Some(joined) = self.workers.join_next().await {
            match joined {
                Ok(Ok(stats)) => {
                    totals.records_written += stats.records_written;
                    totals.flushes += stats.flushes;
                }
                Ok(Err(e)) => {
                    if first_error.is_none() {
                        first_error = Some(PipelineError::from(e));
                    }
                }
                Err(e) => {
                    if first_error.is_none() {
                        first_error = Some(PipelineError::TaskJoin { source: e });
                    }
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(totals),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::JsonSink;
    use crate::statement::Record;
    use serde_json::json;
    use std::time::Duration;
    use tempfile::TempDir;
    use tokio_util::sync::CancellationToken;

    fn context(dir: &TempDir, flush_batch_size: usize, idle_ms: u64) -> Arc<PipelineContext> {
        Arc::new(PipelineContext {
            flush_batch_size,
            idle_timeout: Duration::from_millis(idle_ms),
            sink: JsonSink::new(dir.path()).unwrap(),
            shutdown: CancellationToken::new(),
        })
    }

    fn record(id: i64) -> Record {
        let mut record = Record::new();
        record.insert("id".to_string(), json!(id));
        record
    }

    fn read_ids(dir: &TempDir, table: &str) -> Vec<i64> {
        let path = dir.path().join(format!("{table}.json"));
        let records: Vec<Record> =
            serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
        records.iter().map(|r| r["id"].as_i64().unwrap()).collect()
    }

    #[tokio::test]
    async fn test_records_stay_in_enqueue_order() {
        let dir = TempDir::new().unwrap();
        let mut router = TableRouter::new(context(&dir, 1000, 5000));

        for id in 0..50 {
            router.dispatch("t1", record(id));
        }
        let totals = router.finish().await.unwrap();

        assert_eq!(totals.records_written, 50);
        assert_eq!(read_ids(&dir, "t1"), (0..50).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_flush_at_threshold_and_retirement() {
        let dir = TempDir::new().unwrap();
        let mut router = TableRouter::new(context(&dir, 2, 5000));

        for id in 0..5 {
            router.dispatch("t1", record(id));
        }
        let totals = router.finish().await.unwrap();

        // Two full batches of 2, plus the remainder of 1 at retirement.
        assert_eq!(totals.flushes, 3);
        assert_eq!(totals.records_written, 5);
        assert_eq!(read_ids(&dir, "t1"), vec![0, 1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn test_retired_worker_is_replaced_without_loss() {
        let dir = TempDir::new().unwrap();
        let mut router = TableRouter::new(context(&dir, 1000, 100));

        router.dispatch("t1", record(1));
        // Outlive the idle window so the worker retires and flushes.
        tokio::time::sleep(Duration::from_millis(400)).await;
        router.dispatch("t1", record(2));

        let totals = router.finish().await.unwrap();

        // One flush per worker generation, both records present in order.
        assert_eq!(totals.records_written, 2);
        assert_eq!(totals.flushes, 2);
        assert_eq!(read_ids(&dir, "t1"), vec![1, 2]);
    }

    #[tokio::test]
    async fn test_activity_resets_the_idle_deadline() {
        let dir = TempDir::new().unwrap();
        let mut router = TableRouter::new(context(&dir, 1000, 300));

        router.dispatch("t1", record(1));
        tokio::time::sleep(Duration::from_millis(200)).await;
        // Still inside the idle window: the same worker must accept this.
        router.dispatch("t1", record(2));

        let totals = router.finish().await.unwrap();
        assert_eq!(totals.flushes, 1);
        assert_eq!(read_ids(&dir, "t1"), vec![1, 2]);
    }

    #[tokio::test]
    async fn test_tables_are_independent() {
        let dir = TempDir::new().unwrap();
        let mut router = TableRouter::new(context(&dir, 1000, 5000));

        for id in 0..10 {
            router.dispatch("a", record(id));
            router.dispatch("b", record(id * 10));
        }
        router.finish().await.unwrap();

        assert_eq!(read_ids(&dir, "a"), (0..10).collect::<Vec<_>>());
        assert_eq!(read_ids(&dir, "b"), (0..10).map(|i| i * 10).collect::<Vec<_>>());
    }
}

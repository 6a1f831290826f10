//! Per-table worker: drains the table queue, batches, and flushes.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::time::timeout;
use tracing::debug;

use crate::error::SinkError;
use crate::statement::Record;

use super::PipelineContext;

/// Records accumulated for one table between flushes.
///
/// Single-owner: only the table's worker touches it, so no locking.
#[derive(Default)]
pub(crate) struct BatchBuffer {
    records: Vec<Record>,
}

impl BatchBuffer {
    pub fn append(&mut self, record: Record) {
        self.records.push(record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Take the current contents, leaving the buffer empty.
    pub fn drain_all(&mut self) -> Vec<Record> {
        std::mem::take(&mut self.records)
    }
}

/// Totals reported by a worker when it retires.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct WorkerStats {
    pub records_written: u64,
    pub flushes: u64,
}

/// The exclusive consumer of one table's queue.
pub(crate) struct Worker {
    table: String,
    rx: mpsc::UnboundedReceiver<Record>,
    buffer: BatchBuffer,
    ctx: Arc<PipelineContext>,
    stats: WorkerStats,
}

impl Worker {
    pub fn new(
        table: String,
        rx: mpsc::UnboundedReceiver<Record>,
        ctx: Arc<PipelineContext>,
    ) -> Self {
        Self {
            table,
            rx,
            buffer: BatchBuffer::default(),
            ctx,
            stats: WorkerStats::default(),
        }
    }

    /// Drain loop: block on the queue up to the idle timeout, flush on
    /// threshold, flush the remainder on retirement.
    pub async fn run(mut self) -> Result<WorkerStats, SinkError> {
        debug!(table = %self.table, "worker starting");

        loop {
            match timeout(self.ctx.idle_timeout, self.rx.recv()).await {
                Ok(Some(record)) => {
                    self.buffer.append(record);
                    if self.buffer.len() >= self.ctx.flush_batch_size {
                        self.flush().await?;
                    }
                }
                // Input finished and the queue is fully drained.
                Ok(None) => break,
                // Idle window elapsed: refuse new records, then drain
                // anything that was enqueued before the refusal took effect.
                Err(_) => {
                    self.rx.close();
                    while let Ok(record) = self.rx.try_recv() {
                        self.buffer.append(record);
                        if self.buffer.len() >= self.ctx.flush_batch_size {
                            self.flush().await?;
                        }
                    }
                    break;
                }
            }
        }

        self.flush().await?;
        debug!(
            table = %self.table,
            records = self.stats.records_written,
            flushes = self.stats.flushes,
            "worker retired"
        );
        Ok(self.stats)
    }

    async fn flush(&mut self) -> Result<(), SinkError> {
        if self.buffer.is_empty() {
            return Ok(());
        }

        let records = self.buffer.drain_all();
        if let Err(e) = self.ctx.sink.write(&self.table, &records).await {
            // An unusable destination takes the whole pipeline down.
            self.ctx.shutdown.cancel();
            return Err(e);
        }

        self.stats.records_written += records.len() as u64;
        self.stats.flushes += 1;
        Ok(())
    }
}

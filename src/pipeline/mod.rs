//! The streaming conversion pipeline.
//!
//! A single dispatcher task reads dump lines, parses INSERT statements,
//! filters tables, and routes records to per-table workers; each worker
//! batches and flushes to its own JSON destination independently. Workers
//! are ephemeral: one tokio task per table, retired after an idle window
//! and recreated if the table shows up again.

mod router;
mod worker;

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::decode::DecoderSet;
use crate::error::PipelineError;
use crate::filter::TableFilter;
use crate::sink::JsonSink;
use crate::source::LineSource;
use crate::statement;

use router::TableRouter;

/// Process-scoped state shared by the router, workers, and sink.
pub(crate) struct PipelineContext {
    pub flush_batch_size: usize,
    pub idle_timeout: Duration,
    pub sink: JsonSink,
    pub shutdown: CancellationToken,
}

/// Totals for a completed run.
#[derive(Debug, Default, Clone, Copy)]
pub struct PipelineStats {
    pub statements_parsed: u64,
    pub records_dispatched: u64,
    pub records_written: u64,
    pub flushes: u64,
    pub tables_written: u64,
}

/// Run the conversion described by `config` to completion.
///
/// Fails before any worker starts when the input is unreadable or the
/// output directory cannot be created; fails after draining when any
/// worker hit a sink error.
pub async fn run_pipeline(config: Config) -> Result<PipelineStats, PipelineError> {
    let filter = TableFilter::new(config.tables.as_deref())?;
    let decoders = DecoderSet::new(config.parsers.as_ref())?;
    let sink = JsonSink::new(&config.output_dir)?;
    let shutdown = CancellationToken::new();

    let mut lines = LineSource::open(&config.input)?;

    let ctx = Arc::new(PipelineContext {
        flush_batch_size: config.flush_batch_size,
        idle_timeout: Duration::from_secs(config.idle_timeout_secs),
        sink,
        shutdown: shutdown.clone(),
    });
    let mut router = TableRouter::new(Arc::clone(&ctx));
    let mut stats = PipelineStats::default();

    info!(
        input = %config.input.display(),
        output_dir = %config.output_dir.display(),
        "starting conversion"
    );

    loop {
        tokio::select! {
            biased;

            _ = shutdown.cancelled() => {
                warn!("fatal sink failure, stopping dispatch");
                break;
            }

            next = lines.recv() => match next {
                Some(Ok(line)) => {
                    dispatch_line(&line, &filter, &decoders, &mut router, &mut stats);
                }
                Some(Err(e)) => return Err(e.into()),
                None => break,
            },
        }
    }

    drop(lines);
    debug!("input exhausted, waiting for workers to drain");

    let totals = router.finish().await?;
    stats.records_written = totals.records_written;
    stats.flushes = totals.flushes;
    stats.tables_written = ctx.sink.tables_written() as u64;
    Ok(stats)
}

/// Parse one line and route its records, if any survive the filter.
fn dispatch_line(
    line: &str,
    filter: &TableFilter,
    decoders: &DecoderSet,
    router: &mut TableRouter,
    stats: &mut PipelineStats,
) {
    let Some(insert) = statement::parse_line(line) else {
        return;
    };
    stats.statements_parsed += 1;

    let table = insert.table.clone();
    if !filter.matches(&table) {
        return;
    }

    for record in insert.into_records(decoders.for_table(&table)) {
        stats.records_dispatched += 1;
        router.dispatch(&table, record);
    }
}

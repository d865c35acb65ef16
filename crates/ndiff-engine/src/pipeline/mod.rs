//! Reconciliation pipeline driver.
//!
//! ```text
//! WindowSource --(WindowPair, cap 1)--> differ --(DiffResult, cap 1)--> sink
//! ```
//!
//! Each hop is a single-slot channel, so the source can never get more than
//! a window or two ahead of the sink. Windows travel in ascending boundary
//! order end to end.
//!
//! ## Shutdown
//!
//! - **Exhausted range**: the source returns, its sender drops, and each
//!   downstream stage drains what it holds and ends.
//! - **Cancellation**: the source stops before its next window; everything
//!   already fetched is still diffed and persisted.
//! - **Retrieval failure**: same as above, then the retrieval error is
//!   returned. Windows before the failing one stay persisted.
//! - **Persistence failure**: the sink drops its receiver, the upstream
//!   stages stop at their next send, and the persistence error is returned.

pub mod differ;
pub mod sink;
pub mod source;

use ndiff_core::errors::{ExError, ExErrorKind, Result};
use ndiff_core::{log_op_end, log_op_error, log_op_start, RangeConfig};
use ndiff_core_types::RunId;
use ndiff_store::{QueryExecutor, ResultSink, SinkSummary};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

pub use differ::DifferOutcome;
pub use source::{SourceOutcome, WindowSource};

const OP_RECONCILE: &str = "reconcile";

/// What a completed (or cancelled) run got through
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub run_id: RunId,
    pub source: SourceOutcome,
    pub differ: DifferOutcome,
    pub sink: SinkSummary,
}

impl RunSummary {
    pub fn cancelled(&self) -> bool {
        self.source.cancelled
    }
}

/// One reconciliation run over a fixed range
pub struct Pipeline {
    source: WindowSource,
    sink: ResultSink,
    run_id: RunId,
}

impl Pipeline {
    pub fn new(
        old: Arc<dyn QueryExecutor>,
        new: Arc<dyn QueryExecutor>,
        range: RangeConfig,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            source: WindowSource::new(old, new, range),
            sink: ResultSink::new(output_dir, range),
            run_id: RunId::new(),
        }
    }

    /// Replace the default result sink; it must still be idle.
    pub fn with_sink(mut self, sink: ResultSink) -> Self {
        self.sink = sink;
        self
    }

    pub fn run_id(&self) -> &RunId {
        &self.run_id
    }

    /// Run all three stages to completion.
    ///
    /// The result logs are opened before any store is queried, so an
    /// unusable output directory fails the run without retrieving anything.
    ///
    /// # Errors
    ///
    /// The first of: the source's retrieval error, the sink's persistence
    /// error, or an internal error if a stage task died.
    pub async fn run(self, cancel: CancellationToken) -> Result<RunSummary> {
        let span = tracing::info_span!("reconcile", run_id = %self.run_id);
        self.run_stages(cancel).instrument(span).await
    }

    async fn run_stages(self, cancel: CancellationToken) -> Result<RunSummary> {
        let started = Instant::now();
        let range = self.source.range();
        log_op_start!(
            OP_RECONCILE,
            start = range.start(),
            end = range.end(),
            step = range.step(),
            windows = range.window_count(),
            output_dir = %self.sink.dir().display()
        );

        let mut sink = self.sink;
        if let Err(e) = sink.initialize() {
            log_op_error!(OP_RECONCILE, e, duration_ms = elapsed_ms(started));
            return Err(e);
        }

        let (pair_tx, pair_rx) = mpsc::channel(1);
        let (diff_tx, diff_rx) = mpsc::channel(1);

        let source_task = tokio::spawn(self.source.run(pair_tx, cancel).in_current_span());
        let differ_task = tokio::spawn(differ::run_differ(pair_rx, diff_tx, range).in_current_span());
        let sink_span = tracing::Span::current();
        let sink_task = tokio::task::spawn_blocking(move || {
            let _entered = sink_span.enter();
            sink::drain_into_sink(sink, diff_rx)
        });

        let (source_res, differ_res, sink_res) = tokio::join!(source_task, differ_task, sink_task);

        let source_res = source_res.map_err(|e| stage_died("window_source", e)).and_then(|r| r);
        let differ_res = differ_res.map_err(|e| stage_died("differ", e));
        let sink_res = sink_res.map_err(|e| stage_died("result_sink", e)).and_then(|r| r);

        let summary = match (source_res, differ_res, sink_res) {
            (Ok(source), Ok(differ), Ok(sink)) => RunSummary {
                run_id: self.run_id,
                source,
                differ,
                sink,
            },
            (source, differ, sink) => {
                let err = first_error(source.err(), differ.err(), sink.err());
                log_op_error!(
                    OP_RECONCILE,
                    err,
                    duration_ms = elapsed_ms(started)
                );
                return Err(err);
            }
        };

        log_op_end!(
            OP_RECONCILE,
            duration_ms = elapsed_ms(started),
            cancelled = summary.cancelled(),
            stopped_at = summary.source.next_boundary,
            windows_fetched = summary.source.windows_fetched,
            windows_written = summary.sink.windows_written,
            rows_written = summary.sink.rows_written,
            progress_marker = ?summary.sink.progress_marker
        );

        Ok(summary)
    }
}

/// Pick the error to report: retrieval before persistence before internal.
fn first_error(
    source: Option<ExError>,
    differ: Option<ExError>,
    sink: Option<ExError>,
) -> ExError {
    source
        .or(sink)
        .or(differ)
        .unwrap_or_else(|| ExError::new(ExErrorKind::Internal).with_op(OP_RECONCILE))
}

fn stage_died(stage: &str, err: tokio::task::JoinError) -> ExError {
    ExError::new(ExErrorKind::Internal)
        .with_op(stage.to_string())
        .with_message(format!("stage task did not complete: {}", err))
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}

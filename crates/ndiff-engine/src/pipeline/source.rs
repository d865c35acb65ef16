//! Window source stage.
//!
//! Walks the configured range one window at a time. Each window is fetched
//! from both stores by two independent tasks; the window only moves on once
//! both have finished. Cancellation is checked before a window starts, never
//! during one.

use ndiff_core::errors::{ExError, ExErrorKind, Result};
use ndiff_core::schema::{EVENT_CANCELLED, EVENT_WINDOW_EMPTY, EVENT_WINDOW_FETCHED};
use ndiff_core::{RangeConfig, Record, Snapshot, SourceSide, WindowPair};
use ndiff_store::errors::window_retrieval_error;
use ndiff_store::queries::select_by_height_range;
use ndiff_store::QueryExecutor;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// How far a window source got before it stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceOutcome {
    /// First boundary not yet handled: every window below it was either
    /// forwarded or skipped as empty (`>= end` after a full walk)
    pub next_boundary: u64,
    pub windows_fetched: u64,
    pub windows_forwarded: u64,
    /// Stopped because the cancellation token fired
    pub cancelled: bool,
    /// Stopped because the next stage stopped receiving
    pub downstream_closed: bool,
}

pub struct WindowSource {
    old: Arc<dyn QueryExecutor>,
    new: Arc<dyn QueryExecutor>,
    range: RangeConfig,
}

impl WindowSource {
    pub fn new(old: Arc<dyn QueryExecutor>, new: Arc<dyn QueryExecutor>, range: RangeConfig) -> Self {
        Self { old, new, range }
    }

    pub fn range(&self) -> RangeConfig {
        self.range
    }

    /// Fetch both snapshots of the window starting at `boundary`.
    ///
    /// Both retrievals run to completion before their results are looked at;
    /// if either failed, the old side's error is reported first.
    pub async fn fetch_window(&self, boundary: u64) -> Result<WindowPair> {
        let upper = self.range.window_end(boundary);

        let old_task = tokio::spawn(fetch_snapshot(
            Arc::clone(&self.old),
            SourceSide::Old,
            boundary,
            upper,
        ));
        let new_task = tokio::spawn(fetch_snapshot(
            Arc::clone(&self.new),
            SourceSide::New,
            boundary,
            upper,
        ));
        let (old, new) = tokio::join!(old_task, new_task);

        let old = old.map_err(|e| join_error(SourceSide::Old, boundary, e))??;
        let new = new.map_err(|e| join_error(SourceSide::New, boundary, e))??;

        tracing::debug!(
            component = module_path!(),
            event = EVENT_WINDOW_FETCHED,
            boundary,
            to_boundary = upper,
            old = old.len(),
            new = new.len(),
            "fetched window"
        );

        Ok(WindowPair::new(boundary, old, new))
    }

    /// Produce window pairs into `out` in ascending boundary order.
    ///
    /// Windows where both stores returned nothing are logged and skipped.
    /// Returns early without error if `out` is closed.
    ///
    /// # Errors
    ///
    /// `Retrieval` if either store fails for any window; nothing from that
    /// window is forwarded.
    pub async fn run(
        self,
        out: mpsc::Sender<WindowPair>,
        cancel: CancellationToken,
    ) -> Result<SourceOutcome> {
        let mut outcome = SourceOutcome {
            next_boundary: self.range.start(),
            windows_fetched: 0,
            windows_forwarded: 0,
            cancelled: false,
            downstream_closed: false,
        };

        for boundary in self.range.boundaries() {
            if cancel.is_cancelled() {
                tracing::info!(
                    component = module_path!(),
                    event = EVENT_CANCELLED,
                    boundary,
                    "window source stopped on cancellation"
                );
                outcome.cancelled = true;
                break;
            }

            let pair = self.fetch_window(boundary).await?;
            outcome.windows_fetched += 1;
            let to_boundary = self.range.window_end(boundary);

            if pair.is_empty() {
                tracing::info!(
                    component = module_path!(),
                    event = EVENT_WINDOW_EMPTY,
                    boundary,
                    to_boundary,
                    "processed window, no records"
                );
                outcome.next_boundary = to_boundary;
                continue;
            }

            if out.send(pair).await.is_err() {
                tracing::debug!(
                    component = module_path!(),
                    boundary,
                    "differ stopped receiving, window source exiting"
                );
                outcome.downstream_closed = true;
                break;
            }
            outcome.windows_forwarded += 1;
            outcome.next_boundary = to_boundary;
        }

        Ok(outcome)
    }
}

async fn fetch_snapshot(
    executor: Arc<dyn QueryExecutor>,
    side: SourceSide,
    boundary: u64,
    upper: u64,
) -> Result<Snapshot> {
    let rows = executor
        .query_range(select_by_height_range(side), boundary, upper)
        .await
        .map_err(|e| window_retrieval_error(side, boundary, e))?;

    Ok(rows.into_iter().map(Record::from).collect())
}

fn join_error(side: SourceSide, boundary: u64, err: tokio::task::JoinError) -> ExError {
    ExError::new(ExErrorKind::Internal)
        .with_op("fetch_window")
        .with_source_name(side.as_str())
        .with_boundary(boundary)
        .with_message(format!("retrieval task did not complete: {}", err))
}

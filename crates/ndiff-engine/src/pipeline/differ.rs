//! Differ stage.
//!
//! Turns each window pair into its diff result and forwards only results
//! that actually differ.

use ndiff_core::compute_diff;
use ndiff_core::schema::{EVENT_WINDOW_DIFF, EVENT_WINDOW_NO_DIFF};
use ndiff_core::{DiffResult, RangeConfig, WindowPair};
use tokio::sync::mpsc;

/// Counters reported when the differ stage ends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DifferOutcome {
    pub windows_diffed: u64,
    pub results_forwarded: u64,
}

/// Diff window pairs until the source is exhausted or the sink stops.
pub async fn run_differ(
    mut input: mpsc::Receiver<WindowPair>,
    out: mpsc::Sender<DiffResult>,
    range: RangeConfig,
) -> DifferOutcome {
    let mut outcome = DifferOutcome::default();

    while let Some(pair) = input.recv().await {
        let result = compute_diff(&pair);
        outcome.windows_diffed += 1;

        if result.is_empty() {
            tracing::info!(
                component = module_path!(),
                event = EVENT_WINDOW_NO_DIFF,
                boundary = result.boundary,
                to_boundary = range.window_end(result.boundary),
                "processed window, no diff"
            );
            continue;
        }

        tracing::info!(
            component = module_path!(),
            event = EVENT_WINDOW_DIFF,
            boundary = result.boundary,
            not_in_new = result.not_in_new.len(),
            not_in_old = result.not_in_old.len(),
            "window has diff"
        );

        if out.send(result).await.is_err() {
            tracing::debug!(component = module_path!(), "sink stopped receiving, differ exiting");
            break;
        }
        outcome.results_forwarded += 1;
    }

    outcome
}

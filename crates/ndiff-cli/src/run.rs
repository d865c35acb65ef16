//! Reconciliation run
//!
//! Usage: ndiff --end-height <HEIGHT> [--start-height <HEIGHT>] [--step <N>]

use crate::Cli;
use ndiff_core::errors::{ExError, Result};
use ndiff_core::schema::{EVENT_CANCELLED, EVENT_RUN_FAILED};
use ndiff_engine::{Pipeline, RunSummary};
use ndiff_store::clickhouse::ClickHouseExecutor;
use std::process::ExitCode;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Run to completion and map the outcome to an exit code.
///
/// Cancellation is a clean stop and exits 0.
pub async fn execute(cli: Cli) -> ExitCode {
    match reconcile(&cli).await {
        Ok(summary) => {
            if summary.cancelled() {
                tracing::info!(
                    component = module_path!(),
                    event = EVENT_CANCELLED,
                    run_id = %summary.run_id,
                    boundary = summary.source.next_boundary,
                    "stopped on interrupt"
                );
            }
            ExitCode::SUCCESS
        }
        Err(err) => {
            report_failure(&err);
            ExitCode::FAILURE
        }
    }
}

async fn reconcile(cli: &Cli) -> Result<RunSummary> {
    let config = cli.run_config()?;

    let old = ClickHouseExecutor::connect("old", &config.endpoints.old).await?;
    let new = ClickHouseExecutor::connect("new", &config.endpoints.new).await?;

    let cancel = CancellationToken::new();
    let interrupt = tokio::spawn(cancel_on_interrupt(cancel.clone()));

    let result = Pipeline::new(Arc::new(old), Arc::new(new), config.range, config.output_dir)
        .run(cancel)
        .await;

    interrupt.abort();
    result
}

fn report_failure(err: &ExError) {
    tracing::error!(
        component = module_path!(),
        event = EVENT_RUN_FAILED,
        err_kind = ?err.kind(),
        err_code = err.code(),
        op = err.op().unwrap_or("unknown"),
        source = err.source_name(),
        boundary = err.boundary(),
        error = %err,
        "run failed"
    );
}

/// Cancel `token` on the first Ctrl-C or SIGTERM.
async fn cancel_on_interrupt(token: CancellationToken) {
    wait_for_interrupt().await;
    tracing::info!(
        component = module_path!(),
        "interrupt received, finishing the current window"
    );
    token.cancel();
}

#[cfg(unix)]
async fn wait_for_interrupt() {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::terminate()) {
        Ok(mut terminate) => {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {}
                _ = terminate.recv() => {}
            }
        }
        Err(e) => {
            tracing::warn!(
                component = module_path!(),
                error = %e,
                "SIGTERM handler unavailable, listening for Ctrl-C only"
            );
            tokio::signal::ctrl_c().await.ok();
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_interrupt() {
    tokio::signal::ctrl_c().await.ok();
}

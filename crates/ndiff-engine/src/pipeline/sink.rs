//! Sink stage.
//!
//! Runs on a blocking thread: the result sink does synchronous file I/O and
//! is the only owner of the log handles and the progress marker.

use ndiff_core::errors::Result;
use ndiff_core::DiffResult;
use ndiff_store::{ResultSink, SinkSummary};
use tokio::sync::mpsc;

/// Persist every incoming result, then close the sink.
///
/// On a persistence failure the receiver is dropped on return, which stops
/// the upstream stages at their next send.
pub fn drain_into_sink(
    mut sink: ResultSink,
    mut input: mpsc::Receiver<DiffResult>,
) -> Result<SinkSummary> {
    while let Some(result) = input.blocking_recv() {
        if let Err(e) = sink.append(&result) {
            sink.close()?;
            return Err(e);
        }
    }

    sink.close()
}

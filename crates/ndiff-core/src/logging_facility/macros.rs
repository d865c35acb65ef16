//! Operation lifecycle macros
//!
//! Every long-running operation (a whole reconciliation, a stage) logs one
//! `start` event and exactly one of `end` / `end_error`. Extra fields are
//! passed through to `tracing` unchanged.

/// Log that `op` started
///
/// ```
/// # use ndiff_core::log_op_start;
/// log_op_start!("reconcile");
/// log_op_start!("reconcile", start = 21_000u64, end = 21_500u64, step = 100u64);
/// ```
#[macro_export]
macro_rules! log_op_start {
    ($op:expr $(, $($field:tt)+)?) => {
        tracing::info!(
            component = module_path!(),
            op = $op,
            event = $crate::schema::EVENT_START,
            $($($field)+)?
        );
    };
}

/// Log that `op` finished; `duration_ms` is required
///
/// ```
/// # use ndiff_core::log_op_end;
/// log_op_end!("reconcile", duration_ms = 1_250u64, windows_written = 3u64);
/// ```
#[macro_export]
macro_rules! log_op_end {
    ($op:expr, duration_ms = $duration:expr $(, $($field:tt)+)?) => {
        tracing::info!(
            component = module_path!(),
            op = $op,
            event = $crate::schema::EVENT_END,
            duration_ms = $duration,
            $($($field)+)?
        );
    };
}

/// Log that `op` failed with an [`ExError`](crate::errors::ExError)
///
/// The error is borrowed, so it can still be returned afterwards. Its kind,
/// code, source side and window boundary become fields of the event.
///
/// ```
/// # use ndiff_core::log_op_error;
/// # use ndiff_core::errors::{ExError, ExErrorKind};
/// let err = ExError::new(ExErrorKind::Retrieval)
///     .with_source_name("old")
///     .with_boundary(21_300);
/// log_op_error!("reconcile", err, duration_ms = 10u64);
/// assert_eq!(err.boundary(), Some(21_300));
/// ```
#[macro_export]
macro_rules! log_op_error {
    ($op:expr, $err:expr, duration_ms = $duration:expr $(, $($field:tt)+)?) => {{
        let ex_err: &$crate::errors::ExError = &$err;
        tracing::error!(
            component = module_path!(),
            op = $op,
            event = $crate::schema::EVENT_END_ERROR,
            duration_ms = $duration,
            err_kind = ?ex_err.kind(),
            err_code = ex_err.code(),
            source = ex_err.source_name(),
            boundary = ex_err.boundary(),
            error = %ex_err,
            $($($field)+)?
        );
    }};
}

//! Error handling for ndiff-store
//!
//! Wraps ndiff-core ExError with store-specific helpers

use ndiff_core::errors::{ExError, ExErrorKind};
use ndiff_core::SourceSide;
use std::path::Path;

/// Result type alias using ExError
pub type Result<T> = std::result::Result<T, ExError>;

/// Create a retrieval error for a source
pub fn retrieval_error(op: &str, executor: &str, message: impl Into<String>) -> ExError {
    ExError::new(ExErrorKind::Retrieval)
        .with_op(op.to_string())
        .with_source_name(executor.to_string())
        .with_message(message)
}

/// Attach window context to a failed retrieval
pub fn window_retrieval_error(side: SourceSide, boundary: u64, cause: ExError) -> ExError {
    ExError::new(ExErrorKind::Retrieval)
        .with_op("fetch_window")
        .with_source_name(side.as_str())
        .with_boundary(boundary)
        .with_message(format!("failed to fetch records from {} store", side))
        .with_source(cause)
}

/// Create a result log persistence error
pub fn persistence_error(op: &str, path: &Path, err: impl std::fmt::Display) -> ExError {
    ExError::new(ExErrorKind::Persistence)
        .with_op(op.to_string())
        .with_message(format!("{}: {}", path.display(), err))
}


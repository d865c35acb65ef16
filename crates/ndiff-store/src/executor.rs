//! Query executor seam
//!
//! The pipeline sees each analytical store only through [`QueryExecutor`]:
//! run a fixed query bounded to `[lower, upper)` and get rows back.

use crate::errors::Result;
use async_trait::async_trait;
use ndiff_core::Record;

/// One row as returned by a store query: `(key, height, index, type)`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordRow {
    pub key: String,
    pub height: u64,
    pub index: u64,
    pub kind: u8,
}

impl From<RecordRow> for Record {
    fn from(row: RecordRow) -> Self {
        Record::new(row.key, row.height, row.index, row.kind)
    }
}

/// Executes range-bounded queries against one store
///
/// Implementations are opened once at startup and shared read-only by the
/// retrieval tasks of every window.
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    /// Name used in logs and error context
    fn name(&self) -> &str;

    /// Run `sql` with its two positional parameters bound to `lower` and `upper`.
    ///
    /// A query matching nothing returns an empty vector, never an error.
    async fn query_range(&self, sql: &str, lower: u64, upper: u64) -> Result<Vec<RecordRow>>;
}

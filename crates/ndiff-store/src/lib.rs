//! ndiff Store - the pipeline's edges to the outside world
//!
//! Provides:
//! - The `QueryExecutor` seam and the fixed per-source range queries
//! - A ClickHouse executor for production runs and an in-memory one for tests
//! - The append-only CSV result sink with progress tracking

pub mod clickhouse;
pub mod errors;
pub mod executor;
pub mod memory;
pub mod queries;
pub mod sink;

// Re-export key types
pub use errors::Result;
pub use executor::{QueryExecutor, RecordRow};
pub use sink::{ResultSink, SinkPhase, SinkSummary};

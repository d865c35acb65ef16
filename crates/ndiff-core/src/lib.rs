//! ndiff Core - windowed reconciliation kernel
//!
//! This crate provides the pieces of a reconciliation run that do not touch
//! the outside world:
//! - Record, Snapshot, WindowPair and DiffResult models
//! - The window differ (symmetric difference, ordered by height and index)
//! - Run configuration with range validation and defaults
//! - The error facility shared by every crate in the workspace
//! - The structured logging facility

pub mod config;
pub mod diff;
pub mod errors;
pub mod logging_facility;
pub mod model;

pub use ndiff_core_types::schema;

// Re-export commonly used types
pub use config::{EndpointConfig, EndpointsConfig, RangeConfig, RawRange, RunConfig};
pub use diff::compute_diff;
pub use errors::{ConfigError, ExError, ExErrorKind, Result};
pub use model::{DiffResult, Record, Snapshot, SourceSide, WindowPair};

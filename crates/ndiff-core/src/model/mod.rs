//! Domain model for windowed reconciliation
//!
//! - [`Record`]: one row retrieved from a source, identified by its key
//! - [`Snapshot`]: the records of one source for one window, keyed by record key
//! - [`WindowPair`]: a window boundary with the old and new snapshots to compare
//! - [`DiffResult`]: the ordered symmetric difference of a window

pub mod record;
pub mod window;

pub use record::{Record, SourceSide};
pub use window::{DiffResult, Snapshot, WindowPair};

//! ndiff Engine - Orchestration layer
//!
//! Runs the three-stage reconciliation pipeline: the window source fetches
//! both snapshots per window, the differ computes their symmetric
//! difference, and the sink appends non-empty differences to the result
//! logs.

pub mod pipeline;

pub use pipeline::{Pipeline, RunSummary};

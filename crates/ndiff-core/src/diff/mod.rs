//! Window diff engine.
//!
//! Compares the old and new snapshots of one window and produces the
//! ordered symmetric difference of their key sets.
//!
//! ## Entry point
//!
//! ```
//! use ndiff_core::diff::compute_diff;
//! use ndiff_core::model::{Record, Snapshot, WindowPair};
//!
//! let old: Snapshot = vec![Record::new("a", 100, 1, 3), Record::new("b", 100, 2, 3)]
//!     .into_iter()
//!     .collect();
//! let new: Snapshot = std::iter::once(Record::new("a", 100, 1, 3)).collect();
//!
//! let result = compute_diff(&WindowPair::new(100, old, new));
//! assert_eq!(result.not_in_new.len(), 1);
//! assert!(result.not_in_old.is_empty());
//! ```
//!
//! ## Guarantees
//!
//! - **Key identity**: only keys are compared; value fields never make a record differ.
//! - **Ordering**: each output list is ascending by `(height, index)`.
//! - **Determinism**: identical inputs produce identical output regardless of
//!   hash iteration order.

pub mod engine;

pub use engine::{compute_diff, record_order};

//! Symmetric difference computation.

use crate::model::{DiffResult, Record, Snapshot, WindowPair};
use std::cmp::Ordering;

/// Output order for diff records: height, then index.
///
/// The key is a final tie-break so that records sharing a position still
/// come out in the same order on every run.
pub fn record_order(a: &Record, b: &Record) -> Ordering {
    a.height
        .cmp(&b.height)
        .then(a.index.cmp(&b.index))
        .then_with(|| a.key.cmp(&b.key))
}

/// Records of `from` whose key does not appear in `other`, in output order.
fn missing_from(from: &Snapshot, other: &Snapshot) -> Vec<Record> {
    let mut missing: Vec<Record> = from
        .records()
        .filter(|record| !other.contains_key(&record.key))
        .cloned()
        .collect();
    missing.sort_by(record_order);
    missing
}

/// Compute the symmetric difference of a window's two snapshots.
///
/// `not_in_new` holds old-only records (values taken from the old snapshot),
/// `not_in_old` holds new-only records (values taken from the new snapshot).
/// The result may be empty; filtering empty results is the caller's job.
pub fn compute_diff(pair: &WindowPair) -> DiffResult {
    DiffResult {
        boundary: pair.boundary,
        not_in_new: missing_from(&pair.old, &pair.new),
        not_in_old: missing_from(&pair.new, &pair.old),
    }
}

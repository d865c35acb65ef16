use crate::model::record::Record;
use std::collections::HashMap;

/// The records one source holds for one window, keyed by record key
///
/// Built per window and discarded after diffing. Duplicate keys collapse
/// with last-write-wins.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    records: HashMap<String, Record>,
}

impl Snapshot {
    /// Create an empty snapshot
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a record, replacing any earlier record with the same key
    pub fn insert(&mut self, record: Record) {
        self.records.insert(record.key.clone(), record);
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.records.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<&Record> {
        self.records.get(key)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Iterate over records in unspecified order
    pub fn records(&self) -> impl Iterator<Item = &Record> {
        self.records.values()
    }
}

impl FromIterator<Record> for Snapshot {
    fn from_iter<I: IntoIterator<Item = Record>>(iter: I) -> Self {
        let mut snapshot = Snapshot::new();
        for record in iter {
            snapshot.insert(record);
        }
        snapshot
    }
}

/// A window boundary paired with both sources' snapshots
#[derive(Debug, Clone, PartialEq)]
pub struct WindowPair {
    /// Inclusive start of the window
    pub boundary: u64,
    pub old: Snapshot,
    pub new: Snapshot,
}

impl WindowPair {
    pub fn new(boundary: u64, old: Snapshot, new: Snapshot) -> Self {
        Self { boundary, old, new }
    }

    /// True when neither source returned any record for the window
    pub fn is_empty(&self) -> bool {
        self.old.is_empty() && self.new.is_empty()
    }
}

/// The ordered symmetric difference of one window
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffResult {
    /// Inclusive start of the window
    pub boundary: u64,
    /// Records in the old snapshot whose key is absent from the new one
    pub not_in_new: Vec<Record>,
    /// Records in the new snapshot whose key is absent from the old one
    pub not_in_old: Vec<Record>,
}

impl DiffResult {
    /// True when both sides agree on the window's key set
    pub fn is_empty(&self) -> bool {
        self.not_in_new.is_empty() && self.not_in_old.is_empty()
    }

    /// Total number of differing records
    pub fn len(&self) -> usize {
        self.not_in_new.len() + self.not_in_old.len()
    }
}

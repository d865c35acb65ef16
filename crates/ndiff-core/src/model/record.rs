use serde::{Deserialize, Serialize};
use std::fmt;

/// A single record retrieved from one of the compared stores
///
/// Identity is the `key` alone: two records with the same key are the same
/// record for diffing purposes, whatever their other fields hold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// Unique identifying key (hex transaction id)
    pub key: String,

    /// Ordered numeric position (block height)
    pub height: u64,

    /// Secondary ordering key within a height
    pub index: u64,

    /// Categorical type code
    pub kind: u8,

    /// Auxiliary numeric field, carried but never compared or written
    pub number: i64,
}

impl Record {
    /// Create a record with a zero auxiliary field
    pub fn new(key: impl Into<String>, height: u64, index: u64, kind: u8) -> Self {
        Self {
            key: key.into(),
            height,
            index,
            kind,
            number: 0,
        }
    }
}

/// Which of the two compared stores a snapshot came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceSide {
    Old,
    New,
}

impl SourceSide {
    /// Stable lowercase name used in logs and error context
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceSide::Old => "old",
            SourceSide::New => "new",
        }
    }

    /// Type codes each store is queried for.
    ///
    /// The old store keeps types 3 and 5, the new store only type 3.
    pub fn allowed_types(&self) -> &'static [u8] {
        match self {
            SourceSide::Old => &[3, 5],
            SourceSide::New => &[3],
        }
    }
}

impl fmt::Display for SourceSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

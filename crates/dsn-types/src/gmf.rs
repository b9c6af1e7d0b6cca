//! Global Memory Field data types: the accepted-object map, its delta log,
//! and snapshot headers used to bring new peers up to date.

use crate::semantic_object::SemanticObject;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// The kind of change a [`DeltaRecord`] describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeltaKind {
    /// A new object entered the GMF.
    Insert,
    /// An existing entry's weight changed.
    UpdateWeight,
}

/// A single GMF mutation, appended to the delta log on every `insert` or
/// `updateWeight` so peers can replay changes since a known snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeltaRecord {
    /// What kind of change occurred.
    pub kind: DeltaKind,
    /// The id of the object this delta concerns.
    pub id: String,
    /// The entry's new weight, present for both kinds (an `insert` delta
    /// records the entry's initial weight).
    pub weight: Option<f64>,
    /// When the change was applied locally.
    pub timestamp: DateTime<Utc>,
    /// The snapshot generation this delta belongs to; `getDeltasSince(s)`
    /// returns every delta with `snapshot_id > s`.
    pub snapshot_id: u64,
}

/// An entry in the Global Memory Field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GmfEntry {
    /// The object held at this entry.
    pub object: SemanticObject,
    /// The entry's current weight (1.0 for a freshly accepted proposal;
    /// subject to decay/boost via `updateWeight`).
    pub weight: f64,
    /// Free-form metadata, e.g. a cached semantic vector for `querySimilar`.
    #[serde(default)]
    pub metadata: BTreeMap<String, Value>,
    /// When this entry was first inserted.
    pub inserted_at: DateTime<Utc>,
    /// Number of times this entry has been read.
    pub access_count: u64,
}

impl GmfEntry {
    /// Builds a freshly inserted entry with zero accesses.
    pub fn new(object: SemanticObject, weight: f64, metadata: BTreeMap<String, Value>) -> Self {
        Self {
            object,
            weight,
            metadata,
            inserted_at: Utc::now(),
            access_count: 0,
        }
    }
}

/// A single entry summary carried in a [`SnapshotHeader`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotEntrySummary {
    /// The entry's object id.
    pub id: String,
    /// The entry's term's normal-form signature at snapshot time.
    pub nf_signature: String,
    /// The entry's weight at snapshot time.
    pub weight: f64,
    /// When the entry was originally inserted.
    pub inserted_at: DateTime<Utc>,
}

/// A compact summary of a GMF snapshot, exchanged during synchronization so
/// a peer can tell whether it needs a full snapshot or can replay deltas.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotHeader {
    /// A content-derived identifier for this snapshot.
    pub id: String,
    /// When the snapshot was produced.
    pub timestamp: DateTime<Utc>,
    /// Number of entries included in the snapshot.
    pub object_count: usize,
    /// Per-entry summaries.
    pub entries: Vec<SnapshotEntrySummary>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::term::Term;

    #[test]
    fn gmf_entry_starts_with_zero_accesses() {
        let object = SemanticObject::new(Term::noun(23).unwrap(), BTreeMap::new());
        let entry = GmfEntry::new(object, 1.0, BTreeMap::new());
        assert_eq!(entry.access_count, 0);
        assert_eq!(entry.weight, 1.0);
    }

    #[test]
    fn delta_kinds_round_trip_through_json() {
        for kind in [DeltaKind::Insert, DeltaKind::UpdateWeight] {
            let json = serde_json::to_string(&kind).unwrap();
            let back: DeltaKind = serde_json::from_str(&json).unwrap();
            assert_eq!(kind, back);
        }
    }
}

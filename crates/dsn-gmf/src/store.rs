//! The Global Memory Field: the accepted-object map, its append-only delta
//! log, and snapshot production.

use crate::error::{GmfError, GmfResult};
use chrono::Utc;
use dsn_calculus::evaluator::evaluate;
use dsn_types::gmf::{DeltaKind, DeltaRecord, GmfEntry, SnapshotEntrySummary, SnapshotHeader};
use dsn_types::semantic_object::SemanticObject;
use dsn_types::term::Term;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

/// The Global Memory Field store.
///
/// `insert`/`updateWeight` mutate `entries` and append to `deltas` under
/// the same lock acquisition order (entries, then deltas) everywhere in
/// this module, so a reader never observes a delta without its
/// corresponding entry mutation already visible.
pub struct Gmf {
    entries: RwLock<BTreeMap<String, GmfEntry>>,
    deltas: RwLock<Vec<DeltaRecord>>,
    snapshot_id: AtomicU64,
    max_eval_steps: u64,
}

impl Gmf {
    /// Creates an empty GMF. `max_eval_steps` bounds the normal-form
    /// recomputation `snapshot` performs for each entry's `nfSignature`.
    pub fn new(max_eval_steps: u64) -> Self {
        Self {
            entries: RwLock::new(BTreeMap::new()),
            deltas: RwLock::new(Vec::new()),
            snapshot_id: AtomicU64::new(0),
            max_eval_steps,
        }
    }

    fn current_snapshot_id(&self) -> u64 {
        self.snapshot_id.load(Ordering::SeqCst)
    }

    /// Inserts `object` with the given initial `weight`, appending an
    /// `insert` delta. Returns the entry's id.
    pub fn insert(&self, object: SemanticObject, weight: f64, metadata: BTreeMap<String, Value>) -> String {
        let id = object.id.clone();
        let entry = GmfEntry::new(object, weight, metadata);
        #[allow(clippy::unwrap_used)]
        {
            self.entries.write().unwrap().insert(id.clone(), entry);
        }
        self.append_delta(DeltaKind::Insert, id.clone(), Some(weight));
        id
    }

    /// Mutates an existing entry's weight, appending an `update_weight`
    /// delta.
    pub fn update_weight(&self, id: &str, weight: f64) -> GmfResult<()> {
        #[allow(clippy::unwrap_used)]
        {
            let mut entries = self.entries.write().unwrap();
            let entry = entries.get_mut(id).ok_or_else(|| GmfError::NotFound(id.to_string()))?;
            entry.weight = weight;
        }
        self.append_delta(DeltaKind::UpdateWeight, id.to_string(), Some(weight));
        Ok(())
    }

    /// Reads a single entry, incrementing its access counter.
    pub fn get(&self, id: &str) -> Option<GmfEntry> {
        #[allow(clippy::unwrap_used)]
        let mut entries = self.entries.write().unwrap();
        let entry = entries.get_mut(id)?;
        entry.access_count += 1;
        Some(entry.clone())
    }

    /// Total number of entries currently held (including unrehydrated
    /// placeholders).
    pub fn len(&self) -> usize {
        #[allow(clippy::unwrap_used)]
        self.entries.read().unwrap().len()
    }

    /// Whether the GMF currently holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// A point-in-time clone of every entry, for read-heavy scans
    /// (similarity search) that shouldn't hold the lock for their
    /// duration.
    pub fn entries_snapshot(&self) -> Vec<GmfEntry> {
        #[allow(clippy::unwrap_used)]
        self.entries.read().unwrap().values().cloned().collect()
    }

    fn append_delta(&self, kind: DeltaKind, id: String, weight: Option<f64>) {
        let record = DeltaRecord {
            kind,
            id,
            weight,
            timestamp: Utc::now(),
            snapshot_id: self.current_snapshot_id(),
        };
        #[allow(clippy::unwrap_used)]
        {
            self.deltas.write().unwrap().push(record);
        }
    }

    /// Bumps the snapshot generation, clears the delta log, and returns a
    /// compact header summarizing every entry as of now.
    pub fn snapshot(&self) -> SnapshotHeader {
        let new_id = self.snapshot_id.fetch_add(1, Ordering::SeqCst) + 1;
        #[allow(clippy::unwrap_used)]
        {
            self.deltas.write().unwrap().clear();
        }

        #[allow(clippy::unwrap_used)]
        let entries = self.entries.read().unwrap();
        let summaries: Vec<SnapshotEntrySummary> = entries
            .values()
            .map(|entry| SnapshotEntrySummary {
                id: entry.object.id.clone(),
                nf_signature: evaluate(&entry.object.term, self.max_eval_steps).signature(),
                weight: entry.weight,
                inserted_at: entry.inserted_at,
            })
            .collect();

        SnapshotHeader {
            id: format!("snap-{new_id}"),
            timestamp: Utc::now(),
            object_count: summaries.len(),
            entries: summaries,
        }
    }

    /// Returns every delta recorded under a snapshot generation greater
    /// than `snap_id`.
    pub fn deltas_since(&self, snap_id: u64) -> Vec<DeltaRecord> {
        #[allow(clippy::unwrap_used)]
        self.deltas
            .read()
            .unwrap()
            .iter()
            .filter(|d| d.snapshot_id > snap_id)
            .cloned()
            .collect()
    }

    /// Replays `deltas` against this GMF.
    ///
    /// `update_weight` deltas are idempotent: replaying the same delta
    /// twice leaves the entry in the same state. `insert` deltas for an id
    /// this GMF has never seen create a placeholder entry (an `Undefined`
    /// term, weight `0.0`) that stays referenced until a real object with
    /// that id is fetched and rehydrated via [`Gmf::rehydrate`].
    pub fn apply_deltas(&self, deltas: &[DeltaRecord]) {
        for delta in deltas {
            match delta.kind {
                DeltaKind::UpdateWeight => {
                    if let Some(weight) = delta.weight {
                        #[allow(clippy::unwrap_used)]
                        let mut entries = self.entries.write().unwrap();
                        if let Some(entry) = entries.get_mut(&delta.id) {
                            entry.weight = weight;
                        }
                    }
                }
                DeltaKind::Insert => {
                    #[allow(clippy::unwrap_used)]
                    let mut entries = self.entries.write().unwrap();
                    entries.entry(delta.id.clone()).or_insert_with(|| {
                        GmfEntry::new(
                            SemanticObject {
                                id: delta.id.clone(),
                                term: Term::undefined("placeholder-pending-rehydration"),
                                metadata: BTreeMap::new(),
                                timestamp: delta.timestamp,
                            },
                            delta.weight.unwrap_or(0.0),
                            BTreeMap::new(),
                        )
                    });
                }
            }
        }
    }

    /// Whether `id` names a placeholder entry awaiting rehydration (an
    /// `insert` delta was applied but the real object was never fetched).
    pub fn is_placeholder(&self, id: &str) -> bool {
        #[allow(clippy::unwrap_used)]
        let entries = self.entries.read().unwrap();
        entries
            .get(id)
            .map(|e| matches!(e.object.term.view(), dsn_types::term::TermView::Undefined(_)))
            .unwrap_or(false)
    }

    /// Replaces a placeholder entry's object once the real content has
    /// been fetched from a peer, preserving its current weight and
    /// metadata.
    pub fn rehydrate(&self, id: &str, object: SemanticObject) {
        #[allow(clippy::unwrap_used)]
        let mut entries = self.entries.write().unwrap();
        if let Some(entry) = entries.get_mut(id) {
            entry.object = object;
        }
    }

    /// Scans entries whose metadata carries a `"semantic_vector"` array,
    /// scores them against `query_vector` by cosine similarity, and returns
    /// the top `max_results` entries with similarity at or above
    /// `threshold`, sorted descending by similarity.
    pub fn query_similar(
        &self,
        query_vector: &[f64],
        threshold: f64,
        max_results: usize,
    ) -> Vec<(GmfEntry, f64)> {
        let mut scored: Vec<(GmfEntry, f64)> = self
            .entries_snapshot()
            .into_iter()
            .filter_map(|entry| {
                let vector = entry.metadata.get("semantic_vector")?.as_array()?;
                let vector: Vec<f64> = vector.iter().filter_map(Value::as_f64).collect();
                let similarity = cosine_similarity(query_vector, &vector);
                (similarity >= threshold).then_some((entry, similarity))
            })
            .collect();

        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(max_results);
        scored
    }
}

fn cosine_similarity(a: &[f64], b: &[f64]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f64 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f64>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f64>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn sample_object(prime: u64) -> SemanticObject {
        SemanticObject::new(Term::noun(prime).unwrap(), BTreeMap::new())
    }

    #[test]
    fn insert_then_snapshot_produces_one_entry() {
        let gmf = Gmf::new(1000);
        gmf.insert(sample_object(23), 1.0, BTreeMap::new());
        let header = gmf.snapshot();
        assert_eq!(header.object_count, 1);
        assert_eq!(header.entries[0].weight, 1.0);
    }

    #[test]
    fn snapshot_clears_the_delta_log() {
        let gmf = Gmf::new(1000);
        gmf.insert(sample_object(23), 1.0, BTreeMap::new());
        gmf.snapshot();
        assert!(gmf.deltas_since(0).is_empty());
    }

    #[test]
    fn deltas_since_filters_by_snapshot_generation() {
        let gmf = Gmf::new(1000);
        let id = gmf.insert(sample_object(23), 1.0, BTreeMap::new());
        let header = gmf.snapshot();
        gmf.update_weight(&id, 0.5).unwrap();
        let deltas = gmf.deltas_since(header.id.trim_start_matches("snap-").parse::<u64>().unwrap() - 1);
        assert_eq!(deltas.len(), 1);
    }

    #[test]
    fn apply_deltas_insert_creates_placeholder() {
        let gmf = Gmf::new(1000);
        let delta = DeltaRecord {
            kind: DeltaKind::Insert,
            id: "unknown-id".to_string(),
            weight: Some(0.0),
            timestamp: Utc::now(),
            snapshot_id: 0,
        };
        gmf.apply_deltas(&[delta]);
        assert!(gmf.is_placeholder("unknown-id"));
    }

    #[test]
    fn apply_deltas_update_weight_is_idempotent() {
        let gmf = Gmf::new(1000);
        let id = gmf.insert(sample_object(23), 1.0, BTreeMap::new());
        let delta = DeltaRecord {
            kind: DeltaKind::UpdateWeight,
            id: id.clone(),
            weight: Some(0.25),
            timestamp: Utc::now(),
            snapshot_id: 0,
        };
        gmf.apply_deltas(&[delta.clone()]);
        gmf.apply_deltas(&[delta]);
        assert_eq!(gmf.get(&id).unwrap().weight, 0.25);
    }

    #[test]
    fn query_similar_ranks_by_cosine_similarity_above_threshold() {
        let gmf = Gmf::new(1000);
        let mut meta_close = BTreeMap::new();
        meta_close.insert("semantic_vector".to_string(), serde_json::json!([1.0, 0.0]));
        let mut meta_far = BTreeMap::new();
        meta_far.insert("semantic_vector".to_string(), serde_json::json!([0.0, 1.0]));
        let close_id = gmf.insert(sample_object(23), 1.0, meta_close);
        gmf.insert(sample_object(29), 1.0, meta_far);

        let results = gmf.query_similar(&[1.0, 0.0], 0.5, 10);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].0.object.id, close_id);
    }

    #[test]
    fn query_similar_ignores_entries_without_a_semantic_vector() {
        let gmf = Gmf::new(1000);
        gmf.insert(sample_object(23), 1.0, BTreeMap::new());
        assert!(gmf.query_similar(&[1.0, 0.0], 0.0, 10).is_empty());
    }

    #[test]
    fn rehydrate_replaces_placeholder_object() {
        let gmf = Gmf::new(1000);
        let delta = DeltaRecord {
            kind: DeltaKind::Insert,
            id: "unknown-id".to_string(),
            weight: Some(0.0),
            timestamp: Utc::now(),
            snapshot_id: 0,
        };
        gmf.apply_deltas(&[delta]);
        gmf.rehydrate("unknown-id", sample_object(29));
        assert!(!gmf.is_placeholder("unknown-id"));
    }
}

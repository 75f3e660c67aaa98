//! Similarity retriever: finds past scans that look like the current one.
//!
//! Every stored entry gets an embedding of its [`summarize`]d snapshot. The
//! vectors live in the store's `entry_vectors` table and are mirrored in
//! memory for search. The index is a derived cache: [`SimilarityRetriever::reconcile`]
//! rebuilds it from the store at any time.

mod summary;

pub use summary::summarize;

use std::collections::BTreeSet;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Degradation, StoreError};
use crate::ports::{Embedder, EmbeddingRequest};
use crate::score::Category;
use crate::snapshot::Snapshot;
use crate::store::{EntryId, SnapshotStore};

/// Number of issue categories reported per neighbor.
const NEIGHBOR_ISSUES: usize = 3;

/// A past scan similar to the current one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Neighbor {
    /// Entry identifier.
    pub id: EntryId,
    /// Cosine similarity to the query.
    pub similarity: f32,
    /// When that scan ran.
    pub timestamp: DateTime<Utc>,
    /// Its messiness score.
    pub score: f64,
    /// Its largest contributing categories.
    pub top_issues: Vec<Category>,
}

/// Result of one reconciliation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ReconcileReport {
    /// Vectors removed because their entry does not exist.
    pub pruned: usize,
    /// Entries that received a fresh vector.
    pub embedded: usize,
    /// Entries still without a vector after the pass.
    pub missing: usize,
}

/// Neighbors for one cycle, plus the reason retrieval degraded if it did.
#[derive(Debug, Clone, Default)]
pub struct Retrieval {
    /// Vector computed for the current snapshot, if embedding succeeded.
    pub vector: Option<Vec<f32>>,
    /// Most similar past entries.
    pub neighbors: Vec<Neighbor>,
    /// Set when embedding failed or timed out.
    pub degradation: Option<Degradation>,
}

#[derive(Debug, Clone)]
struct IndexedVector {
    id: EntryId,
    timestamp: DateTime<Utc>,
    vector: Vec<f32>,
}

/// Embedding-backed nearest-neighbor search over the history.
pub struct SimilarityRetriever {
    index: Mutex<Vec<IndexedVector>>,
    model: String,
    timeout: Duration,
}

impl SimilarityRetriever {
    /// Creates a retriever with an empty in-memory index.
    #[must_use]
    pub fn new(model: impl Into<String>, timeout: Duration) -> Self {
        Self { index: Mutex::new(Vec::new()), model: model.into(), timeout }
    }

    /// Replaces the in-memory index with the vectors persisted in `store`.
    ///
    /// Vectors whose entry is missing are skipped.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub fn load(&self, store: &SnapshotStore) -> Result<usize, StoreError> {
        let stamps: std::collections::BTreeMap<EntryId, DateTime<Utc>> =
            store.entry_stamps()?.into_iter().collect();
        let loaded: Vec<IndexedVector> = store
            .vectors()?
            .into_iter()
            .filter_map(|(id, vector)| {
                stamps.get(&id).map(|timestamp| IndexedVector { id, timestamp: *timestamp, vector })
            })
            .collect();
        let count = loaded.len();
        *self.lock() = loaded;
        Ok(count)
    }

    /// Number of vectors currently searchable.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns `true` when nothing is indexed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<IndexedVector>> {
        self.index.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Embeds the summary of a snapshot, bounded by the configured timeout.
    ///
    /// # Errors
    ///
    /// Returns a [`Degradation::Retrieval`] when the embedder fails, times out,
    /// or returns an empty vector.
    pub async fn embed(
        &self,
        embedder: &dyn Embedder,
        snapshot: &Snapshot,
    ) -> Result<Vec<f32>, Degradation> {
        let request = EmbeddingRequest { model: self.model.clone(), text: summarize(snapshot) };
        match tokio::time::timeout(self.timeout, embedder.embed(&request)).await {
            Ok(Ok(vector)) if vector.is_empty() => {
                Err(Degradation::Retrieval("embedder returned an empty vector".into()))
            }
            Ok(Ok(vector)) => Ok(vector),
            Ok(Err(e)) => Err(Degradation::Retrieval(format!("embedding failed: {e}"))),
            Err(_) => Err(Degradation::Retrieval(format!(
                "embedding timed out after {}s",
                self.timeout.as_secs_f64()
            ))),
        }
    }

    /// Persists a vector for an entry and makes it searchable.
    ///
    /// # Errors
    ///
    /// Returns an error if the store write fails; the in-memory index is left
    /// unchanged in that case.
    pub fn index(
        &self,
        store: &SnapshotStore,
        id: EntryId,
        timestamp: DateTime<Utc>,
        vector: Vec<f32>,
    ) -> Result<(), StoreError> {
        store.put_vector(id, &vector)?;
        let mut index = self.lock();
        index.retain(|v| v.id != id);
        index.push(IndexedVector { id, timestamp, vector });
        Ok(())
    }

    /// Returns up to `top_k` entries most similar to `query`, best first.
    ///
    /// Ties go to the more recent entry, then the higher id. Vectors whose
    /// dimension differs from the query are never returned.
    #[must_use]
    pub fn search(&self, query: &[f32], top_k: usize, exclude: Option<EntryId>) -> Vec<(EntryId, f32)> {
        let index = self.lock();
        let mut hits: Vec<(&IndexedVector, f32)> = index
            .iter()
            .filter(|v| Some(v.id) != exclude && v.vector.len() == query.len())
            .map(|v| (v, cosine_similarity(query, &v.vector)))
            .collect();
        hits.sort_by(|a, b| {
            b.1.total_cmp(&a.1)
                .then_with(|| b.0.timestamp.cmp(&a.0.timestamp))
                .then_with(|| b.0.id.cmp(&a.0.id))
        });
        hits.into_iter().take(top_k).map(|(v, similarity)| (v.id, similarity)).collect()
    }

    /// Resolves search hits for `query` into neighbor descriptions.
    ///
    /// # Errors
    ///
    /// Returns an error if an entry cannot be read from the store.
    pub fn neighbors(
        &self,
        store: &SnapshotStore,
        query: &[f32],
        top_k: usize,
        exclude: Option<EntryId>,
    ) -> Result<Vec<Neighbor>, StoreError> {
        let mut neighbors = Vec::new();
        for (id, similarity) in self.search(query, top_k, exclude) {
            let Some(stored) = store.get(id)? else {
                log::debug!("index references unknown entry {id}, skipping");
                continue;
            };
            neighbors.push(Neighbor {
                id,
                similarity,
                timestamp: stored.entry.snapshot.timestamp,
                score: stored.entry.score,
                top_issues: stored
                    .entry
                    .sub_scores
                    .ranked()
                    .into_iter()
                    .take(NEIGHBOR_ISSUES)
                    .map(|(category, _)| category)
                    .collect(),
            });
        }
        Ok(neighbors)
    }

    /// Embeds, indexes, and looks up neighbors for a freshly stored entry.
    ///
    /// Embedding failures degrade to an empty neighbor list; only store
    /// failures are returned as errors.
    ///
    /// # Errors
    ///
    /// Returns an error if the vector cannot be persisted or neighbors cannot
    /// be read back.
    pub async fn retrieve(
        &self,
        store: &SnapshotStore,
        embedder: &dyn Embedder,
        id: EntryId,
        snapshot: &Snapshot,
        top_k: usize,
    ) -> Result<Retrieval, StoreError> {
        let vector = match self.embed(embedder, snapshot).await {
            Ok(vector) => vector,
            Err(degradation) => {
                log::warn!("{degradation}; continuing without similar scans");
                return Ok(Retrieval { vector: None, neighbors: Vec::new(), degradation: Some(degradation) });
            }
        };
        self.index(store, id, snapshot.timestamp, vector.clone())?;
        let neighbors = self.neighbors(store, &vector, top_k, Some(id))?;
        Ok(Retrieval { vector: Some(vector), neighbors, degradation: None })
    }

    /// Brings the index in line with the store.
    ///
    /// Vectors without an entry are deleted. Entries without a vector are
    /// embedded in timestamp order; the first embedder failure stops the pass
    /// and the remainder is reported as missing.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read or written.
    pub async fn reconcile(
        &self,
        store: &SnapshotStore,
        embedder: &dyn Embedder,
    ) -> Result<ReconcileReport, StoreError> {
        let stamps = store.entry_stamps()?;
        let entry_ids: BTreeSet<EntryId> = stamps.iter().map(|(id, _)| *id).collect();
        let vector_ids: BTreeSet<EntryId> = store.vectors()?.into_iter().map(|(id, _)| id).collect();

        let orphans: Vec<EntryId> = vector_ids.difference(&entry_ids).copied().collect();
        let pruned = if orphans.is_empty() { 0 } else { store.delete_vectors(&orphans)? };

        let pending: Vec<EntryId> =
            stamps.iter().map(|(id, _)| *id).filter(|id| !vector_ids.contains(id)).collect();
        let mut embedded = 0;
        for id in &pending {
            let Some(stored) = store.get(*id)? else { continue };
            match self.embed(embedder, &stored.entry.snapshot).await {
                Ok(vector) => {
                    store.put_vector(*id, &vector)?;
                    embedded += 1;
                }
                Err(degradation) => {
                    log::warn!("reconciliation stopped at entry {id}: {degradation}");
                    break;
                }
            }
        }

        self.load(store)?;
        let report = ReconcileReport { pruned, embedded, missing: pending.len() - embedded };
        if report != ReconcileReport::default() {
            log::info!(
                "reconciled index: {} pruned, {} embedded, {} missing",
                report.pruned,
                report.embedded,
                report.missing
            );
        }
        Ok(report)
    }
}

/// Cosine similarity; zero for mismatched lengths or zero-norm vectors.
#[must_use]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot_product / (norm_a * norm_b)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::path::PathBuf;
    use std::sync::atomic::Ordering;

    use chrono::{Duration as ChronoDuration, TimeZone};

    use super::*;
    use crate::score::SubScores;
    use crate::snapshot::{NamingRule, NamingViolation};
    use crate::store::HistoryEntry;
    use crate::testing::HistogramEmbedder;

    fn at(minutes: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 9, 0, 0).unwrap() + ChronoDuration::minutes(minutes)
    }

    fn snapshot(timestamp: DateTime<Utc>, files: usize, violations: usize) -> Snapshot {
        Snapshot {
            timestamp,
            root_path: PathBuf::from("/w"),
            total_files: files,
            total_dirs: 1,
            max_depth: 1,
            files_per_dir: BTreeMap::from([(".".to_string(), files)]),
            naming_violations: (0..violations)
                .map(|i| NamingViolation { path: format!("File {i}"), rule: NamingRule::NoSpaces })
                .collect(),
            oversized_files: Vec::new(),
            forbidden_pattern_hits: Vec::new(),
        }
    }

    fn append(store: &SnapshotStore, snapshot: Snapshot) -> EntryId {
        store
            .append(&HistoryEntry {
                snapshot,
                score: 0.0,
                sub_scores: SubScores::default(),
                embedding: None,
                report: None,
            })
            .unwrap()
    }

    fn retriever() -> SimilarityRetriever {
        SimilarityRetriever::new("test-embed", std::time::Duration::from_secs(5))
    }

    #[test]
    fn cosine_handles_degenerate_vectors() {
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[1.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
        assert!((cosine_similarity(&[1.0, 2.0], &[2.0, 4.0]) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn search_orders_by_similarity_then_recency() {
        let store = SnapshotStore::open_in_memory().unwrap();
        let r = retriever();
        let old = append(&store, snapshot(at(0), 1, 0));
        let new = append(&store, snapshot(at(5), 1, 0));
        let far = append(&store, snapshot(at(9), 1, 0));
        r.index(&store, old, at(0), vec![1.0, 0.0]).unwrap();
        r.index(&store, new, at(5), vec![2.0, 0.0]).unwrap();
        r.index(&store, far, at(9), vec![0.0, 1.0]).unwrap();

        let ids: Vec<EntryId> = r.search(&[1.0, 0.0], 3, None).into_iter().map(|(id, _)| id).collect();
        assert_eq!(ids, vec![new, old, far]);

        let ids: Vec<EntryId> =
            r.search(&[1.0, 0.0], 1, Some(new)).into_iter().map(|(id, _)| id).collect();
        assert_eq!(ids, vec![old]);
    }

    #[test]
    fn search_skips_other_dimensions() {
        let store = SnapshotStore::open_in_memory().unwrap();
        let r = retriever();
        let a = append(&store, snapshot(at(0), 1, 0));
        let b = append(&store, snapshot(at(1), 1, 0));
        r.index(&store, a, at(0), vec![1.0, 0.0, 0.0]).unwrap();
        r.index(&store, b, at(1), vec![1.0, 0.0]).unwrap();

        let hits = r.search(&[1.0, 0.0], 10, None);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].0, b);
    }

    #[tokio::test]
    async fn retrieve_excludes_current_entry() {
        let store = SnapshotStore::open_in_memory().unwrap();
        let r = retriever();
        let embedder = HistogramEmbedder::working();

        let first = append(&store, snapshot(at(0), 4, 2));
        r.retrieve(&store, &embedder, first, &snapshot(at(0), 4, 2), 5).await.unwrap();

        let second = append(&store, snapshot(at(1), 4, 3));
        let retrieval =
            r.retrieve(&store, &embedder, second, &snapshot(at(1), 4, 3), 5).await.unwrap();

        assert!(retrieval.degradation.is_none());
        assert_eq!(retrieval.neighbors.len(), 1);
        assert_eq!(retrieval.neighbors[0].id, first);
        assert_eq!(r.len(), 2);
    }

    #[tokio::test]
    async fn failing_embedder_degrades_to_no_neighbors() {
        let store = SnapshotStore::open_in_memory().unwrap();
        let r = retriever();
        let id = append(&store, snapshot(at(0), 1, 0));

        let retrieval = r
            .retrieve(&store, &HistogramEmbedder::failing(), id, &snapshot(at(0), 1, 0), 5)
            .await
            .unwrap();

        assert!(retrieval.neighbors.is_empty());
        assert!(matches!(retrieval.degradation, Some(Degradation::Retrieval(_))));
        assert!(store.vectors().unwrap().is_empty());
    }

    #[tokio::test]
    async fn reconcile_prunes_orphans_and_fills_gaps() {
        let store = SnapshotStore::open_in_memory().unwrap();
        let r = retriever();
        let a = append(&store, snapshot(at(0), 2, 0));
        let b = append(&store, snapshot(at(1), 3, 1));
        store.put_vector(a, &[1.0; 16]).unwrap();
        store.put_vector(EntryId(404), &[1.0; 16]).unwrap();

        let embedder = HistogramEmbedder::working();
        let report = r.reconcile(&store, &embedder).await.unwrap();

        assert_eq!(report, ReconcileReport { pruned: 1, embedded: 1, missing: 0 });
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 1);
        let ids: Vec<EntryId> = store.vectors().unwrap().into_iter().map(|(id, _)| id).collect();
        assert_eq!(ids, vec![a, b]);
        assert_eq!(r.len(), 2);

        let again = r.reconcile(&store, &embedder).await.unwrap();
        assert_eq!(again, ReconcileReport::default());
    }

    #[tokio::test]
    async fn reconcile_stops_on_first_failure() {
        let store = SnapshotStore::open_in_memory().unwrap();
        let r = retriever();
        append(&store, snapshot(at(0), 1, 0));
        append(&store, snapshot(at(1), 2, 0));

        let embedder = HistogramEmbedder::failing();
        let report = r.reconcile(&store, &embedder).await.unwrap();

        assert_eq!(report, ReconcileReport { pruned: 0, embedded: 0, missing: 2 });
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 1);
    }
}

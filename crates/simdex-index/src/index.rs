//! The similarity index.
//!
//! # Concurrency
//!
//! The live [`IndexState`] sits behind a `std::sync::RwLock<Arc<_>>`.
//! Queries clone the `Arc` under a brief read lock and score outside it.
//! Mutations (`add_document`, `rebuild`, `save`, `load`) are serialized by
//! an async mutex:
//!
//! - `add_document` applies the change to a private copy of the state and
//!   publishes it, so a query already scoring keeps its snapshot and the
//!   lock is only held for the pointer swap.
//! - `rebuild` accumulates a brand-new state without touching the live one
//!   and swaps it in at the end. If the store cannot be listed, nothing is
//!   swapped.
//! - `save` writes a snapshot on the blocking pool; queries are not
//!   blocked, further mutations are.

use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

use simdex_core::{DocumentStore, Error, IndexMode, IndexStats, Metadata, Result, SimilarDocument};
use tokio::sync::Mutex;

use crate::backend::ScoringBackend;
use crate::config::IndexConfig;
use crate::persistence;
use crate::state::{DocumentRecord, IndexState};

/// Bookkeeping owned by whoever holds the write lock.
#[derive(Debug, Default)]
struct WriteState {
    /// Insertions since the last successful save.
    unsaved: usize,
}

/// Outcome of [`SimilarityIndex::rebuild`].
#[derive(Debug)]
pub struct RebuildReport {
    /// Documents indexed.
    pub processed: usize,
    /// Documents that could not be read or represented.
    pub skipped: usize,
    /// Why the rebuilt index could not be saved. The rebuilt index is live
    /// either way, and the previously saved copy stays on disk.
    pub save_error: Option<Error>,
}

impl RebuildReport {
    /// Whether the rebuilt index reached disk.
    pub fn is_saved(&self) -> bool {
        self.save_error.is_none()
    }
}

/// A persistent, concurrently readable similarity index.
pub struct SimilarityIndex {
    config: IndexConfig,
    dir: PathBuf,
    state: RwLock<Arc<IndexState>>,
    write: Mutex<WriteState>,
}

impl std::fmt::Debug for SimilarityIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimilarityIndex")
            .field("dir", &self.dir)
            .field("state", &self.snapshot())
            .finish()
    }
}

impl SimilarityIndex {
    /// Empty, unsaved index using `backend`.
    pub fn new(config: IndexConfig, backend: Arc<dyn ScoringBackend>) -> Self {
        let dir = config.index_dir();
        Self {
            config,
            dir,
            state: RwLock::new(Arc::new(IndexState::empty(backend))),
            write: Mutex::new(WriteState::default()),
        }
    }

    /// Index loaded from `config.index_dir()`, or empty if nothing usable
    /// is there.
    pub async fn open(config: IndexConfig, backend: Arc<dyn ScoringBackend>) -> Self {
        let index = Self::new(config, backend);
        index.load().await;
        index
    }

    /// Directory holding the persisted artifacts.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn config(&self) -> &IndexConfig {
        &self.config
    }

    /// Current state. Cheap; holds the read lock only to clone the `Arc`.
    pub fn snapshot(&self) -> Arc<IndexState> {
        let guard = self.state.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&guard)
    }

    fn publish(&self, next: IndexState) {
        let mut guard = self.state.write().unwrap_or_else(PoisonError::into_inner);
        *guard = Arc::new(next);
    }

    pub fn mode(&self) -> IndexMode {
        self.snapshot().mode()
    }

    pub fn backend(&self) -> Arc<dyn ScoringBackend> {
        Arc::clone(self.snapshot().backend())
    }

    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // ------------------------------------------------------------------------
    // Mutations
    // ------------------------------------------------------------------------

    /// Index `content` under `doc_id`, replacing any previous version.
    ///
    /// Saves once every `save_every` insertions; a failed periodic save is
    /// logged and retried on the next insertion.
    pub async fn add_document(&self, doc_id: &str, content: &str, metadata: Metadata) -> Result<()> {
        let mut write = self.write.lock().await;

        // Writers hold `write`, so nothing else replaces the state until we publish.
        let current = self.snapshot();
        let repr = current.backend().represent(content).await?;
        let record = DocumentRecord::new(doc_id, content, metadata, self.config.preview_chars);

        let mut next = IndexState::clone(&current);
        drop(current);
        next.upsert(record, repr)?;
        self.publish(next);
        log::debug!("Indexed '{doc_id}'");

        write.unsaved += 1;
        if write.unsaved >= self.config.save_every {
            match self.persist(self.snapshot()).await {
                Ok(()) => write.unsaved = 0,
                Err(e) => log::warn!("Periodic save of {} failed: {e}", self.dir.display()),
            }
        }
        Ok(())
    }

    /// Replace the whole index with the documents yielded by `store`,
    /// represented by `backend`.
    ///
    /// Documents that fail to load or to be represented are logged and
    /// skipped. Successfully indexed documents are marked in `store`.
    /// The new state is saved at the end; a failed save is reported in the
    /// returned [`RebuildReport`] rather than failing the rebuild.
    ///
    /// # Errors
    ///
    /// Fails without touching the live index when `store` cannot list its
    /// documents.
    pub async fn rebuild(
        &self,
        backend: Arc<dyn ScoringBackend>,
        store: &dyn DocumentStore,
    ) -> Result<RebuildReport> {
        let mut write = self.write.lock().await;
        log::info!(
            "Rebuilding index from '{}' with the {} backend",
            store.name(),
            backend.name()
        );

        let documents = store.documents().inspect_err(|e| {
            log::error!(
                "Cannot list documents in '{}': {e}; keeping the current index",
                store.name()
            );
        })?;

        let mut next = IndexState::empty(backend);
        let mut processed = 0usize;
        let mut skipped = 0usize;

        for item in documents {
            let doc = match item {
                Ok(doc) => doc,
                Err(e) => {
                    log::warn!("Skipping unreadable document: {e}");
                    skipped += 1;
                    continue;
                }
            };

            let repr = match next.backend().represent(&doc.text).await {
                Ok(repr) => repr,
                Err(e) => {
                    log::warn!("Skipping '{}': {e}", doc.doc_id);
                    skipped += 1;
                    continue;
                }
            };
            let record =
                DocumentRecord::new(&doc.doc_id, &doc.text, doc.metadata, self.config.preview_chars);
            if let Err(e) = next.upsert(record, repr) {
                log::warn!("Skipping '{}': {e}", doc.doc_id);
                skipped += 1;
                continue;
            }

            processed += 1;
            if let Err(e) = store.mark_indexed(&doc.doc_id) {
                log::warn!("Could not mark '{}' as indexed: {e}", doc.doc_id);
            }
        }

        if next.updated_at.is_none() {
            next.updated_at = Some(chrono::Utc::now());
        }
        self.publish(next);
        log::info!("Rebuild complete: {processed} indexed, {skipped} skipped");

        let save_error = match self.persist(self.snapshot()).await {
            Ok(()) => {
                write.unsaved = 0;
                None
            }
            Err(e) => {
                log::warn!("Saving rebuilt index to {} failed: {e}", self.dir.display());
                Some(e)
            }
        };
        Ok(RebuildReport {
            processed,
            skipped,
            save_error,
        })
    }

    /// Persist the current state.
    ///
    /// On failure the previously saved artifacts are left as they were.
    pub async fn save(&self) -> Result<()> {
        let mut write = self.write.lock().await;
        self.persist(self.snapshot()).await?;
        write.unsaved = 0;
        log::info!("Saved {} documents to {}", self.len(), self.dir.display());
        Ok(())
    }

    /// Replace the current state with the one saved on disk.
    ///
    /// Missing or unreadable artifacts, or artifacts saved for a different
    /// backend, leave an empty index using the current backend. Returns the
    /// number of documents loaded.
    pub async fn load(&self) -> usize {
        let mut write = self.write.lock().await;
        let backend = self.backend();
        let dir = self.dir.clone();
        let loader_backend = Arc::clone(&backend);

        let loaded = tokio::task::spawn_blocking(move || persistence::load_state(&dir, loader_backend))
            .await
            .map_err(|e| Error::operation(format!("spawn_blocking failed: {e}")))
            .and_then(|r| r);

        let count = match loaded {
            Ok(state) => {
                let count = state.len();
                log::info!(
                    "Loaded {count} documents ({} mode) from {}",
                    state.mode(),
                    self.dir.display()
                );
                self.publish(state);
                count
            }
            Err(e) => {
                if persistence::artifacts_exist(&self.dir) {
                    log::warn!(
                        "Could not load index from {}: {e}; starting empty",
                        self.dir.display()
                    );
                } else {
                    log::info!(
                        "No index at {}, starting empty ({} mode)",
                        self.dir.display(),
                        backend.mode()
                    );
                }
                self.publish(IndexState::empty(backend));
                0
            }
        };
        write.unsaved = 0;
        count
    }

    async fn persist(&self, snapshot: Arc<IndexState>) -> Result<()> {
        let dir = self.dir.clone();
        tokio::task::spawn_blocking(move || persistence::save_state(&dir, &snapshot))
            .await
            .map_err(|e| Error::operation(format!("spawn_blocking failed: {e}")))?
    }

    // ------------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------------

    /// Documents scoring at least `threshold` against `content`, best
    /// first, at most `top_k`. Equal scores keep insertion order.
    pub async fn find_similar(
        &self,
        content: &str,
        top_k: usize,
        threshold: f64,
    ) -> Result<Vec<SimilarDocument>> {
        let snapshot = self.snapshot();
        if snapshot.is_empty() || top_k == 0 {
            return Ok(Vec::new());
        }

        let query = snapshot.backend().represent(content).await?;
        // Ranked best first, so the hits at or above `threshold` are a prefix.
        let ranked = snapshot.store().search(&query, top_k)?;

        Ok(ranked
            .into_iter()
            .take_while(|(_, score)| *score >= threshold)
            .map(|(position, score)| {
                let record = &snapshot.records()[position];
                SimilarDocument {
                    doc_id: record.doc_id.clone(),
                    similarity_score: score,
                    content_preview: record.content_preview.clone(),
                    metadata: record.metadata.clone(),
                    created_at: record.created_at,
                }
            })
            .collect())
    }

    /// Point-in-time statistics.
    pub fn stats(&self) -> IndexStats {
        let snapshot = self.snapshot();
        IndexStats {
            total_documents: snapshot.len(),
            mode: snapshot.mode(),
            last_updated: snapshot.updated_at(),
            backend: snapshot.backend().name().to_string(),
            dimension: snapshot.backend().dimension(),
            vector_available: snapshot.mode() == IndexMode::Vector,
            cached_queries: 0,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{BasicBackend, RepresentationStore, VectorBackend};
    use crate::store::MemoryDocumentStore;
    use simdex_core::{DocumentIter, SourceDocument};
    use simdex_vector::MockEmbeddingProvider;
    use tempfile::{TempDir, tempdir};

    fn config_in(dir: &TempDir) -> IndexConfig {
        IndexConfig {
            data_dir: dir.path().to_string_lossy().into_owned(),
            ..Default::default()
        }
    }

    fn basic() -> Arc<dyn ScoringBackend> {
        Arc::new(BasicBackend)
    }

    fn vector() -> Arc<dyn ScoringBackend> {
        Arc::new(VectorBackend::new(Arc::new(MockEmbeddingProvider::new(64))).unwrap())
    }

    async fn fox_and_cooking(index: &SimilarityIndex) {
        index
            .add_document("d1", "The quick brown fox jumps", Metadata::new())
            .await
            .unwrap();
        index
            .add_document(
                "d2",
                "A completely unrelated sentence about cooking",
                Metadata::new(),
            )
            .await
            .unwrap();
    }

    fn ids(results: &[SimilarDocument]) -> Vec<&str> {
        results.iter().map(|r| r.doc_id.as_str()).collect()
    }

    // ------------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------------

    #[tokio::test]
    async fn test_empty_index_returns_empty() {
        let dir = tempdir().unwrap();
        for backend in [basic(), vector()] {
            let index = SimilarityIndex::new(config_in(&dir), backend);
            let results = index.find_similar("anything at all", 5, 0.0).await.unwrap();
            assert!(results.is_empty());
        }
    }

    #[tokio::test]
    async fn test_self_match_ranks_first() {
        let dir = tempdir().unwrap();
        for backend in [basic(), vector()] {
            let index = SimilarityIndex::new(config_in(&dir), backend);
            fox_and_cooking(&index).await;

            let text = "A completely unrelated sentence about cooking";
            let results = index.find_similar(text, 1, 0.0).await.unwrap();
            assert_eq!(ids(&results), vec!["d2"]);
            assert!((results[0].similarity_score - 1.0).abs() < 1e-5);
        }
    }

    #[tokio::test]
    async fn test_fox_scenario() {
        let dir = tempdir().unwrap();
        for backend in [basic(), vector()] {
            let index = SimilarityIndex::new(config_in(&dir), backend);
            fox_and_cooking(&index).await;

            let results = index
                .find_similar("The quick brown fox leaps", 5, 0.1)
                .await
                .unwrap();
            assert_eq!(results.first().map(|r| r.doc_id.as_str()), Some("d1"));
            if let Some(d2) = results.iter().position(|r| r.doc_id == "d2") {
                assert!(d2 > 0);
            }
        }
    }

    #[tokio::test]
    async fn test_threshold_and_top_k() {
        let dir = tempdir().unwrap();
        let index = SimilarityIndex::new(config_in(&dir), basic());
        fox_and_cooking(&index).await;

        assert!(index.find_similar("fox", 0, 0.0).await.unwrap().is_empty());
        assert_eq!(index.find_similar("fox", 1, 0.0).await.unwrap().len(), 1);
        assert!(
            index
                .find_similar("The quick brown fox jumps", 5, 1.01)
                .await
                .unwrap()
                .is_empty()
        );
    }

    #[tokio::test]
    async fn test_ties_keep_insertion_order() {
        let dir = tempdir().unwrap();
        let index = SimilarityIndex::new(config_in(&dir), basic());
        for id in ["c", "a", "b"] {
            index
                .add_document(id, "identical text", Metadata::new())
                .await
                .unwrap();
        }
        let results = index.find_similar("identical text", 3, 0.0).await.unwrap();
        assert_eq!(ids(&results), vec!["c", "a", "b"]);
    }

    #[tokio::test]
    async fn test_readding_does_not_duplicate() {
        let dir = tempdir().unwrap();
        let index = SimilarityIndex::new(config_in(&dir), basic());
        index
            .add_document("d1", "first version of the text", Metadata::new())
            .await
            .unwrap();
        index
            .add_document("d1", "second version of the text", Metadata::new())
            .await
            .unwrap();

        assert_eq!(index.len(), 1);
        let results = index
            .find_similar("second version of the text", 10, 0.0)
            .await
            .unwrap();
        assert_eq!(ids(&results), vec!["d1"]);
        assert_eq!(results[0].content_preview, "second version of the text");
    }

    #[tokio::test]
    async fn test_results_carry_preview_and_metadata() {
        let dir = tempdir().unwrap();
        let config = IndexConfig {
            preview_chars: 9,
            ..config_in(&dir)
        };
        let index = SimilarityIndex::new(config, basic());
        let metadata = Metadata::from([("filename".to_string(), "fox.md".to_string())]);
        index
            .add_document("d1", "The quick brown fox jumps", metadata.clone())
            .await
            .unwrap();

        let results = index.find_similar("quick fox", 1, 0.0).await.unwrap();
        assert_eq!(results[0].content_preview, "The quick");
        assert_eq!(results[0].metadata, metadata);
    }

    // ------------------------------------------------------------------------
    // Persistence
    // ------------------------------------------------------------------------

    #[tokio::test]
    async fn test_save_load_round_trip() {
        let dir = tempdir().unwrap();
        for backend in [basic(), vector()] {
            let index = SimilarityIndex::new(config_in(&dir), backend.clone());
            fox_and_cooking(&index).await;
            index.save().await.unwrap();
            let before = index.find_similar("brown fox", 2, 0.0).await.unwrap();

            let reopened = SimilarityIndex::open(config_in(&dir), backend).await;
            assert_eq!(reopened.stats().total_documents, 2);
            let after = reopened.find_similar("brown fox", 2, 0.0).await.unwrap();
            assert_eq!(after, before);
        }
    }

    #[tokio::test]
    async fn test_load_falls_back_to_empty() {
        let dir = tempdir().unwrap();
        let config = config_in(&dir);
        std::fs::create_dir_all(config.index_dir()).unwrap();
        std::fs::write(config.index_dir().join("metadata.json"), "garbage").unwrap();

        let index = SimilarityIndex::open(config, basic()).await;
        assert!(index.is_empty());
        assert_eq!(index.mode(), IndexMode::Basic);
    }

    #[tokio::test]
    async fn test_load_with_other_mode_starts_empty() {
        let dir = tempdir().unwrap();
        let index = SimilarityIndex::new(config_in(&dir), basic());
        fox_and_cooking(&index).await;
        index.save().await.unwrap();

        let reopened = SimilarityIndex::open(config_in(&dir), vector()).await;
        assert!(reopened.is_empty());
        assert_eq!(reopened.mode(), IndexMode::Vector);
    }

    #[tokio::test]
    async fn test_periodic_save() {
        let dir = tempdir().unwrap();
        let config = IndexConfig {
            save_every: 2,
            ..config_in(&dir)
        };
        let index = SimilarityIndex::new(config.clone(), basic());
        let metadata_file = config.index_dir().join("metadata.json");

        index.add_document("d1", "one", Metadata::new()).await.unwrap();
        assert!(!metadata_file.exists());
        index.add_document("d2", "two", Metadata::new()).await.unwrap();
        assert!(metadata_file.exists());

        let reopened = SimilarityIndex::open(config, basic()).await;
        assert_eq!(reopened.len(), 2);
    }

    #[tokio::test]
    async fn test_failed_save_keeps_previous_artifact() {
        let dir = tempdir().unwrap();
        let index = SimilarityIndex::new(config_in(&dir), vector());
        fox_and_cooking(&index).await;
        index.save().await.unwrap();
        let before = index.find_similar("brown fox", 2, 0.0).await.unwrap();

        index
            .add_document("d3", "Foxes are quick and brown", Metadata::new())
            .await
            .unwrap();

        // Block the file the next vector generation would be written to.
        let snapshot = index.snapshot();
        let RepresentationStore::Vectors(vectors) = snapshot.store() else {
            panic!("expected vectors");
        };
        let name = persistence::vectors_file_name(&vectors.to_bytes().unwrap());
        std::fs::create_dir_all(index.dir().join(name).join("blocker")).unwrap();

        assert!(index.save().await.is_err());
        assert_eq!(index.len(), 3);

        let reopened = SimilarityIndex::open(config_in(&dir), vector()).await;
        assert_eq!(reopened.len(), 2);
        let after = reopened.find_similar("brown fox", 2, 0.0).await.unwrap();
        assert_eq!(after, before);
    }

    #[tokio::test]
    async fn test_add_leaves_held_snapshot_alone() {
        let dir = tempdir().unwrap();
        let index = SimilarityIndex::new(config_in(&dir), basic());
        fox_and_cooking(&index).await;

        let held = index.snapshot();
        index
            .add_document("d3", "Foxes are quick and brown", Metadata::new())
            .await
            .unwrap();
        index
            .add_document("d1", "replaced fox text", Metadata::new())
            .await
            .unwrap();

        assert_eq!(held.len(), 2);
        assert_eq!(held.records()[0].content_preview, "The quick brown fox jumps");
        assert_eq!(index.len(), 3);
        assert_eq!(index.snapshot().records()[0].content_preview, "replaced fox text");
    }

    // ------------------------------------------------------------------------
    // Rebuild
    // ------------------------------------------------------------------------

    fn corpus() -> MemoryDocumentStore {
        let store = MemoryDocumentStore::new();
        store.insert(SourceDocument::new("d1", "The quick brown fox jumps"));
        store.insert(SourceDocument::new(
            "d2",
            "A completely unrelated sentence about cooking",
        ));
        store.insert(SourceDocument::new("d3", "Foxes are quick and brown"));
        store
    }

    #[tokio::test]
    async fn test_rebuild_replaces_contents() {
        let dir = tempdir().unwrap();
        let index = SimilarityIndex::new(config_in(&dir), basic());
        index
            .add_document("stale", "soon gone", Metadata::new())
            .await
            .unwrap();

        let store = corpus();
        let report = index.rebuild(basic(), &store).await.unwrap();

        assert_eq!(report.processed, 3);
        assert_eq!(report.skipped, 0);
        assert!(report.is_saved());
        assert_eq!(index.len(), 3);
        assert!(index.snapshot().position("stale").is_none());
        assert!(store.is_indexed("d1") && store.is_indexed("d3"));
        assert!(persistence::artifacts_exist(index.dir()));
    }

    #[tokio::test]
    async fn test_rebuild_is_idempotent() {
        let dir = tempdir().unwrap();
        let index = SimilarityIndex::new(config_in(&dir), basic());
        let store = corpus();

        let first = index.rebuild(basic(), &store).await.unwrap();
        let ranking_1 = index.find_similar("quick brown fox", 3, 0.0).await.unwrap();
        let second = index.rebuild(basic(), &store).await.unwrap();
        let ranking_2 = index.find_similar("quick brown fox", 3, 0.0).await.unwrap();

        assert_eq!(first.processed, second.processed);
        assert_eq!(index.len(), 3);
        assert_eq!(ids(&ranking_1), ids(&ranking_2));
    }

    #[tokio::test]
    async fn test_rebuild_skips_failed_documents() {
        let dir = tempdir().unwrap();
        let index = SimilarityIndex::new(config_in(&dir), basic());
        let store = corpus();
        store.insert_undecodable("broken.md");

        let report = index.rebuild(basic(), &store).await.unwrap();
        assert_eq!(report.processed, 3);
        assert_eq!(report.skipped, 1);
        assert!(!store.is_indexed("broken.md"));
    }

    struct Unlistable;

    impl DocumentStore for Unlistable {
        fn documents(&self) -> Result<DocumentIter<'_>> {
            Err(Error::operation("listing failed"))
        }

        fn get(&self, doc_id: &str) -> Result<SourceDocument> {
            Err(Error::not_found(doc_id))
        }

        fn mark_indexed(&self, _doc_id: &str) -> Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_rebuild_keeps_index_when_listing_fails() {
        let dir = tempdir().unwrap();
        let index = SimilarityIndex::new(config_in(&dir), basic());
        index
            .add_document("keep", "The quick brown fox jumps", Metadata::new())
            .await
            .unwrap();
        index.save().await.unwrap();
        let saved = std::fs::read(index.dir().join("metadata.json")).unwrap();

        assert!(index.rebuild(basic(), &Unlistable).await.is_err());
        assert_eq!(index.len(), 1);
        assert!(index.snapshot().position("keep").is_some());
        assert_eq!(std::fs::read(index.dir().join("metadata.json")).unwrap(), saved);

        let reopened = SimilarityIndex::open(config_in(&dir), basic()).await;
        assert_eq!(reopened.len(), 1);
    }

    #[tokio::test]
    async fn test_rebuild_reports_failed_save() {
        let dir = tempdir().unwrap();
        let config = config_in(&dir);
        // A file where the index directory should be makes every save fail.
        std::fs::write(config.index_dir(), "not a directory").unwrap();
        let index = SimilarityIndex::new(config, basic());

        let report = index.rebuild(basic(), &corpus()).await.unwrap();
        assert_eq!(report.processed, 3);
        assert!(!report.is_saved());
        assert!(report.save_error.is_some());
        assert_eq!(index.len(), 3);
    }

    #[tokio::test]
    async fn test_rebuild_switches_mode() {
        let dir = tempdir().unwrap();
        let index = SimilarityIndex::new(config_in(&dir), basic());
        index.rebuild(vector(), &corpus()).await.unwrap();

        let stats = index.stats();
        assert_eq!(stats.mode, IndexMode::Vector);
        assert_eq!(stats.dimension, Some(64));
        assert_eq!(stats.total_documents, 3);
    }

    #[tokio::test]
    async fn test_queries_run_during_rebuild() {
        let dir = tempdir().unwrap();
        let index = Arc::new(SimilarityIndex::new(config_in(&dir), basic()));
        fox_and_cooking(&index).await;

        let store = Arc::new(corpus());
        let rebuilding = {
            let index = Arc::clone(&index);
            let store = Arc::clone(&store);
            tokio::spawn(async move { index.rebuild(basic(), store.as_ref()).await })
        };

        // Every query sees either the old or the new state, never a mix.
        for _ in 0..10 {
            let n = index.find_similar("fox", 10, 0.0).await.unwrap().len();
            assert!(n == 2 || n == 3, "saw {n} results");
            tokio::task::yield_now().await;
        }
        assert_eq!(rebuilding.await.unwrap().unwrap().processed, 3);
    }

    #[tokio::test]
    async fn test_stats() {
        let dir = tempdir().unwrap();
        let index = SimilarityIndex::new(config_in(&dir), basic());
        let stats = index.stats();
        assert_eq!(stats.total_documents, 0);
        assert_eq!(stats.mode, IndexMode::Basic);
        assert!(stats.last_updated.is_none());

        fox_and_cooking(&index).await;
        let stats = index.stats();
        assert_eq!(stats.total_documents, 2);
        assert_eq!(stats.backend, "basic");
        assert!(stats.last_updated.is_some());
    }
}

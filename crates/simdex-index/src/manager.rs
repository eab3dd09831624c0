//! Index lifecycle.
//!
//! [`IndexManager`] is the handle a process constructs once at startup
//! and passes to whoever serves requests. It owns the
//! [`SimilarityIndex`], the [`QueryCache`] in front of it, the embedding
//! runtime and document store collaborators, and the optional background
//! install of the vector backend.
//!
//! ```text
//!   init ──► select backend ──► open index (load or empty)
//!                                   │
//!   add_document / rebuild ─────────┤ clear cache
//!                                   │
//!   start_backend_install ──► install ──► Ready ──► reload_backend
//!                                                    (rebuild if mode changed)
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;
use simdex_core::{DocumentStore, Error, IndexMode, IndexStats, Metadata, Result, SimilarDocument};
use simdex_vector::{BackendInstaller, EmbeddingRuntime, InstallStatus, InstallTask};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::backend::select_backend;
use crate::cache::{Fingerprint, QueryCache};
use crate::config::IndexConfig;
use crate::index::{RebuildReport, SimilarityIndex};

/// Vector backend readiness as reported to operators.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BackendStatus {
    /// Embedding runtime name.
    pub runtime: String,
    /// Whether the runtime could be loaded right now.
    pub ready: bool,
    /// Background install status.
    pub install: InstallStatus,
    /// Mode the index is currently serving.
    pub mode: IndexMode,
    /// Name of the active scoring backend.
    pub backend: String,
}

/// Owner of one similarity index and everything around it.
pub struct IndexManager {
    config: IndexConfig,
    index: SimilarityIndex,
    cache: QueryCache,
    // Bumped on every invalidation; results computed across a bump are not cached.
    generation: AtomicU64,
    runtime: Arc<dyn EmbeddingRuntime>,
    store: Arc<dyn DocumentStore>,
    install: InstallTask,
    installer: Option<Arc<dyn BackendInstaller>>,
}

impl std::fmt::Debug for IndexManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexManager")
            .field("index", &self.index)
            .field("runtime", &self.runtime.name())
            .field("store", &self.store.name())
            .field("install", &self.install.status())
            .finish()
    }
}

impl IndexManager {
    /// Validate `config`, pick a backend from `runtime`, and open the index.
    pub async fn init(
        config: IndexConfig,
        runtime: Arc<dyn EmbeddingRuntime>,
        store: Arc<dyn DocumentStore>,
    ) -> Result<Self> {
        config.validate()?;
        let backend = select_backend(runtime.as_ref()).await;
        let index = SimilarityIndex::open(config.clone(), backend).await;
        let cache = QueryCache::new(config.cache_capacity, config.cache_ttl());
        log::info!(
            "Index manager ready: {} documents, {} mode, store '{}'",
            index.len(),
            index.mode(),
            store.name()
        );

        Ok(Self {
            config,
            index,
            cache,
            generation: AtomicU64::new(0),
            runtime,
            store,
            install: InstallTask::new(),
            installer: None,
        })
    }

    /// Attach the installer used by [`start_backend_install`](Self::start_backend_install).
    pub fn with_installer(mut self, installer: Arc<dyn BackendInstaller>) -> Self {
        self.installer = Some(installer);
        self
    }

    pub fn config(&self) -> &IndexConfig {
        &self.config
    }

    pub fn index(&self) -> &SimilarityIndex {
        &self.index
    }

    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    pub fn mode(&self) -> IndexMode {
        self.index.mode()
    }

    fn invalidate(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.cache.clear();
    }

    // ------------------------------------------------------------------------
    // Documents
    // ------------------------------------------------------------------------

    /// Index one document and invalidate cached results.
    pub async fn add_document(&self, doc_id: &str, content: &str, metadata: Metadata) -> Result<()> {
        self.index.add_document(doc_id, content, metadata).await?;
        self.invalidate();
        Ok(())
    }

    /// Fetch `doc_id` from the document store, index it, and mark it indexed.
    ///
    /// # Errors
    ///
    /// [`Error::NotFound`] if the store does not know `doc_id`.
    pub async fn index_document(&self, doc_id: &str) -> Result<()> {
        let doc = self.store.get(doc_id)?;
        self.add_document(&doc.doc_id, &doc.text, doc.metadata).await?;
        if let Err(e) = self.store.mark_indexed(&doc.doc_id) {
            log::warn!("Could not mark '{doc_id}' as indexed: {e}");
        }
        Ok(())
    }

    /// Ranked matches for `content`, served from the cache when possible.
    pub async fn find_similar(
        &self,
        content: &str,
        top_k: usize,
        threshold: f64,
    ) -> Result<Vec<SimilarDocument>> {
        let key = Fingerprint::new(content, top_k, threshold);
        if let Some(hit) = self.cache.get(&key) {
            log::debug!("Query cache hit {}", key.to_hex());
            return Ok(hit.as_ref().clone());
        }

        let generation = self.generation.load(Ordering::SeqCst);
        let results = self.index.find_similar(content, top_k, threshold).await?;
        if self.generation.load(Ordering::SeqCst) == generation {
            self.cache.put(key, Arc::new(results.clone()));
        }
        Ok(results)
    }

    /// [`find_similar`](Self::find_similar) with the configured `top_k`
    /// and threshold.
    pub async fn find_similar_default(&self, content: &str) -> Result<Vec<SimilarDocument>> {
        self.find_similar(
            content,
            self.config.default_top_k,
            self.config.default_threshold,
        )
        .await
    }

    /// Re-derive the index from the document store.
    ///
    /// The backend is re-selected from the runtime first, so a rebuild
    /// also picks up a vector backend that became ready, or drops one that
    /// went away.
    pub async fn rebuild(&self) -> Result<RebuildReport> {
        let backend = select_backend(self.runtime.as_ref()).await;
        let report = self.index.rebuild(backend, self.store.as_ref()).await?;
        self.invalidate();
        Ok(report)
    }

    /// Index statistics including runtime and cache state.
    pub fn stats(&self) -> IndexStats {
        IndexStats {
            vector_available: self.runtime.is_ready(),
            cached_queries: self.cache.len(),
            ..self.index.stats()
        }
    }

    /// Persist the index before the process exits.
    pub async fn shutdown(&self) -> Result<()> {
        log::info!("Shutting down index manager");
        self.index.save().await
    }

    // ------------------------------------------------------------------------
    // Backend lifecycle
    // ------------------------------------------------------------------------

    /// Re-check the runtime and switch backends if the choice changed.
    ///
    /// A switch means a full rebuild from the document store; otherwise
    /// the index is left alone. Returns the mode now in effect.
    pub async fn reload_backend(&self) -> Result<IndexMode> {
        let backend = select_backend(self.runtime.as_ref()).await;
        let current = self.index.backend();

        if backend.mode() == current.mode() && backend.name() == current.name() {
            log::debug!("Backend unchanged ({}), no rebuild needed", current.name());
            return Ok(current.mode());
        }

        log::info!(
            "Switching backend from '{}' ({}) to '{}' ({})",
            current.name(),
            current.mode(),
            backend.name(),
            backend.mode()
        );
        let mode = backend.mode();
        let report = self.index.rebuild(backend, self.store.as_ref()).await?;
        self.invalidate();
        if let Some(e) = &report.save_error {
            log::warn!("Switched to {mode} mode, but the index was not saved: {e}");
        }
        Ok(mode)
    }

    /// Run the attached installer in the foreground, then reload.
    pub async fn install_backend(&self) -> Result<InstallStatus> {
        let installer = self.installer()?;
        let status = self
            .install
            .run(installer.as_ref())
            .await
            .ok_or_else(|| Error::operation("a backend install is already in progress"))?;
        if status == InstallStatus::Ready {
            self.reload_backend().await?;
        }
        Ok(status)
    }

    /// Start the attached installer as a background task.
    ///
    /// The task reloads the backend once the install reports `Ready` and
    /// resolves to the final install status. Progress is observable through
    /// [`install_status`](Self::install_status) and
    /// [`subscribe_install`](Self::subscribe_install).
    ///
    /// # Errors
    ///
    /// [`Error::BackendUnavailable`] when no installer is attached,
    /// [`Error::Operation`] when an install is already running.
    pub fn start_backend_install(self: &Arc<Self>) -> Result<JoinHandle<InstallStatus>> {
        let installer = self.installer()?;
        if !self.install.begin() {
            return Err(Error::operation("a backend install is already in progress"));
        }

        let manager = Arc::clone(self);
        Ok(tokio::spawn(async move {
            log::debug!("Running installer '{}'", installer.name());
            let outcome = installer.install().await;
            let status = manager.install.complete(&outcome);
            if status == InstallStatus::Ready
                && let Err(e) = manager.reload_backend().await
            {
                log::warn!("Backend reload after install failed: {e}");
            }
            status
        }))
    }

    fn installer(&self) -> Result<Arc<dyn BackendInstaller>> {
        self.installer
            .clone()
            .ok_or_else(|| Error::backend_unavailable("no backend installer configured"))
    }

    pub fn install_status(&self) -> InstallStatus {
        self.install.status()
    }

    pub fn subscribe_install(&self) -> watch::Receiver<InstallStatus> {
        self.install.subscribe()
    }

    /// Runtime readiness, install progress, and the active backend.
    pub fn backend_status(&self) -> BackendStatus {
        let backend = self.index.backend();
        BackendStatus {
            runtime: self.runtime.name().to_string(),
            ready: self.runtime.is_ready(),
            install: self.install.status(),
            mode: backend.mode(),
            backend: backend.name().to_string(),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

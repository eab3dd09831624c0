//! Scoring backends.
//!
//! A [`ScoringBackend`] turns text into a [`Representation`] and knows
//! which kind of [`RepresentationStore`] holds its documents. The index
//! picks one backend when it is constructed or rebuilt and never branches
//! on the mode per call.
//!
//! - [`BasicBackend`]: feature extraction + weighted comparison. Always available.
//! - [`VectorBackend`]: normalized embeddings + inner-product search.

use std::sync::Arc;

use async_trait::async_trait;
use simdex_core::{Error, IndexMode, Result};
use simdex_vector::{EmbeddingProvider, EmbeddingRuntime, FlatIpIndex, normalize};

use crate::features::{FeatureSet, extract};
use crate::scorer;

// ============================================================================
// Representations
// ============================================================================

/// Comparable form of one piece of text.
#[derive(Debug, Clone, PartialEq)]
pub enum Representation {
    /// Output of the feature extractor.
    Features(FeatureSet),
    /// L2-normalized embedding.
    Embedding(Vec<f32>),
}

/// Representations of every indexed document, in record order.
///
/// One variant per mode, so an index can never mix the two.
#[derive(Debug, Clone, PartialEq)]
pub enum RepresentationStore {
    Features(Vec<FeatureSet>),
    Vectors(FlatIpIndex),
}

impl RepresentationStore {
    /// Mode this store belongs to.
    pub fn mode(&self) -> IndexMode {
        match self {
            Self::Features(_) => IndexMode::Basic,
            Self::Vectors(_) => IndexMode::Vector,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Features(f) => f.len(),
            Self::Vectors(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append `repr` at the next position.
    pub fn push(&mut self, repr: Representation) -> Result<()> {
        match (self, repr) {
            (Self::Features(all), Representation::Features(f)) => {
                all.push(f);
                Ok(())
            }
            (Self::Vectors(index), Representation::Embedding(v)) => index.add(&v).map(|_| ()),
            (store, repr) => Err(mismatch(store.mode(), &repr)),
        }
    }

    /// Replace the representation at `position`.
    pub fn replace(&mut self, position: usize, repr: Representation) -> Result<()> {
        match (self, repr) {
            (Self::Features(all), Representation::Features(f)) => match all.get_mut(position) {
                Some(slot) => {
                    *slot = f;
                    Ok(())
                }
                None => Err(Error::invalid_data(format!("position {position} out of range"))),
            },
            (Self::Vectors(index), Representation::Embedding(v)) => index.set(position, &v),
            (store, repr) => Err(mismatch(store.mode(), &repr)),
        }
    }

    /// Score `query` against every stored representation, in record order.
    pub fn scores(&self, query: &Representation) -> Result<Vec<f64>> {
        match (self, query) {
            (Self::Features(all), Representation::Features(q)) => {
                Ok(all.iter().map(|f| scorer::score(q, f)).collect())
            }
            (Self::Vectors(index), Representation::Embedding(q)) => {
                Ok(index.scores(q)?.into_iter().map(f64::from).collect())
            }
            (store, repr) => Err(mismatch(store.mode(), repr)),
        }
    }

    /// The `top_k` best positions for `query`, best first. Equal scores
    /// keep record order.
    pub fn search(&self, query: &Representation, top_k: usize) -> Result<Vec<(usize, f64)>> {
        match (self, query) {
            (Self::Vectors(index), Representation::Embedding(q)) => Ok(index
                .search(q, top_k)?
                .into_iter()
                .map(|(position, score)| (position, f64::from(score)))
                .collect()),
            _ => {
                let mut ranked: Vec<(usize, f64)> =
                    self.scores(query)?.into_iter().enumerate().collect();
                ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
                ranked.truncate(top_k);
                Ok(ranked)
            }
        }
    }
}

fn mismatch(mode: IndexMode, repr: &Representation) -> Error {
    let kind = match repr {
        Representation::Features(_) => "feature set",
        Representation::Embedding(_) => "embedding",
    };
    Error::invalid_data(format!("{kind} cannot be used with a {mode} index"))
}

// ============================================================================
// ScoringBackend
// ============================================================================

/// Capability that turns text into comparable representations.
#[async_trait]
pub trait ScoringBackend: Send + Sync {
    /// Mode of indexes built with this backend.
    fn mode(&self) -> IndexMode;

    /// Backend name for stats and logs.
    fn name(&self) -> &str;

    /// Embedding dimension, for vector backends.
    fn dimension(&self) -> Option<usize> {
        None
    }

    /// Compute the representation of `text`.
    async fn represent(&self, text: &str) -> Result<Representation>;

    /// Empty store matching this backend's representations.
    fn empty_store(&self) -> RepresentationStore;
}

/// Feature-extraction backend.
#[derive(Debug, Default, Clone, Copy)]
pub struct BasicBackend;

#[async_trait]
impl ScoringBackend for BasicBackend {
    fn mode(&self) -> IndexMode {
        IndexMode::Basic
    }

    fn name(&self) -> &str {
        "basic"
    }

    async fn represent(&self, text: &str) -> Result<Representation> {
        Ok(Representation::Features(extract(text)))
    }

    fn empty_store(&self) -> RepresentationStore {
        RepresentationStore::Features(Vec::new())
    }
}

/// Embedding backend over any [`EmbeddingProvider`].
pub struct VectorBackend {
    provider: Arc<dyn EmbeddingProvider>,
}

impl VectorBackend {
    /// # Errors
    ///
    /// [`Error::BackendUnavailable`] if the provider reports zero dimensions.
    pub fn new(provider: Arc<dyn EmbeddingProvider>) -> Result<Self> {
        if provider.dimension() == 0 {
            return Err(Error::backend_unavailable(format!(
                "provider '{}' reports zero dimensions",
                provider.name()
            )));
        }
        Ok(Self { provider })
    }
}

impl std::fmt::Debug for VectorBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VectorBackend")
            .field("provider", &self.provider.name())
            .field("dimension", &self.provider.dimension())
            .finish()
    }
}

#[async_trait]
impl ScoringBackend for VectorBackend {
    fn mode(&self) -> IndexMode {
        IndexMode::Vector
    }

    fn name(&self) -> &str {
        self.provider.name()
    }

    fn dimension(&self) -> Option<usize> {
        Some(self.provider.dimension())
    }

    async fn represent(&self, text: &str) -> Result<Representation> {
        let mut embedding = self.provider.embed(text).await?;
        if embedding.len() != self.provider.dimension() {
            return Err(Error::invalid_data(format!(
                "provider '{}' returned {} values, expected {}",
                self.provider.name(),
                embedding.len(),
                self.provider.dimension()
            )));
        }
        normalize(&mut embedding);
        Ok(Representation::Embedding(embedding))
    }

    fn empty_store(&self) -> RepresentationStore {
        RepresentationStore::Vectors(FlatIpIndex::new(self.provider.dimension()))
    }
}

/// Choose the backend for the current runtime state.
///
/// Uses the vector backend when the runtime is ready and loads; anything
/// else falls back to [`BasicBackend`].
pub async fn select_backend(runtime: &dyn EmbeddingRuntime) -> Arc<dyn ScoringBackend> {
    if !runtime.is_ready() {
        log::info!(
            "Vector runtime '{}' not ready, using basic scoring",
            runtime.name()
        );
        return Arc::new(BasicBackend);
    }

    match runtime.load().await.and_then(VectorBackend::new) {
        Ok(backend) => {
            log::info!(
                "Using vector backend '{}' (dimension {})",
                backend.provider.name(),
                backend.provider.dimension()
            );
            Arc::new(backend)
        }
        Err(e) => {
            log::warn!("Vector runtime '{}' failed to load: {e}; falling back to basic scoring", runtime.name());
            Arc::new(BasicBackend)
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

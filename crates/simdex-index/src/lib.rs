//! Simdex Index: similarity scoring, indexing, and lifecycle.
//!
//! Dependency level 2: builds on `simdex-core` and `simdex-vector`.
//!
//! # Modules
//!
//! - [`features`]: Deterministic feature extraction from raw text
//! - [`scorer`]: Weighted feature-wise similarity between two feature sets
//! - [`backend`]: The [`ScoringBackend`] capability (basic or vector)
//! - [`state`] / [`persistence`]: In-memory index state and its on-disk form
//! - [`index`]: The concurrently readable [`SimilarityIndex`]
//! - [`cache`]: TTL + LRU [`QueryCache`]
//! - [`manager`]: [`IndexManager`] lifecycle (init, rebuild, backend hot-swap)
//! - [`store`]: In-memory [`DocumentStore`](simdex_core::DocumentStore)
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use simdex_core::{Metadata, SourceDocument};
//! use simdex_index::{IndexConfig, IndexManager, MemoryDocumentStore};
//! use simdex_vector::DisabledRuntime;
//!
//! # async fn run() -> simdex_core::Result<()> {
//! let store = Arc::new(MemoryDocumentStore::new());
//! store.insert(SourceDocument::new("d1", "The quick brown fox jumps"));
//!
//! let manager = IndexManager::init(IndexConfig::default(), Arc::new(DisabledRuntime), store).await?;
//! manager.rebuild().await?;
//! manager.add_document("d2", "Cooking with cast iron", Metadata::new()).await?;
//!
//! for hit in manager.find_similar("quick brown fox", 5, 0.3).await? {
//!     println!("{} {:.3}", hit.doc_id, hit.similarity_score);
//! }
//! manager.shutdown().await?;
//! # Ok(())
//! # }
//! ```

pub mod backend;
pub mod cache;
pub mod config;
pub mod features;
pub mod index;
pub mod manager;
pub mod persistence;
pub mod scorer;
pub mod state;
pub mod store;

pub use backend::{BasicBackend, Representation, ScoringBackend, VectorBackend, select_backend};
pub use cache::{Fingerprint, QueryCache};
pub use config::IndexConfig;
pub use features::{Feature, FeatureSet, FeatureValue, extract};
pub use index::{RebuildReport, SimilarityIndex};
pub use manager::{BackendStatus, IndexManager};
pub use scorer::score;
pub use store::MemoryDocumentStore;

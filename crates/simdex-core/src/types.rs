//! Domain types shared by the index, the vector backend, and the CLI.
//!
//! These types form the engine's external surface: what a document store
//! yields, what a similarity query returns, and what `stats()` reports.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Caller-supplied metadata, passed through the engine unmodified.
///
/// Ordered so persisted artifacts are stable across saves.
pub type Metadata = BTreeMap<String, String>;

// ============================================================================
// Source documents
// ============================================================================

/// A document as yielded by a [`DocumentStore`](crate::DocumentStore).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceDocument {
    /// Opaque external identifier, unique within the store.
    pub doc_id: String,

    /// Full decoded text of the document.
    pub text: String,

    /// Arbitrary metadata (filename, path, timestamps).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: Metadata,
}

impl SourceDocument {
    /// Create a new source document.
    pub fn new(doc_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            doc_id: doc_id.into(),
            text: text.into(),
            metadata: Metadata::new(),
        }
    }

    /// Add a metadata key-value pair.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

// ============================================================================
// Mode
// ============================================================================

/// Which scoring backend an index instance uses.
///
/// The mode is fixed for the lifetime of an index state; changing it
/// requires a full rebuild.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexMode {
    /// Feature extraction + weighted feature comparison.
    Basic,
    /// Normalized embeddings + inner-product search.
    Vector,
}

impl IndexMode {
    /// Lowercase name, as persisted.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Basic => "basic",
            Self::Vector => "vector",
        }
    }
}

impl fmt::Display for IndexMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Query results
// ============================================================================

/// A single ranked match returned by `find_similar`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarDocument {
    /// Identifier of the matched document.
    pub doc_id: String,

    /// Similarity score; higher is more similar.
    pub similarity_score: f64,

    /// Bounded prefix of the matched document's text.
    pub content_preview: String,

    /// Metadata stored with the matched document.
    #[serde(default)]
    pub metadata: Metadata,

    /// When the matched document was inserted into the index.
    pub created_at: DateTime<Utc>,
}

// ============================================================================
// Statistics
// ============================================================================

/// Point-in-time statistics for an index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexStats {
    /// Number of live documents.
    pub total_documents: usize,

    /// Active scoring mode.
    pub mode: IndexMode,

    /// Time of the last mutation, load, or rebuild.
    pub last_updated: Option<DateTime<Utc>>,

    /// Name of the active scoring backend.
    pub backend: String,

    /// Embedding dimension (vector mode only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dimension: Option<usize>,

    /// Whether the vector backend could be used right now.
    #[serde(default)]
    pub vector_available: bool,

    /// Number of live entries in the query cache.
    #[serde(default)]
    pub cached_queries: usize,
}

//! Configuration for the optional vector backend.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use simdex_core::util::paths::expand_path;

/// Configuration for the embedding backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorConfig {
    /// Whether the vector backend may be used at all.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Embedding provider: "fastembed" or "mock".
    #[serde(default = "default_provider")]
    pub provider: String,

    /// Embedding model name (e.g., "all-minilm-l6-v2").
    #[serde(default = "default_model")]
    pub model: String,

    /// Embedding dimension for the mock provider.
    #[serde(default = "default_dimension")]
    pub dimension: usize,

    /// Directory holding downloaded model files.
    pub cache_path: Option<String>,

    /// Files that must all be present under `cache_path` before the model
    /// is considered installed.
    #[serde(default = "default_required_files")]
    pub required_files: Vec<String>,
}

fn default_true() -> bool {
    true
}

fn default_provider() -> String {
    "fastembed".to_string()
}

fn default_model() -> String {
    "all-minilm-l6-v2".to_string()
}

fn default_dimension() -> usize {
    384
}

fn default_required_files() -> Vec<String> {
    vec!["model.onnx".to_string(), "tokenizer.json".to_string()]
}

impl Default for VectorConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            provider: default_provider(),
            model: default_model(),
            dimension: default_dimension(),
            cache_path: None,
            required_files: default_required_files(),
        }
    }
}

impl VectorConfig {
    /// Model cache directory with `~` and environment variables expanded.
    pub fn resolved_cache_path(&self) -> Option<PathBuf> {
        self.cache_path.as_deref().map(expand_path)
    }
}

// ============================================================================
// Tests
// ============================================================================

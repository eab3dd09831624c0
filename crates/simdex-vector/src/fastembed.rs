//! FastEmbed embedding backend.
//!
//! Wraps the `fastembed` crate to provide local embedding generation via
//! pre-trained models (e.g., AllMiniLM, BGE-small).
//!
//! # Thread Safety
//!
//! `fastembed::TextEmbedding` is not `Send + Sync`, so we wrap it in
//! `Arc<Mutex<>>` and use `tokio::task::spawn_blocking` for embedding calls.
//!
//! # Feature Gate
//!
//! This module requires the `vector-fastembed` feature.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use simdex_core::{Error, Result};

use crate::embedding::{EmbeddingProvider, normalize};
use crate::install::BackendInstaller;
use crate::runtime::EmbeddingRuntime;
use crate::types::VectorConfig;

/// Cache directory fastembed uses when none is configured.
const DEFAULT_CACHE_DIR: &str = ".fastembed_cache";

/// Map a model name string to a fastembed `EmbeddingModel` enum variant.
fn resolve_model(name: &str) -> Result<fastembed::EmbeddingModel> {
    match name {
        "all-minilm-l6-v2" | "AllMiniLML6V2" => Ok(fastembed::EmbeddingModel::AllMiniLML6V2),
        "bge-small-en-v1.5" | "BGESmallENV15" => Ok(fastembed::EmbeddingModel::BGESmallENV15),
        "bge-base-en-v1.5" | "BGEBaseENV15" => Ok(fastembed::EmbeddingModel::BGEBaseENV15),
        other => Err(Error::config(format!(
            "Unknown embedding model: '{other}'. Supported: all-minilm-l6-v2, bge-small-en-v1.5, bge-base-en-v1.5"
        ))),
    }
}

fn init_model(model_name: &str, cache_dir: &Path) -> Result<fastembed::TextEmbedding> {
    let model_enum = resolve_model(model_name)?;
    let init = fastembed::InitOptions::new(model_enum).with_cache_dir(cache_dir.to_path_buf());
    fastembed::TextEmbedding::try_new(init).map_err(|e| {
        Error::backend_unavailable(format!("Failed to initialize fastembed model: {e}"))
    })
}

// ============================================================================
// Provider
// ============================================================================

/// FastEmbed-based embedding provider.
///
/// The model is loaded once and reused for all subsequent calls. Output
/// vectors are L2-normalized.
///
/// # Supported Models
///
/// | Name | Dimension | Size |
/// |------|-----------|------|
/// | `all-minilm-l6-v2` | 384 | ~80MB |
/// | `bge-small-en-v1.5` | 384 | ~50MB |
/// | `bge-base-en-v1.5` | 768 | ~130MB |
pub struct FastEmbedProvider {
    model: Arc<Mutex<fastembed::TextEmbedding>>,
    dimension: usize,
    model_name: String,
}

impl FastEmbedProvider {
    /// Load `model_name` from `cache_dir`, downloading it if absent.
    ///
    /// Blocking; call from `spawn_blocking` inside async code.
    pub fn new(model_name: &str, cache_dir: &Path) -> Result<Self> {
        let mut text_embedding = init_model(model_name, cache_dir)?;

        // Dimension comes from one sample embedding
        let sample = text_embedding
            .embed(vec!["dimension sample"], None)
            .map_err(|e| Error::operation(format!("Failed to measure embedding dimension: {e}")))?;

        let dimension = sample
            .first()
            .map(|v| v.len())
            .ok_or_else(|| Error::operation("Empty sample embedding"))?;

        Ok(Self {
            model: Arc::new(Mutex::new(text_embedding)),
            dimension,
            model_name: model_name.to_string(),
        })
    }
}

#[async_trait]
impl EmbeddingProvider for FastEmbedProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut batch = self.embed_batch(&[text]).await?;
        batch
            .pop()
            .ok_or_else(|| Error::operation("No embedding returned"))
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let model = self.model.clone();
        let texts: Vec<String> = texts.iter().map(|t| t.to_string()).collect();

        let mut vectors = tokio::task::spawn_blocking(move || {
            let mut model = model
                .lock()
                .map_err(|e| Error::operation(format!("Mutex poisoned: {e}")))?;
            model
                .embed(texts, None)
                .map_err(|e| Error::operation(format!("Batch embedding failed: {e}")))
        })
        .await
        .map_err(|e| Error::operation(format!("spawn_blocking failed: {e}")))??;

        for v in &mut vectors {
            normalize(v);
        }
        Ok(vectors)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn name(&self) -> &str {
        &self.model_name
    }
}

impl std::fmt::Debug for FastEmbedProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FastEmbedProvider")
            .field("model", &self.model_name)
            .field("dimension", &self.dimension)
            .finish()
    }
}

// ============================================================================
// Runtime
// ============================================================================

/// Runtime that is ready once every required model file exists somewhere
/// under the cache directory.
#[derive(Debug, Clone)]
pub struct FastEmbedRuntime {
    model_name: String,
    cache_dir: PathBuf,
    required_files: Vec<String>,
}

impl FastEmbedRuntime {
    /// Build a runtime from configuration.
    pub fn from_config(config: &VectorConfig) -> Self {
        Self {
            model_name: config.model.clone(),
            cache_dir: config
                .resolved_cache_path()
                .unwrap_or_else(|| PathBuf::from(DEFAULT_CACHE_DIR)),
            required_files: config.required_files.clone(),
        }
    }

    /// Directory searched for model files.
    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Required files not found under the cache directory.
    pub fn missing_files(&self) -> Vec<String> {
        let root = glob::Pattern::escape(&self.cache_dir.to_string_lossy());
        self.required_files
            .iter()
            .filter(|file| {
                let pattern = format!("{root}/**/{}", glob::Pattern::escape(file));
                match glob::glob(&pattern) {
                    Ok(mut paths) => !paths.any(|p| p.is_ok()),
                    Err(_) => true,
                }
            })
            .cloned()
            .collect()
    }
}

#[async_trait]
impl EmbeddingRuntime for FastEmbedRuntime {
    fn name(&self) -> &str {
        "fastembed"
    }

    fn is_ready(&self) -> bool {
        resolve_model(&self.model_name).is_ok() && self.missing_files().is_empty()
    }

    async fn load(&self) -> Result<Arc<dyn EmbeddingProvider>> {
        let missing = self.missing_files();
        if !missing.is_empty() {
            return Err(Error::backend_unavailable(format!(
                "model files missing under {}: {}",
                self.cache_dir.display(),
                missing.join(", ")
            )));
        }

        let model_name = self.model_name.clone();
        let cache_dir = self.cache_dir.clone();
        let provider = tokio::task::spawn_blocking(move || {
            FastEmbedProvider::new(&model_name, &cache_dir)
        })
        .await
        .map_err(|e| Error::operation(format!("spawn_blocking failed: {e}")))??;

        log::info!(
            "Loaded embedding model '{}' (dimension {})",
            provider.name(),
            provider.dimension()
        );
        let provider: Arc<dyn EmbeddingProvider> = Arc::new(provider);
        Ok(provider)
    }
}

// ============================================================================
// Installer
// ============================================================================

/// Installs the configured model by letting fastembed download it into
/// the cache directory.
#[derive(Debug, Clone)]
pub struct FastEmbedInstaller {
    runtime: FastEmbedRuntime,
}

impl FastEmbedInstaller {
    /// Installer for the model described by `runtime`.
    pub fn new(runtime: FastEmbedRuntime) -> Self {
        Self { runtime }
    }
}

#[async_trait]
impl BackendInstaller for FastEmbedInstaller {
    fn name(&self) -> &str {
        "fastembed"
    }

    async fn install(&self) -> Result<()> {
        let model_name = self.runtime.model_name.clone();
        let cache_dir = self.runtime.cache_dir.clone();
        tokio::task::spawn_blocking(move || init_model(&model_name, &cache_dir).map(|_| ()))
            .await
            .map_err(|e| Error::operation(format!("spawn_blocking failed: {e}")))?
    }
}

// ============================================================================
// Tests
// ============================================================================

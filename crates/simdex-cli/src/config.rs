//! Configuration for the `simdex` binary.
//!
//! [`SimdexConfig`] loads from TOML files, environment variables, and
//! defaults using the `confyg` crate.
//!
//! # Loading Priority
//!
//! 1. Explicit `--config <path>` flag
//! 2. `SIMDEX_CONFIG` environment variable
//! 3. XDG default: `~/.config/simdex/config.toml`
//! 4. Built-in defaults
//!
//! `SIMDEX_<SECTION>_<KEY>` variables override individual string values,
//! e.g. `SIMDEX_CONTENT_PATH` or `SIMDEX_INDEX_DATA_DIR`.

use std::path::PathBuf;

use confyg::{Confygery, env};
use serde::{Deserialize, Serialize};
use simdex_core::util::paths::expand_path;
use simdex_core::{Error, Result};
use simdex_index::IndexConfig;
use simdex_vector::VectorConfig;

// ============================================================================
// Configuration structs
// ============================================================================

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SimdexConfig {
    /// Index location, persistence cadence, query defaults, cache.
    pub index: IndexConfig,

    /// Optional vector backend.
    pub vector: VectorConfig,

    /// Document directory.
    pub content: ContentConfig,
}

/// Where documents are read from.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ContentConfig {
    /// Root of the document directory. Defaults to `content`.
    pub path: Option<String>,

    /// File extensions to index, without the dot.
    pub extensions: Vec<String>,
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            path: None,
            extensions: vec!["md".to_string(), "txt".to_string()],
        }
    }
}

impl ContentConfig {
    /// Content root with `~` and environment variables expanded.
    pub fn root(&self) -> PathBuf {
        expand_path(self.path.as_deref().unwrap_or("content"))
    }
}

// ============================================================================
// Config loading
// ============================================================================

impl SimdexConfig {
    /// Load configuration from file, environment, and defaults.
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let mut builder =
            Confygery::new().map_err(|e| Error::config(format!("config init: {e}")))?;

        if let Some(path) = Self::resolve_config_path(config_path)
            && path.exists()
        {
            builder
                .add_file(&path.to_string_lossy())
                .map_err(|e| Error::config(format!("config file: {e}")))?;
        }

        let mut env_opts = env::Options::with_top_level("SIMDEX");
        env_opts.add_section("index");
        env_opts.add_section("vector");
        env_opts.add_section("content");
        builder
            .add_env(env_opts)
            .map_err(|e| Error::config(format!("config env: {e}")))?;

        let config: Self = builder
            .build()
            .map_err(|e| Error::config(format!("config build: {e}")))?;

        config.index.validate()?;
        Ok(config)
    }

    /// Resolve the config file path from explicit flag, env var, or XDG default.
    pub fn resolve_config_path(explicit: Option<&str>) -> Option<PathBuf> {
        if let Some(path) = explicit {
            return Some(PathBuf::from(path));
        }
        if let Ok(path) = std::env::var("SIMDEX_CONFIG") {
            return Some(PathBuf::from(path));
        }
        Self::default_config_path()
    }

    /// Return the XDG default config path.
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("simdex").join("config.toml"))
    }

    /// Serialize this config to a pretty-printed TOML string.
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::config(e.to_string()))
    }
}

// ============================================================================
// Tests
// ============================================================================

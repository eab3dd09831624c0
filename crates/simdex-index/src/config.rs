//! Index configuration.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use simdex_core::util::paths::expand_path;
use simdex_core::{Error, Result};

/// Settings for the similarity index and its query cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Root data directory.
    pub data_dir: String,

    /// Subdirectory of `data_dir` holding the index artifacts.
    pub index_dir_name: String,

    /// Persist after this many insertions.
    pub save_every: usize,

    /// Maximum characters kept as a record's content preview.
    pub preview_chars: usize,

    /// Result count used when a caller does not pass one.
    pub default_top_k: usize,

    /// Minimum score used when a caller does not pass one.
    pub default_threshold: f64,

    /// Query cache time-to-live, in seconds.
    pub cache_ttl_secs: u64,

    /// Maximum number of cached queries.
    pub cache_capacity: usize,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            data_dir: "data".to_string(),
            index_dir_name: "similarity_index".to_string(),
            save_every: 50,
            preview_chars: 500,
            default_top_k: 5,
            default_threshold: 0.3,
            cache_ttl_secs: 1800,
            cache_capacity: 256,
        }
    }
}

impl IndexConfig {
    /// Directory holding `metadata.json` and the vector files.
    pub fn index_dir(&self) -> PathBuf {
        expand_path(&self.data_dir).join(&self.index_dir_name)
    }

    /// Query cache time-to-live.
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    /// Reject settings the index cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.save_every == 0 {
            return Err(Error::config("save_every must be at least 1"));
        }
        if self.cache_capacity == 0 {
            return Err(Error::config("cache_capacity must be at least 1"));
        }
        if !(-1.0..=1.0).contains(&self.default_threshold) {
            return Err(Error::config(format!(
                "default_threshold {} outside [-1, 1]",
                self.default_threshold
            )));
        }
        if self.index_dir_name.trim().is_empty() {
            return Err(Error::config("index_dir_name must not be empty"));
        }
        Ok(())
    }
}

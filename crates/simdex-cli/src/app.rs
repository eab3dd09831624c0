//! The `simdex` application: wiring configuration to an [`IndexManager`]
//! and dispatching commands.

use std::sync::Arc;

use simdex_core::{Metadata, Result, SimilarDocument};
use simdex_index::IndexManager;
use simdex_vector::{BackendInstaller, DisabledRuntime, EmbeddingRuntime, MockRuntime};
use tracing_subscriber::EnvFilter;

use crate::cli::{CliArgs, Command};
use crate::config::SimdexConfig;
use crate::store::DirectoryStore;

/// Initialise tracing-based logging.
///
/// Uses `RUST_LOG` if set, otherwise defaults based on verbosity flags.
pub fn init_logging(verbose: bool, quiet: bool) {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if quiet {
        EnvFilter::new("warn")
    } else if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    // Ignore error if a subscriber is already set (e.g. in tests).
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

/// Embedding runtime and optional installer for the configured provider.
pub fn vector_runtime(
    config: &SimdexConfig,
) -> (Arc<dyn EmbeddingRuntime>, Option<Arc<dyn BackendInstaller>>) {
    let vector = &config.vector;
    if !vector.enabled {
        return (Arc::new(DisabledRuntime), None);
    }

    match vector.provider.as_str() {
        "mock" => {
            let mock = Arc::new(MockRuntime::ready(vector.dimension));
            let runtime: Arc<dyn EmbeddingRuntime> = mock.clone();
            let installer: Arc<dyn BackendInstaller> = mock;
            (runtime, Some(installer))
        }
        #[cfg(feature = "vector-fastembed")]
        "fastembed" => {
            let fastembed = simdex_vector::FastEmbedRuntime::from_config(vector);
            let installer: Arc<dyn BackendInstaller> =
                Arc::new(simdex_vector::FastEmbedInstaller::new(fastembed.clone()));
            let runtime: Arc<dyn EmbeddingRuntime> = Arc::new(fastembed);
            (runtime, Some(installer))
        }
        other => {
            log::info!("Vector provider '{other}' is not available in this build");
            (Arc::new(DisabledRuntime), None)
        }
    }
}

/// The `simdex` command-line application.
pub struct SimdexApp {
    config: SimdexConfig,
    version: String,
}

impl SimdexApp {
    /// Create from CLI args, loading config from file/env.
    pub fn from_args(args: &CliArgs) -> Result<Self> {
        let config = SimdexConfig::load(args.config.as_deref())?;
        Ok(Self::new(config))
    }

    pub fn new(config: SimdexConfig) -> Self {
        Self {
            config,
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    pub fn config(&self) -> &SimdexConfig {
        &self.config
    }

    async fn manager(&self) -> Result<IndexManager> {
        let store = Arc::new(DirectoryStore::new(
            self.config.content.root(),
            self.config.content.extensions.clone(),
        ));
        let (runtime, installer) = vector_runtime(&self.config);
        let manager = IndexManager::init(self.config.index.clone(), runtime, store).await?;
        Ok(match installer {
            Some(installer) => manager.with_installer(installer),
            None => manager,
        })
    }

    /// Run one command.
    pub async fn run(&self, command: Option<Command>) -> Result<()> {
        let Some(command) = command else {
            println!("simdex {} (use --help for usage)", self.version);
            return Ok(());
        };

        match command {
            Command::Version => {
                println!("simdex {}", self.version);
                Ok(())
            }
            Command::Add { doc_id, text } => {
                let manager = self.manager().await?;
                match text {
                    Some(text) => manager.add_document(&doc_id, &text, Metadata::new()).await?,
                    None => manager.index_document(&doc_id).await?,
                }
                manager.shutdown().await?;
                println!("Indexed {doc_id}");
                Ok(())
            }
            Command::Query {
                text,
                top_k,
                threshold,
                json,
            } => {
                let manager = self.manager().await?;
                let top_k = top_k.unwrap_or(self.config.index.default_top_k);
                let threshold = threshold.unwrap_or(self.config.index.default_threshold);
                let results = manager.find_similar(&text, top_k, threshold).await?;
                if json {
                    println!("{}", serde_json::to_string_pretty(&results)?);
                } else {
                    print_results(&results);
                }
                Ok(())
            }
            Command::Rebuild => {
                let manager = self.manager().await?;
                let report = manager.rebuild().await?;
                println!(
                    "Indexed {} documents from {} ({} mode), skipped {}",
                    report.processed,
                    self.config.content.root().display(),
                    manager.mode(),
                    report.skipped
                );
                if let Some(e) = &report.save_error {
                    println!("Warning: the rebuilt index could not be saved: {e}");
                }
                Ok(())
            }
            Command::Stats { json } => {
                let manager = self.manager().await?;
                let stats = manager.stats();
                if json {
                    println!("{}", serde_json::to_string_pretty(&stats)?);
                } else {
                    println!("Documents:    {}", stats.total_documents);
                    println!("Mode:         {}", stats.mode);
                    println!("Backend:      {}", stats.backend);
                    if let Some(dimension) = stats.dimension {
                        println!("Dimension:    {dimension}");
                    }
                    match stats.last_updated {
                        Some(at) => println!("Last updated: {}", at.to_rfc3339()),
                        None => println!("Last updated: never"),
                    }
                    println!("Vector ready: {}", stats.vector_available);
                }
                Ok(())
            }
            Command::Status => {
                let manager = self.manager().await?;
                println!("{}", serde_json::to_string_pretty(&manager.backend_status())?);
                Ok(())
            }
            Command::Install => {
                let manager = self.manager().await?;
                let status = manager.install_backend().await?;
                println!("Install {status}; index is in {} mode", manager.mode());
                Ok(())
            }
        }
    }
}

fn print_results(results: &[SimilarDocument]) {
    if results.is_empty() {
        println!("No similar documents.");
        return;
    }
    for (rank, hit) in results.iter().enumerate() {
        let preview: String = hit.content_preview.chars().take(80).collect();
        println!(
            "{:>2}. {:.3}  {}  {}",
            rank + 1,
            hit.similarity_score,
            hit.doc_id,
            preview.replace('\n', " ")
        );
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use simdex_core::IndexMode;
    use tempfile::TempDir;

    fn app_in(dir: &TempDir, provider: &str) -> SimdexApp {
        let content = dir.path().join("content");
        std::fs::create_dir_all(&content).unwrap();
        std::fs::write(content.join("fox.md"), "The quick brown fox jumps").unwrap();
        std::fs::write(content.join("cook.txt"), "Notes about cooking").unwrap();

        let mut config = SimdexConfig::default();
        config.index.data_dir = dir.path().join("data").to_string_lossy().into_owned();
        config.content.path = Some(content.to_string_lossy().into_owned());
        config.vector.provider = provider.to_string();
        config.vector.dimension = 16;
        SimdexApp::new(config)
    }

    #[test]
    fn test_init_logging_is_repeatable() {
        init_logging(false, false);
        init_logging(true, false);
    }

    #[test]
    fn test_vector_runtime_selection() {
        let mut config = SimdexConfig::default();
        config.vector.provider = "mock".to_string();
        let (runtime, installer) = vector_runtime(&config);
        assert_eq!(runtime.name(), "mock");
        assert!(installer.is_some());

        config.vector.enabled = false;
        let (runtime, installer) = vector_runtime(&config);
        assert_eq!(runtime.name(), "disabled");
        assert!(installer.is_none());

        config.vector.enabled = true;
        config.vector.provider = "unknown".to_string();
        assert_eq!(vector_runtime(&config).0.name(), "disabled");
    }

    #[tokio::test]
    async fn test_run_version_and_none() {
        let dir = TempDir::new().unwrap();
        let app = app_in(&dir, "none");
        assert!(app.run(Some(Command::Version)).await.is_ok());
        assert!(app.run(None).await.is_ok());
    }

    #[tokio::test]
    async fn test_rebuild_then_query() {
        let dir = TempDir::new().unwrap();
        let app = app_in(&dir, "none");
        app.run(Some(Command::Rebuild)).await.unwrap();

        let manager = app.manager().await.unwrap();
        assert_eq!(manager.stats().total_documents, 2);
        assert_eq!(manager.mode(), IndexMode::Basic);

        let results = manager
            .find_similar("The quick brown fox jumps", 1, 0.0)
            .await
            .unwrap();
        assert_eq!(results[0].doc_id, "fox.md");
        assert_eq!(results[0].metadata["filename"], "fox.md");

        let query = Command::Query {
            text: "brown fox".to_string(),
            top_k: None,
            threshold: None,
            json: true,
        };
        assert!(app.run(Some(query)).await.is_ok());
    }

    #[tokio::test]
    async fn test_add_from_directory_and_text() {
        let dir = TempDir::new().unwrap();
        let app = app_in(&dir, "mock");

        app.run(Some(Command::Add {
            doc_id: "cook.txt".to_string(),
            text: None,
        }))
        .await
        .unwrap();
        app.run(Some(Command::Add {
            doc_id: "inline".to_string(),
            text: Some("inline text".to_string()),
        }))
        .await
        .unwrap();

        let manager = app.manager().await.unwrap();
        assert_eq!(manager.stats().total_documents, 2);
        assert_eq!(manager.mode(), IndexMode::Vector);
    }

    #[tokio::test]
    async fn test_rebuild_with_missing_content_keeps_index() {
        let dir = TempDir::new().unwrap();
        let app = app_in(&dir, "none");
        app.run(Some(Command::Rebuild)).await.unwrap();

        std::fs::remove_dir_all(dir.path().join("content")).unwrap();
        assert!(app.run(Some(Command::Rebuild)).await.is_err());

        let manager = app.manager().await.unwrap();
        assert_eq!(manager.stats().total_documents, 2);
    }

    #[tokio::test]
    async fn test_add_missing_document_fails() {
        let dir = TempDir::new().unwrap();
        let app = app_in(&dir, "none");
        let err = app
            .run(Some(Command::Add {
                doc_id: "nope.md".to_string(),
                text: None,
            }))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_stats_and_status() {
        let dir = TempDir::new().unwrap();
        let app = app_in(&dir, "mock");
        assert!(app.run(Some(Command::Stats { json: false })).await.is_ok());
        assert!(app.run(Some(Command::Stats { json: true })).await.is_ok());
        assert!(app.run(Some(Command::Status)).await.is_ok());
        assert!(app.run(Some(Command::Install)).await.is_ok());
    }
}

//! Readiness and loading of the embedding runtime.
//!
//! The vector backend is usable only once its runtime is present and its
//! model files are installed. An [`EmbeddingRuntime`] answers the cheap
//! "is it ready" question synchronously and performs the expensive model
//! load on request. Readiness is checked at index construction and on an
//! explicit reload; nothing polls it while queries run.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use simdex_core::{Error, Result};

use crate::embedding::{EmbeddingProvider, MockEmbeddingProvider};
use crate::install::BackendInstaller;

/// Source of an embedding provider that may not be installed yet.
#[async_trait]
pub trait EmbeddingRuntime: Send + Sync {
    /// Runtime name for diagnostics.
    fn name(&self) -> &str;

    /// Whether [`load`](Self::load) is expected to succeed.
    fn is_ready(&self) -> bool;

    /// Load the provider.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BackendUnavailable`] when the runtime is not ready
    /// or the model fails to initialize.
    async fn load(&self) -> Result<Arc<dyn EmbeddingProvider>>;
}

// ============================================================================
// DisabledRuntime
// ============================================================================

/// Runtime used when the vector backend is switched off.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledRuntime;

#[async_trait]
impl EmbeddingRuntime for DisabledRuntime {
    fn name(&self) -> &str {
        "disabled"
    }

    fn is_ready(&self) -> bool {
        false
    }

    async fn load(&self) -> Result<Arc<dyn EmbeddingProvider>> {
        Err(Error::backend_unavailable("vector backend disabled"))
    }
}

// ============================================================================
// MockRuntime
// ============================================================================

/// In-process runtime backed by [`MockEmbeddingProvider`].
///
/// Readiness is a flag: tests flip it directly, or run the runtime as a
/// [`BackendInstaller`] to simulate an install completing.
#[derive(Debug)]
pub struct MockRuntime {
    provider: Arc<MockEmbeddingProvider>,
    ready: AtomicBool,
    install_error: Option<String>,
}

impl MockRuntime {
    /// Create a runtime that is ready immediately.
    pub fn ready(dimension: usize) -> Self {
        Self::with_state(dimension, true)
    }

    /// Create a runtime that becomes ready only after an install.
    pub fn not_installed(dimension: usize) -> Self {
        Self::with_state(dimension, false)
    }

    fn with_state(dimension: usize, ready: bool) -> Self {
        Self {
            provider: Arc::new(MockEmbeddingProvider::new(dimension)),
            ready: AtomicBool::new(ready),
            install_error: None,
        }
    }

    /// Make every install attempt fail with `message`.
    pub fn with_install_error(mut self, message: impl Into<String>) -> Self {
        self.install_error = Some(message.into());
        self
    }

    /// Flip readiness.
    pub fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::SeqCst);
    }

    /// The shared provider, for inspecting its call counter.
    pub fn provider(&self) -> Arc<MockEmbeddingProvider> {
        Arc::clone(&self.provider)
    }
}

#[async_trait]
impl EmbeddingRuntime for MockRuntime {
    fn name(&self) -> &str {
        "mock"
    }

    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    async fn load(&self) -> Result<Arc<dyn EmbeddingProvider>> {
        if !self.is_ready() {
            return Err(Error::backend_unavailable("mock runtime not installed"));
        }
        let provider: Arc<dyn EmbeddingProvider> = self.provider.clone();
        Ok(provider)
    }
}

#[async_trait]
impl BackendInstaller for MockRuntime {
    fn name(&self) -> &str {
        "mock"
    }

    async fn install(&self) -> Result<()> {
        tokio::task::yield_now().await;
        if let Some(message) = &self.install_error {
            return Err(Error::operation(message.clone()));
        }
        self.set_ready(true);
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

//! Observable background installation of the vector backend.
//!
//! Installation (fetching a runtime, downloading model files) happens out
//! of band. The engine only needs to start it explicitly, report its
//! progress, and react once it finishes. [`InstallTask`] holds the status
//! on a `tokio::sync::watch` channel so any number of callers can poll or
//! await it.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use simdex_core::Result;
use tokio::sync::watch;

/// Status of a vector backend installation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "error", rename_all = "lowercase")]
pub enum InstallStatus {
    /// No install has been started.
    Idle,
    /// An install is in progress.
    Downloading,
    /// The last install completed successfully.
    Ready,
    /// The last install failed.
    Failed(String),
}

impl InstallStatus {
    /// Whether the install has finished, successfully or not.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Ready | Self::Failed(_))
    }
}

impl fmt::Display for InstallStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => f.write_str("idle"),
            Self::Downloading => f.write_str("downloading"),
            Self::Ready => f.write_str("ready"),
            Self::Failed(e) => write!(f, "failed: {e}"),
        }
    }
}

/// Something that can make an [`EmbeddingRuntime`](crate::EmbeddingRuntime) ready.
#[async_trait]
pub trait BackendInstaller: Send + Sync {
    /// Installer name for diagnostics.
    fn name(&self) -> &str;

    /// Run the installation to completion.
    async fn install(&self) -> Result<()>;
}

/// Status holder for the background install.
///
/// `begin` and `complete` bracket one install run. At most one run can be
/// in progress; a second `begin` while downloading is refused.
#[derive(Debug)]
pub struct InstallTask {
    status: watch::Sender<InstallStatus>,
}

impl Default for InstallTask {
    fn default() -> Self {
        Self::new()
    }
}

impl InstallTask {
    /// Create a task in the `Idle` state.
    pub fn new() -> Self {
        let (status, _) = watch::channel(InstallStatus::Idle);
        Self { status }
    }

    /// Current status.
    pub fn status(&self) -> InstallStatus {
        self.status.borrow().clone()
    }

    /// Receiver that observes every status transition.
    pub fn subscribe(&self) -> watch::Receiver<InstallStatus> {
        self.status.subscribe()
    }

    /// Move to `Downloading`. Returns `false` if a run is already in progress.
    pub fn begin(&self) -> bool {
        let started = self.status.send_if_modified(|status| {
            if *status == InstallStatus::Downloading {
                false
            } else {
                *status = InstallStatus::Downloading;
                true
            }
        });
        if started {
            log::info!("Vector backend install started");
        }
        started
    }

    /// Record the outcome of the run started by [`begin`](Self::begin).
    pub fn complete(&self, outcome: &Result<()>) -> InstallStatus {
        let status = match outcome {
            Ok(()) => {
                log::info!("Vector backend install finished");
                InstallStatus::Ready
            }
            Err(e) => {
                log::warn!("Vector backend install failed: {e}");
                InstallStatus::Failed(e.to_string())
            }
        };
        self.status.send_replace(status.clone());
        status
    }

    /// Run `installer` to completion on the current task.
    ///
    /// Returns `None` without doing anything if a run is already in progress.
    pub async fn run(&self, installer: &dyn BackendInstaller) -> Option<InstallStatus> {
        if !self.begin() {
            return None;
        }
        log::debug!("Running installer '{}'", installer.name());
        let outcome = installer.install().await;
        Some(self.complete(&outcome))
    }
}

// ============================================================================
// Tests
// ============================================================================

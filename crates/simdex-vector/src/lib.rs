//! Optional vector capability for Simdex.
//!
//! The similarity index can score documents either by comparing extracted
//! features or by comparing embeddings. This crate holds everything the
//! embedding path needs, kept apart so the basic path never depends on a
//! model being present.
//!
//! # Features
//!
//! - `vector-fastembed`: Enable local embedding generation via fastembed
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     simdex-vector                           │
//! ├─────────────────────────────────────────────────────────────┤
//! │  EmbeddingProvider trait                                    │
//! │  ├── MockEmbeddingProvider (always available)               │
//! │  └── FastEmbedProvider (feature: vector-fastembed)          │
//! ├─────────────────────────────────────────────────────────────┤
//! │  EmbeddingRuntime trait (readiness check + loading)         │
//! │  ├── DisabledRuntime / MockRuntime                          │
//! │  └── FastEmbedRuntime (feature: vector-fastembed)           │
//! ├─────────────────────────────────────────────────────────────┤
//! │  FlatIpIndex (exact inner-product search, rkyv artifact)    │
//! │  InstallTask (observable background install status)         │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod embedding;
pub mod flat;
pub mod install;
pub mod runtime;
pub mod types;

#[cfg(feature = "vector-fastembed")]
pub mod fastembed;

// Re-exports: core types
pub use embedding::{EmbeddingProvider, MockEmbeddingProvider, normalize};
pub use flat::FlatIpIndex;
pub use install::{BackendInstaller, InstallStatus, InstallTask};
pub use runtime::{DisabledRuntime, EmbeddingRuntime, MockRuntime};
pub use types::VectorConfig;

#[cfg(feature = "vector-fastembed")]
pub use crate::fastembed::{FastEmbedInstaller, FastEmbedProvider, FastEmbedRuntime};

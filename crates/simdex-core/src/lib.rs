//! Simdex Core: shared types, traits, and errors.
//!
//! This crate provides the foundational types used across all Simdex crates.
//! It has no internal Simdex dependencies (dependency level 0).
//!
//! # Modules
//!
//! - [`error`]: Error types and Result alias
//! - [`traits`]: The [`DocumentStore`] collaborator boundary
//! - [`types`]: Source documents, query results, index statistics
//! - [`util`]: Atomic file writes and path expansion

pub mod error;
pub mod traits;
pub mod types;
pub mod util;

// Re-export key types at crate root for convenience
pub use error::{Error, Result};
pub use traits::{DocumentIter, DocumentStore};
pub use types::{IndexMode, IndexStats, Metadata, SimilarDocument, SourceDocument};

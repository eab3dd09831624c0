//! Utility modules for file operations and path handling.
//!
//! # Modules
//!
//! - [`files`]: Atomic file replacement
//! - [`paths`]: Path expansion helpers (tilde, environment variables)

pub mod files;
pub mod paths;

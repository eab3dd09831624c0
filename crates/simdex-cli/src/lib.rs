//! Command-line front end for the Simdex similarity engine.
//!
//! # Modules
//!
//! - [`cli`]: clap argument and command definitions
//! - [`config`]: [`SimdexConfig`] loading via `confyg`
//! - [`store`]: [`DirectoryStore`], the content-directory document store
//! - [`app`]: [`SimdexApp`] command dispatch and logging setup

pub mod app;
pub mod cli;
pub mod config;
pub mod store;

pub use app::{SimdexApp, init_logging};
pub use cli::{CliArgs, Command};
pub use config::SimdexConfig;
pub use store::DirectoryStore;

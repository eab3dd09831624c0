//! CLI argument parsing and command definitions.

use clap::{Parser, Subcommand};

// ============================================================================
// CLI argument types
// ============================================================================

/// Find documents similar to a piece of text.
#[derive(Parser, Debug)]
#[command(name = "simdex", author, about, long_about = None)]
pub struct CliArgs {
    /// Path to configuration file.
    #[arg(short, long, env = "SIMDEX_CONFIG")]
    pub config: Option<String>,

    /// Enable verbose output.
    #[arg(short, long)]
    pub verbose: bool,

    /// Suppress non-essential output.
    #[arg(short, long)]
    pub quiet: bool,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Index one document.
    ///
    /// Without `--text`, the document is read from the content directory
    /// by its relative path.
    Add {
        /// Document id (relative path in the content directory).
        doc_id: String,

        /// Index this text under `doc_id` instead of reading a file.
        #[arg(long)]
        text: Option<String>,
    },

    /// Find documents similar to the given text.
    Query {
        /// Query text.
        text: String,

        /// Maximum number of results.
        #[arg(short = 'k', long)]
        top_k: Option<usize>,

        /// Minimum similarity score.
        #[arg(short, long)]
        threshold: Option<f64>,

        /// Print results as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Rebuild the index from the content directory.
    Rebuild,

    /// Show index statistics.
    Stats {
        /// Print statistics as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Show vector backend status.
    Status,

    /// Install the vector backend's model files, then switch to it.
    Install,

    /// Print version information.
    Version,
}

// ============================================================================
// Tests
// ============================================================================

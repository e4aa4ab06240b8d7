// /////////////////////////////////////////////////////////////////////////////
// NebulaStream Streaming Execution Core
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! # CLI Parser
//!
//! Command-line interface parsing using clap.
//!
//! This module defines the CLI structure and handles argument parsing.
//! Security validation happens in the validator module after parsing.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Main CLI structure
#[derive(Parser, Debug, Clone)]
#[command(name = "streaming-engine")]
#[command(about = concat!("NebulaStream streaming execution core v", env!("CARGO_PKG_VERSION")))]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose (debug-level) logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Engine configuration file (YAML); see `streaming_bootstrap::config` for recognised keys
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Override numberOfWorkerThreads from the config file
    #[arg(long)]
    pub worker_threads: Option<u16>,

    /// Override admissionQueueSize from the config file
    #[arg(long)]
    pub admission_queue_size: Option<u32>,
}

/// CLI subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Register and run a query plan until interrupted or end-of-stream
    Run {
        /// Query plan descriptor (JSON; see streaming_engine::query::plan)
        #[arg(short, long)]
        plan: PathBuf,

        /// Per-query graceful-stop deadline override, in milliseconds
        #[arg(long)]
        stop_timeout_ms: Option<u64>,
    },

    /// Parse and validate a query plan file without running it
    ValidatePlan {
        /// Query plan descriptor to validate
        plan: PathBuf,
    },

    /// Validate an engine configuration file against its documented bounds
    ValidateConfig {
        /// Configuration file to validate
        config: PathBuf,
    },

    /// Print the effective configuration (defaults layered with overrides)
    ShowConfig,
}

/// Parse CLI arguments
///
/// This is the entry point for CLI parsing. It uses clap to parse
/// arguments and returns the parsed CLI structure.
///
/// # Returns
///
/// Parsed `Cli` structure with all arguments
///
/// # Panics
///
/// Clap will exit the process with appropriate error message if parsing fails
pub fn parse_cli() -> Cli {
    Cli::parse()
}

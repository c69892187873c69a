//! CLI command definitions for scaffold-kit
//!
//! This module defines the CLI structure using clap's derive macros.
//! The main entry point is the `Cli` struct which contains subcommands.

pub mod apply;
pub mod discover;

use apply::ApplyArgs;
use clap::{Parser, Subcommand};
use discover::{FindRootArgs, ScopesArgs};

/// Exit code for a successful run.
pub const EXIT_SUCCESS: i32 = 0;
/// Exit code for a failed run or command.
pub const EXIT_ERROR: i32 = 1;
/// Exit code for a run stopped by an abort.
pub const EXIT_ABORTED: i32 = 2;

/// Project scaffolding with conflict-aware file generation
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file (bypasses the project and user tiers)
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Logging output: 0/off, 1/stdout, 2/stderr (default), or filename
    #[arg(short, long, default_value = "2", global = true)]
    pub log: String,

    #[command(subcommand)]
    pub command: Command,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Apply a recipe to a target directory
    Apply(ApplyArgs),

    /// Print the nearest ancestor file with the given name
    FindRoot(FindRootArgs),

    /// List workspace packages below a root directory
    Scopes(ScopesArgs),
}

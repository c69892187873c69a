//! scaffold-kit
//!
//! Applies scaffolding recipes to a project directory, reconciling every file
//! that already exists instead of clobbering it.

use anyhow::Result;
use clap::Parser;
use scaffold_kit::cli::apply::run_apply;
use scaffold_kit::cli::discover::{run_find_root, run_scopes};
use scaffold_kit::cli::{Cli, Command, EXIT_ERROR};
use scaffold_kit::logging::{LogTarget, init_logging};
use tracing::debug;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on --log option
    init_logging(&LogTarget::parse(&cli.log), cli.verbose)?;

    // If explicit config path given, set it as env var for ConfigLoader to pick up
    // SAFETY: This is safe at program startup before any other threads are spawned
    if let Some(config_path) = &cli.config {
        // Use unsafe block for set_var which is required in Rust 2024 edition
        unsafe {
            std::env::set_var("SCAFFOLD_KIT_CONFIG_PATH", config_path);
        }
    }

    debug!(command = ?cli.command, "Starting");

    let code = match &cli.command {
        Command::Apply(args) => run_apply(args).await,
        Command::FindRoot(args) => run_find_root(args),
        Command::Scopes(args) => run_scopes(args).await,
    };

    match code {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(EXIT_ERROR);
        }
    }
}

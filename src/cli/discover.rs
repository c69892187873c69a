//! `find-root` and `scopes` commands.

use super::{EXIT_ERROR, EXIT_SUCCESS};
use crate::config::DEFAULT_MANIFEST;
use crate::fs::DiskFs;
use crate::traverse::{discover_scopes, find_up};
use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;

/// Arguments for the find-root command.
#[derive(Args, Debug)]
pub struct FindRootArgs {
    /// File that marks the root
    #[arg(long, default_value = DEFAULT_MANIFEST)]
    pub marker: String,

    /// Directory to start from (default: current directory)
    #[arg(long)]
    pub from: Option<PathBuf>,
}

/// Arguments for the scopes command.
#[derive(Args, Debug)]
pub struct ScopesArgs {
    /// Directory to search below (default: project root of the current directory)
    #[arg(long)]
    pub root: Option<PathBuf>,

    /// File that marks a package
    #[arg(long, default_value = DEFAULT_MANIFEST)]
    pub marker: String,

    /// How many levels below the root to descend
    #[arg(long)]
    pub max_depth: Option<usize>,
}

/// Run the find-root command.
pub fn run_find_root(args: &FindRootArgs) -> Result<i32> {
    let start = match &args.from {
        Some(dir) => dir.clone(),
        None => std::env::current_dir().context("Failed to read current directory")?,
    };

    match find_up(&start, &args.marker) {
        Some(path) => {
            println!("{}", path.display());
            Ok(EXIT_SUCCESS)
        }
        None => {
            eprintln!("No {} found at or above {}", args.marker, start.display());
            Ok(EXIT_ERROR)
        }
    }
}

/// Run the scopes command.
pub async fn run_scopes(args: &ScopesArgs) -> Result<i32> {
    let root = match &args.root {
        Some(dir) => std::path::absolute(dir)
            .with_context(|| format!("Invalid root {}", dir.display()))?,
        None => {
            let cwd = std::env::current_dir().context("Failed to read current directory")?;
            find_up(&cwd, &args.marker)
                .and_then(|marker| marker.parent().map(|p| p.to_path_buf()))
                .unwrap_or(cwd)
        }
    };

    let scopes = discover_scopes(&DiskFs, &root, &args.marker, args.max_depth)
        .await
        .with_context(|| format!("Failed to search {}", root.display()))?;

    if scopes.is_empty() {
        eprintln!("No {} found below {}", args.marker, root.display());
        return Ok(EXIT_ERROR);
    }
    for scope in scopes {
        println!("{}", scope.display());
    }
    Ok(EXIT_SUCCESS)
}

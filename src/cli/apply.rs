//! `apply` command: run a recipe against a target directory.

use super::{EXIT_ABORTED, EXIT_ERROR, EXIT_SUCCESS};
use crate::config::{Config, ConfigLoader};
use crate::conflict::{Confirm, Confirmation, ConflictStrategy};
use crate::entry::sort_by_priority;
use crate::format::{OutputFormat, format_result};
use crate::fs::{DiskFs, DryRunFs, FileSystem};
use crate::install::{CommandInstaller, DependencyInstaller, RecordingInstaller};
use crate::manifest::JsonManifest;
use crate::orchestrator::{OrchestratorOptions, OrchestratorResult, RunStatus, orchestrate};
use crate::recipe::Recipe;
use anyhow::{Context, Result};
use async_trait::async_trait;
use clap::Args;
use serde_json::Value;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

/// Arguments for the apply command.
#[derive(Args, Debug)]
pub struct ApplyArgs {
    /// Recipe file (YAML or JSON)
    pub recipe: PathBuf,

    /// Directory to scaffold into
    #[arg(short, long, default_value = ".")]
    pub target: PathBuf,

    /// Conflict strategy for entries that do not set one (overrides config)
    #[arg(short, long)]
    pub strategy: Option<ConflictStrategy>,

    /// Write without asking for confirmation.
    #[arg(short = 'y', long)]
    pub yes: bool,

    /// Show what would be written without making changes.
    #[arg(long)]
    pub dry_run: bool,

    /// Record dependencies without installing them.
    #[arg(long)]
    pub no_install: bool,

    /// Report format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Markdown)]
    pub format: OutputFormat,
}

/// Run the apply command and return the process exit code.
pub async fn run_apply(args: &ApplyArgs) -> Result<i32> {
    let target = std::path::absolute(&args.target)
        .with_context(|| format!("Invalid target {}", args.target.display()))?;
    let config = ConfigLoader::load(&target)?.into_config();

    let dry_run = args.dry_run.then(|| Arc::new(DryRunFs::new()));
    let fs: Arc<dyn FileSystem> = match &dry_run {
        Some(dry) => dry.clone(),
        None => Arc::new(DiskFs),
    };

    let recipe = Recipe::load(fs.as_ref(), &args.recipe)
        .await
        .with_context(|| format!("Failed to load recipe {}", args.recipe.display()))?;
    let mut entries = recipe.into_entries()?;
    sort_by_priority(&mut entries);
    info!(recipe = %args.recipe.display(), entries = entries.len(), "Loaded recipe");

    let options = build_options(args, &config, &target, fs, entries);
    let result = orchestrate(options).await;

    println!("{}", format_result(&result, args.format));
    if let Some(dry) = dry_run
        && args.format == OutputFormat::Markdown
    {
        print_pending(&dry);
    }

    Ok(exit_code(&result))
}

fn build_options(
    args: &ApplyArgs,
    config: &Config,
    target: &Path,
    fs: Arc<dyn FileSystem>,
    entries: Vec<crate::entry::ConfigEntry>,
) -> OrchestratorOptions {
    let installer: Arc<dyn DependencyInstaller> =
        if args.dry_run || args.no_install || !config.install.enabled {
            Arc::new(RecordingInstaller::new())
        } else {
            Arc::new(CommandInstaller::new(&config.install, target))
        };
    let manifest = Arc::new(JsonManifest::new(
        fs.clone(),
        target.join(&config.manifest.filename),
    ));

    let mut options = OrchestratorOptions::new(target, fs, installer, manifest)
        .entries(entries)
        .default_strategy(args.strategy.unwrap_or(config.conflicts.default_strategy))
        .existing_manifest(config.manifest.on_existing)
        .derived_scripts(config.manifest.derived_scripts());
    if config.conflicts.confirm && !args.yes {
        options = options.confirm(Arc::new(StdinConfirm));
    }
    options
}

/// Exit code for a finished run.
pub fn exit_code(result: &OrchestratorResult) -> i32 {
    match result.status {
        RunStatus::Success => EXIT_SUCCESS,
        RunStatus::Aborted { .. } => EXIT_ABORTED,
        RunStatus::Error { .. } => EXIT_ERROR,
    }
}

fn print_pending(dry: &DryRunFs) {
    let files = dry.pending().files();
    println!("## Dry run\n");
    if files.is_empty() {
        println!("No files would be written.");
        return;
    }
    for file in files {
        println!("- would write `{}`", file.display());
    }
}

/// Asks on the terminal before each overwrite or merge.
pub struct StdinConfirm;

#[async_trait]
impl Confirm for StdinConfirm {
    async fn confirm(&self, path: &Path, old: &Value, new: &Value) -> Confirmation {
        eprintln!("\n{} already exists.", path.display());
        eprintln!("--- current\n{}", preview(old));
        eprintln!("+++ proposed\n{}", preview(new));
        eprint!("Write it? [y]es / [s]kip / [a]bort: ");
        let _ = std::io::stderr().flush();

        let mut input = String::new();
        let mut reader = BufReader::new(tokio::io::stdin());
        match reader.read_line(&mut input).await {
            Ok(_) => parse_answer(&input),
            // No terminal to ask: leave the file alone
            Err(_) => Confirmation::Skip,
        }
    }
}

/// Map a prompt answer to a confirmation. Anything unrecognised skips.
pub fn parse_answer(input: &str) -> Confirmation {
    match input.trim().to_lowercase().as_str() {
        "y" | "yes" => Confirmation::Proceed,
        "a" | "abort" => Confirmation::Abort,
        _ => Confirmation::Skip,
    }
}

fn preview(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => serde_json::to_string_pretty(other).unwrap_or_default(),
    }
}

//! Output formatting utilities for markdown and JSON.

use crate::conflict::{Confirmation, ConflictResolutionResult};
use crate::install::InstallOutcome;
use crate::orchestrator::{EntryReport, FileReport, OrchestratorResult, RunStatus};
use serde_json::Value;
use std::path::{Path, PathBuf};

/// Output format for run reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    Json,
    #[default]
    #[value(alias = "md")]
    Markdown,
}

/// Render a run report in the requested format.
pub fn format_result(result: &OrchestratorResult, format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => serde_json::to_string_pretty(result)
            .unwrap_or_else(|e| format!("{{\"status\": \"error\", \"message\": \"{}\"}}", e)),
        OutputFormat::Markdown => format_result_markdown(result),
    }
}

/// Format a run report as markdown.
pub fn format_result_markdown(result: &OrchestratorResult) -> String {
    let mut md = String::new();

    md.push_str(&format!("# Scaffold: {}\n", result.target_dir.display()));
    md.push_str(&format!("- **status**: {}\n", format_status(&result.status)));
    md.push_str(&format!(
        "- **duration**: {} ms\n",
        (result.finished_at - result.started_at).num_milliseconds()
    ));

    let written = result.files().filter(|f| f.written).count();
    let conflicts = result.files().filter(|f| f.conflict).count();
    md.push_str(&format!(
        "- **files**: {} written, {} conflicts\n",
        written, conflicts
    ));

    let failed: Vec<String> = result
        .failed_dependencies()
        .map(|d| format!("`{}`", d.name))
        .collect();
    if !failed.is_empty() {
        md.push_str(&format!("- **failed dependencies**: {}\n", failed.join(", ")));
    }
    md.push('\n');

    for entry in &result.entries {
        md.push_str(&format_entry_markdown(entry, &result.target_dir));
    }

    if let Some(ref manifest) = result.manifest {
        md.push_str("## Manifest\n\n```json\n");
        md.push_str(&serde_json::to_string_pretty(manifest).unwrap_or_default());
        md.push_str("\n```\n");
    } else if !is_empty_patch(&result.final_manifest_patch) {
        md.push_str("## Manifest patch (not written)\n\n```json\n");
        md.push_str(&serde_json::to_string_pretty(&result.final_manifest_patch).unwrap_or_default());
        md.push_str("\n```\n");
    }

    md
}

fn format_status(status: &RunStatus) -> String {
    match status {
        RunStatus::Success => "success".to_string(),
        RunStatus::Aborted { reason, .. } => format!("aborted ({})", reason),
        RunStatus::Error { message, .. } => format!("error ({})", message),
    }
}

/// Format one entry's contribution.
fn format_entry_markdown(entry: &EntryReport, target_dir: &Path) -> String {
    let mut md = String::new();
    md.push_str(&format!("## {}\n", entry.name));

    for dep in &entry.dependencies {
        let dev = if dep.dev { " (dev)" } else { "" };
        let outcome = match &dep.outcome {
            InstallOutcome::Installed => "installed".to_string(),
            InstallOutcome::AlreadyPresent => "already present".to_string(),
            InstallOutcome::Failed(reason) => format!("**failed**: {}", reason),
        };
        md.push_str(&format!("- dependency `{}`{}: {}\n", dep.name, dev, outcome));
    }

    for file in &entry.files {
        md.push_str(&format_file_short(file, target_dir));
    }

    for failure in &entry.hook_failures {
        md.push_str(&format!("- hook **failed**: {}\n", failure));
    }

    md.push('\n');
    md
}

/// Format a file outcome on one line.
fn format_file_short(file: &FileReport, target_dir: &Path) -> String {
    let shown: PathBuf = file
        .path
        .strip_prefix(target_dir)
        .map(Path::to_path_buf)
        .unwrap_or_else(|_| file.path.clone());

    let outcome = match (&file.error, &file.resolution) {
        (Some(err), _) => format!("**error**: {}", err),
        (None, Some(resolution)) => format_resolution(resolution),
        (None, None) if file.written => "created".to_string(),
        (None, None) => "not written".to_string(),
    };

    format!("- file `{}`: {}\n", shown.display(), outcome)
}

fn format_resolution(resolution: &ConflictResolutionResult) -> String {
    let mut out = resolution.handled_with.to_string();
    if let Some(ref steps) = resolution.merge {
        out.push_str(&format!(
            " [{} / {} / {}]",
            steps.parse, steps.merge, steps.serialize
        ));
    }
    match resolution.confirmation {
        Some(Confirmation::Skip) => out.push_str(", declined"),
        Some(Confirmation::Abort) => out.push_str(", aborted"),
        Some(Confirmation::Proceed) | None => {}
    }
    if !resolution.written {
        out.push_str(", unchanged");
    }
    out
}

fn is_empty_patch(patch: &Value) -> bool {
    match patch {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

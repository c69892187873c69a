//! Resolution of a single conflicting path.
//!
//! Each call resolves exactly once: `Detected -> {Abort | Skip | Overwrite | Merge} -> Resolved`.
//! Whether to try again is the caller's business.

use super::types::{
    Confirm, Confirmation, ConflictFileData, ConflictResolutionResult, ConflictStrategy,
    MergeSteps,
};
use crate::config::deep_merge;
use crate::error::{ScaffoldError, ScaffoldResult};
use crate::fs::{FileSystem, Format};
use serde_json::Value;
use std::path::Path;
use tracing::{debug, info};

/// Step name reported when the built-in text merge ran.
pub const CONCAT_MERGE: &str = "concat";
/// Step name reported when the built-in structured merge ran.
pub const DEEP_MERGE: &str = "deep-merge";
/// Step name reported when a string was written verbatim.
pub const IDENTITY_SERIALIZE: &str = "identity";

/// Everything needed to resolve one conflicting path.
pub struct ConflictRequest<'a> {
    pub file_path: &'a Path,
    pub file_data: &'a ConflictFileData,
    pub incoming: &'a Value,
    pub confirm: Option<&'a dyn Confirm>,
}

/// Resolve a conflict on an existing file with the given strategy.
///
/// `abort` and `skip` do no I/O. `overwrite` and `merge` consult the
/// confirmation (if any) before writing; a confirmation of `Skip` or `Abort`
/// leaves the file untouched but the record still names the requested
/// strategy. A malformed existing file fails the merge with a parse error
/// instead of being treated as absent.
pub async fn resolve(
    fs: &dyn FileSystem,
    strategy: ConflictStrategy,
    request: ConflictRequest<'_>,
) -> ScaffoldResult<ConflictResolutionResult> {
    debug!(path = %request.file_path.display(), strategy = %strategy, "Resolving conflict");

    match strategy {
        ConflictStrategy::Abort | ConflictStrategy::Skip => {
            Ok(ConflictResolutionResult::untouched(strategy))
        }
        ConflictStrategy::Overwrite => overwrite(fs, request).await,
        ConflictStrategy::Merge => merge(fs, request).await,
    }
}

async fn overwrite(
    fs: &dyn FileSystem,
    request: ConflictRequest<'_>,
) -> ScaffoldResult<ConflictResolutionResult> {
    let path = request.file_path;
    let mut result = ConflictResolutionResult::untouched(ConflictStrategy::Overwrite);

    if let Some(confirm) = request.confirm {
        let old = read_for_display(fs, path, request.file_data).await?;
        let confirmation = confirm.confirm(path, &old, request.incoming).await;
        result.confirmation = Some(confirmation);
        if confirmation != Confirmation::Proceed {
            info!(path = %path.display(), confirmation = ?confirmation, "Overwrite declined");
            return Ok(result);
        }
    }

    let (_, contents) = serialize(path, request.file_data, request.incoming)?;
    fs.write_raw(path, &contents).await?;
    result.written = true;
    info!(path = %path.display(), "Overwrote existing file");
    Ok(result)
}

async fn merge(
    fs: &dyn FileSystem,
    request: ConflictRequest<'_>,
) -> ScaffoldResult<ConflictResolutionResult> {
    let path = request.file_path;
    let data = request.file_data;
    let mut result = ConflictResolutionResult::untouched(ConflictStrategy::Merge);

    let (parse_name, existing) = parse(fs, path, data).await?;

    let (merge_name, merged) = match data.merger() {
        Some(merger) => {
            let merged = merger
                .merge(&existing, request.incoming)
                .map_err(|e| ScaffoldError::merge(path, merger.name(), e))?;
            (merger.name().to_string(), merged)
        }
        None => default_merge(&existing, request.incoming),
    };

    if let Some(confirm) = request.confirm {
        let confirmation = confirm.confirm(path, &existing, &merged).await;
        result.confirmation = Some(confirmation);
        if confirmation != Confirmation::Proceed {
            result.merge = Some(MergeSteps {
                parse: parse_name,
                merge: merge_name,
                serialize: planned_serialize_name(path, data, &merged),
            });
            info!(path = %path.display(), confirmation = ?confirmation, "Merge declined");
            return Ok(result);
        }
    }

    let (serialize_name, contents) = serialize(path, data, &merged)?;
    fs.write_raw(path, &contents).await?;

    debug!(
        path = %path.display(),
        parse = %parse_name,
        merge = %merge_name,
        serialize = %serialize_name,
        "Merged existing file"
    );
    result.written = true;
    result.merge = Some(MergeSteps {
        parse: parse_name,
        merge: merge_name,
        serialize: serialize_name,
    });
    Ok(result)
}

/// Read the existing file with the selected parse step.
async fn parse(
    fs: &dyn FileSystem,
    path: &Path,
    data: &ConflictFileData,
) -> ScaffoldResult<(String, Value)> {
    match data.parser() {
        Some(parser) => {
            let raw = fs.read_raw(path).await?;
            let value = parser
                .parse(path, &raw)
                .map_err(|e| ScaffoldError::parse(path, e))?;
            Ok((parser.name().to_string(), value))
        }
        None => {
            let value = fs.read_structured(path).await?;
            Ok((default_parse_name(path), value))
        }
    }
}

/// Existing content shown to a confirmation before an overwrite.
///
/// Overwriting does not depend on the old content, so a file that fails to
/// parse is shown as raw text rather than failing the overwrite.
async fn read_for_display(
    fs: &dyn FileSystem,
    path: &Path,
    data: &ConflictFileData,
) -> ScaffoldResult<Value> {
    match parse(fs, path, data).await {
        Ok((_, value)) => Ok(value),
        Err(_) => Ok(Value::String(fs.read_raw(path).await?)),
    }
}

/// Built-in merge: text is concatenated, everything else deep merged.
pub fn default_merge(existing: &Value, incoming: &Value) -> (String, Value) {
    match (existing, incoming) {
        (Value::String(old), Value::String(new)) => {
            (CONCAT_MERGE.to_string(), Value::String(concat_text(old, new)))
        }
        _ => (DEEP_MERGE.to_string(), deep_merge(existing, incoming)),
    }
}

fn concat_text(old: &str, new: &str) -> String {
    let mut out = String::with_capacity(old.len() + new.len() + 1);
    out.push_str(old);
    if !old.is_empty() && !new.is_empty() && !old.ends_with('\n') {
        out.push('\n');
    }
    out.push_str(new);
    out
}

/// Serialize with the selected step: custom serializer, verbatim string, or
/// the structured format implied by the extension.
fn serialize(path: &Path, data: &ConflictFileData, value: &Value) -> ScaffoldResult<(String, String)> {
    if let Some(serializer) = data.serializer() {
        let contents = serializer
            .serialize(path, value)
            .map_err(|e| ScaffoldError::unsupported_format(path, &e.to_string()))?;
        return Ok((serializer.name().to_string(), contents));
    }

    match value {
        Value::String(text) => Ok((IDENTITY_SERIALIZE.to_string(), text.clone())),
        other => {
            let format = Format::from_path(path);
            Ok((format.as_str().to_string(), format.serialize(path, other)?))
        }
    }
}

fn planned_serialize_name(path: &Path, data: &ConflictFileData, value: &Value) -> String {
    match (data.serializer(), value) {
        (Some(serializer), _) => serializer.name().to_string(),
        (None, Value::String(_)) => IDENTITY_SERIALIZE.to_string(),
        (None, _) => Format::from_path(path).as_str().to_string(),
    }
}

fn default_parse_name(path: &Path) -> String {
    Format::from_path(path).as_str().to_string()
}

//! The shared manifest that every entry patches into.
//!
//! The orchestrator folds all patches in memory and hands the result to
//! [`ManifestOps`] once at the end of the run.

use crate::config::deep_merge;
use crate::error::{ErrorCode, ScaffoldError, ScaffoldResult};
use crate::fs::FileSystem;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// What to do with a manifest that already exists on disk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExistingManifest {
    /// Deep merge the accumulated patch over the existing document.
    #[default]
    Merge,
    /// Write the accumulated patch as the whole document.
    Replace,
}

/// Injected manifest operations.
#[async_trait]
pub trait ManifestOps: Send + Sync {
    /// Location of the manifest.
    fn path(&self) -> &Path;

    /// Current document, or `None` when there is no manifest yet.
    async fn read(&self) -> ScaffoldResult<Option<Value>>;

    /// Merge `patch` into the existing document (if any) and write it.
    /// Returns the document that was written.
    async fn merge(&self, patch: &Value) -> ScaffoldResult<Value>;

    /// Write `document` as the whole manifest.
    async fn replace(&self, document: &Value) -> ScaffoldResult<Value>;
}

/// JSON manifest stored through a [`FileSystem`].
#[derive(Clone)]
pub struct JsonManifest {
    path: PathBuf,
    fs: Arc<dyn FileSystem>,
}

impl JsonManifest {
    pub fn new(fs: Arc<dyn FileSystem>, path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            fs,
        }
    }

    async fn write(&self, document: &Value) -> ScaffoldResult<()> {
        self.fs
            .write_structured(&self.path, document)
            .await
            .map_err(|e| ScaffoldError::manifest_write(&self.path, e))
    }
}

#[async_trait]
impl ManifestOps for JsonManifest {
    fn path(&self) -> &Path {
        &self.path
    }

    async fn read(&self) -> ScaffoldResult<Option<Value>> {
        if !self.fs.exists(&self.path).await {
            return Ok(None);
        }
        self.fs.read_structured(&self.path).await.map(Some)
    }

    async fn merge(&self, patch: &Value) -> ScaffoldResult<Value> {
        let merged = match self.read().await {
            Ok(Some(existing)) => deep_merge(&existing, patch),
            Ok(None) => deep_merge(&Value::Object(Map::new()), patch),
            Err(e) if e.code == ErrorCode::ParseError => {
                return Err(ScaffoldError::manifest_write(&self.path, e));
            }
            Err(e) => return Err(e),
        };
        self.write(&merged).await?;
        Ok(merged)
    }

    async fn replace(&self, document: &Value) -> ScaffoldResult<Value> {
        let document = if document.is_null() {
            Value::Object(Map::new())
        } else {
            document.clone()
        };
        self.write(&document).await?;
        Ok(document)
    }
}

/// Settings for the composite scripts added after all entries ran.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DerivedScripts {
    /// Scripts chained into `check`, in order, when present.
    pub check: Vec<String>,
    /// Scripts starting with this prefix are chained into `update`.
    pub update_prefix: String,
}

/// Derived fields to fold into the accumulated patch.
///
/// `preview` is what the manifest would look like after the write. A derived
/// script is only added when the preview does not define it already and there
/// is at least one script to chain. Returns `Value::Null` when nothing is added.
pub fn derived_fields(preview: &Value, derived: &DerivedScripts) -> Value {
    let empty = Map::new();
    let scripts = preview
        .get("scripts")
        .and_then(Value::as_object)
        .unwrap_or(&empty);

    let mut added = Map::new();

    let check: Vec<&str> = derived
        .check
        .iter()
        .map(String::as_str)
        .filter(|name| scripts.contains_key(*name))
        .collect();
    if let Some(command) = chain("check", &check, scripts) {
        added.insert("check".into(), Value::String(command));
    }

    if !derived.update_prefix.is_empty() {
        let mut update: Vec<&str> = scripts
            .keys()
            .map(String::as_str)
            .filter(|name| name.starts_with(&derived.update_prefix))
            .collect();
        update.sort_unstable();
        if let Some(command) = chain("update", &update, scripts) {
            added.insert("update".into(), Value::String(command));
        }
    }

    if added.is_empty() {
        Value::Null
    } else {
        serde_json::json!({ "scripts": added })
    }
}

fn chain(key: &str, parts: &[&str], scripts: &Map<String, Value>) -> Option<String> {
    if parts.is_empty() || scripts.contains_key(key) {
        return None;
    }
    Some(
        parts
            .iter()
            .map(|name| format!("npm run {}", name))
            .collect::<Vec<_>>()
            .join(" && "),
    )
}

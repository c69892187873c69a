//! Configuration entries: one producer's contribution to a scaffolding run.
//!
//! An entry is immutable once built. Hooks and content producers are plain
//! function values carried in the record.

use crate::conflict::{ConflictFileData, ConflictStrategy};
use crate::error::{ScaffoldError, ScaffoldResult};
use crate::fs::FileSystem;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;

/// Options passed to the dependency installer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallOptions {
    /// Development-only dependency.
    #[serde(default)]
    pub dev: bool,
}

/// A package the entry needs installed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependency {
    pub name: String,
    #[serde(flatten)]
    pub options: InstallOptions,
}

impl Dependency {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            options: InstallOptions::default(),
        }
    }

    pub fn dev(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            options: InstallOptions { dev: true },
        }
    }
}

/// Pure function from the entry's input to file content.
pub type ContentFn = dyn Fn(&Value) -> Value + Send + Sync;

/// A file an entry wants written, relative to the target directory.
#[derive(Clone)]
pub struct FileArtifact {
    pub filename: PathBuf,
    pub content: Arc<ContentFn>,
    pub file_data: ConflictFileData,
}

impl FileArtifact {
    pub fn new<F>(filename: impl Into<PathBuf>, content: F) -> Self
    where
        F: Fn(&Value) -> Value + Send + Sync + 'static,
    {
        Self {
            filename: filename.into(),
            content: Arc::new(content),
            file_data: ConflictFileData::Default,
        }
    }

    /// Artifact whose content does not depend on the entry input.
    pub fn fixed(filename: impl Into<PathBuf>, content: Value) -> Self {
        Self::new(filename, move |_| content.clone())
    }

    pub fn with_file_data(mut self, file_data: ConflictFileData) -> Self {
        self.file_data = file_data;
        self
    }

    /// Produce this artifact's content for an entry input.
    pub fn render(&self, input: &Value) -> Value {
        (self.content)(input)
    }
}

impl fmt::Debug for FileArtifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileArtifact")
            .field("filename", &self.filename)
            .field("file_data", &self.file_data)
            .finish_non_exhaustive()
    }
}

/// What a hook gets to work with.
#[derive(Clone)]
pub struct HookContext {
    pub entry: String,
    pub target_dir: PathBuf,
    pub fs: Arc<dyn FileSystem>,
}

pub type HookFuture = Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send>>;

/// Side-effecting hook run before or after an entry's files are written.
///
/// Hooks may run more than once across retried runs, so they must be idempotent.
pub type Hook = Arc<dyn Fn(HookContext) -> HookFuture + Send + Sync>;

/// One producer's dependencies, files, manifest patch and hooks.
#[derive(Clone)]
pub struct ConfigEntry {
    pub name: String,
    /// Sort key for [`sort_by_priority`]. Lower runs first.
    pub priority: i32,
    /// Input handed to every content producer.
    pub input: Value,
    pub dependencies: Vec<Dependency>,
    pub files: Vec<FileArtifact>,
    pub manifest_patch: Value,
    /// Overrides the run-level strategy for this entry's conflicts.
    pub conflict_strategy: Option<ConflictStrategy>,
    pub pre_process: Option<Hook>,
    pub post_process: Option<Hook>,
}

impl ConfigEntry {
    pub fn builder(name: impl Into<String>) -> ConfigEntryBuilder {
        ConfigEntryBuilder::new(name)
    }
}

impl fmt::Debug for ConfigEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigEntry")
            .field("name", &self.name)
            .field("priority", &self.priority)
            .field("dependencies", &self.dependencies)
            .field("files", &self.files)
            .field("manifest_patch", &self.manifest_patch)
            .field("conflict_strategy", &self.conflict_strategy)
            .field("pre_process", &self.pre_process.is_some())
            .field("post_process", &self.post_process.is_some())
            .finish()
    }
}

/// Builder for [`ConfigEntry`].
pub struct ConfigEntryBuilder {
    entry: ConfigEntry,
}

impl ConfigEntryBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            entry: ConfigEntry {
                name: name.into(),
                priority: 0,
                input: Value::Object(Default::default()),
                dependencies: Vec::new(),
                files: Vec::new(),
                manifest_patch: Value::Null,
                conflict_strategy: None,
                pre_process: None,
                post_process: None,
            },
        }
    }

    pub fn priority(mut self, priority: i32) -> Self {
        self.entry.priority = priority;
        self
    }

    pub fn input(mut self, input: Value) -> Self {
        self.entry.input = input;
        self
    }

    pub fn dependency(mut self, dependency: Dependency) -> Self {
        self.entry.dependencies.push(dependency);
        self
    }

    pub fn file(mut self, artifact: FileArtifact) -> Self {
        self.entry.files.push(artifact);
        self
    }

    pub fn manifest_patch(mut self, patch: Value) -> Self {
        self.entry.manifest_patch = patch;
        self
    }

    pub fn conflict_strategy(mut self, strategy: ConflictStrategy) -> Self {
        self.entry.conflict_strategy = Some(strategy);
        self
    }

    pub fn pre_process<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn(HookContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.entry.pre_process = Some(boxed_hook(hook));
        self
    }

    pub fn post_process<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn(HookContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.entry.post_process = Some(boxed_hook(hook));
        self
    }

    /// Finish the entry. Filenames must be unique within the entry.
    pub fn build(self) -> ScaffoldResult<ConfigEntry> {
        let mut seen = HashSet::new();
        for file in &self.entry.files {
            if !seen.insert(file.filename.as_path()) {
                return Err(ScaffoldError::duplicate_file(
                    &self.entry.name,
                    &file.filename.display().to_string(),
                ));
            }
        }
        Ok(self.entry)
    }
}

fn boxed_hook<F, Fut>(hook: F) -> Hook
where
    F: Fn(HookContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    Arc::new(move |ctx: HookContext| Box::pin(hook(ctx)) as HookFuture)
}

/// Filenames claimed by more than one entry, with the claiming entries in order.
pub fn shared_targets(entries: &[ConfigEntry]) -> BTreeMap<PathBuf, Vec<String>> {
    let mut claims: BTreeMap<PathBuf, Vec<String>> = BTreeMap::new();
    for entry in entries {
        for file in &entry.files {
            claims
                .entry(file.filename.clone())
                .or_default()
                .push(entry.name.clone());
        }
    }
    claims.retain(|_, owners| owners.len() > 1);
    claims
}

/// Stable ascending sort by priority.
pub fn sort_by_priority(entries: &mut [ConfigEntry]) {
    entries.sort_by_key(|e| e.priority);
}

//! Injected filesystem primitives.
//!
//! The orchestrator and conflict resolver never touch `std::fs` directly. They
//! go through [`FileSystem`], which has a disk-backed implementation for real
//! runs, an in-memory implementation for tests, and a disk-over-memory overlay
//! for dry runs.

use crate::error::{ScaffoldError, ScaffoldResult};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Structured format of a file, chosen by extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Json,
    Yaml,
    Text,
}

impl Format {
    pub fn from_path(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .as_deref()
        {
            Some("json") => Format::Json,
            Some("yaml") | Some("yml") => Format::Yaml,
            _ => Format::Text,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Format::Json => "json",
            Format::Yaml => "yaml",
            Format::Text => "text",
        }
    }

    /// Parse raw file contents. Text files become a JSON string value.
    pub fn parse(&self, path: &Path, raw: &str) -> ScaffoldResult<Value> {
        match self {
            Format::Json => serde_json::from_str(raw).map_err(|e| ScaffoldError::parse(path, e)),
            Format::Yaml => {
                let value: Value =
                    serde_yaml::from_str(raw).map_err(|e| ScaffoldError::parse(path, e))?;
                // An empty YAML document parses to null
                Ok(if value.is_null() {
                    Value::Object(Default::default())
                } else {
                    value
                })
            }
            Format::Text => Ok(Value::String(raw.to_string())),
        }
    }

    /// Serialize a value for this format.
    ///
    /// JSON is pretty-printed with a trailing newline. Text files only accept
    /// string values.
    pub fn serialize(&self, path: &Path, value: &Value) -> ScaffoldResult<String> {
        match self {
            Format::Json => {
                let mut out = serde_json::to_string_pretty(value)
                    .map_err(|e| ScaffoldError::unsupported_format(path, &e.to_string()))?;
                out.push('\n');
                Ok(out)
            }
            Format::Yaml => serde_yaml::to_string(value)
                .map_err(|e| ScaffoldError::unsupported_format(path, &e.to_string())),
            Format::Text => match value {
                Value::String(s) => Ok(s.clone()),
                other => Err(ScaffoldError::unsupported_format(
                    path,
                    &format!("text file cannot hold a structured {} value", kind_name(other)),
                )),
            },
        }
    }
}

/// Name of a JSON value's kind, for messages.
pub fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Storage backend used by a scaffolding run.
#[async_trait]
pub trait FileSystem: Send + Sync {
    async fn exists(&self, path: &Path) -> bool;

    async fn is_dir(&self, path: &Path) -> bool;

    async fn create_dir_all(&self, path: &Path) -> ScaffoldResult<()>;

    async fn read_raw(&self, path: &Path) -> ScaffoldResult<String>;

    /// Write a file, creating missing parent directories.
    async fn write_raw(&self, path: &Path, contents: &str) -> ScaffoldResult<()>;

    /// Immediate subdirectories of `dir`, sorted by path.
    async fn list_subdirs(&self, dir: &Path) -> ScaffoldResult<Vec<PathBuf>>;

    /// Read and parse a file according to its extension.
    async fn read_structured(&self, path: &Path) -> ScaffoldResult<Value> {
        let raw = self.read_raw(path).await?;
        Format::from_path(path).parse(path, &raw)
    }

    /// Serialize a value according to the file's extension and write it.
    async fn write_structured(&self, path: &Path, value: &Value) -> ScaffoldResult<()> {
        let contents = Format::from_path(path).serialize(path, value)?;
        self.write_raw(path, &contents).await
    }
}

/// Write generated content: strings verbatim, anything else structured.
pub async fn write_value(fs: &dyn FileSystem, path: &Path, value: &Value) -> ScaffoldResult<()> {
    match value {
        Value::String(text) => fs.write_raw(path, text).await,
        other => fs.write_structured(path, other).await,
    }
}

/// Disk-backed filesystem using `tokio::fs`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiskFs;

#[async_trait]
impl FileSystem for DiskFs {
    async fn exists(&self, path: &Path) -> bool {
        tokio::fs::try_exists(path).await.unwrap_or(false)
    }

    async fn is_dir(&self, path: &Path) -> bool {
        tokio::fs::metadata(path)
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false)
    }

    async fn create_dir_all(&self, path: &Path) -> ScaffoldResult<()> {
        tokio::fs::create_dir_all(path)
            .await
            .map_err(|e| ScaffoldError::io(path, e))
    }

    async fn read_raw(&self, path: &Path) -> ScaffoldResult<String> {
        match tokio::fs::read_to_string(path).await {
            Ok(content) => Ok(content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(ScaffoldError::not_found(path))
            }
            Err(e) => Err(ScaffoldError::io(path, e)),
        }
    }

    async fn write_raw(&self, path: &Path, contents: &str) -> ScaffoldResult<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            self.create_dir_all(parent).await?;
        }
        tokio::fs::write(path, contents)
            .await
            .map_err(|e| ScaffoldError::io(path, e))
    }

    async fn list_subdirs(&self, dir: &Path) -> ScaffoldResult<Vec<PathBuf>> {
        let mut entries = tokio::fs::read_dir(dir)
            .await
            .map_err(|e| ScaffoldError::io(dir, e))?;
        let mut subdirs = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| ScaffoldError::io(dir, e))?
        {
            let is_dir = entry
                .file_type()
                .await
                .map(|t| t.is_dir())
                .unwrap_or(false);
            if is_dir {
                subdirs.push(entry.path());
            }
        }
        subdirs.sort();
        Ok(subdirs)
    }
}

#[derive(Debug, Default)]
struct MemoryState {
    files: BTreeMap<PathBuf, String>,
    dirs: BTreeSet<PathBuf>,
    writes: HashMap<PathBuf, usize>,
}

impl MemoryState {
    fn add_ancestors(&mut self, path: &Path) {
        for ancestor in path.ancestors().skip(1) {
            if ancestor.as_os_str().is_empty() {
                break;
            }
            self.dirs.insert(ancestor.to_path_buf());
        }
    }
}

/// In-memory filesystem.
///
/// Directories are implied by the files they contain. Every write is counted
/// per path so callers can assert how often a file was written.
#[derive(Debug, Default)]
pub struct MemoryFs {
    state: Mutex<MemoryState>,
}

impl MemoryFs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a file without counting it as a write.
    pub fn with_file(self, path: impl Into<PathBuf>, contents: impl Into<String>) -> Self {
        {
            let mut state = self.lock();
            let path = path.into();
            state.add_ancestors(&path);
            state.files.insert(path, contents.into());
        }
        self
    }

    /// Seed an empty directory.
    pub fn with_dir(self, path: impl Into<PathBuf>) -> Self {
        {
            let mut state = self.lock();
            let path = path.into();
            state.add_ancestors(&path);
            state.dirs.insert(path);
        }
        self
    }

    /// Current contents of a file.
    pub fn contents(&self, path: impl AsRef<Path>) -> Option<String> {
        self.lock().files.get(path.as_ref()).cloned()
    }

    /// Number of writes made to `path` since creation.
    pub fn write_count(&self, path: impl AsRef<Path>) -> usize {
        self.lock().writes.get(path.as_ref()).copied().unwrap_or(0)
    }

    /// Total number of writes across all paths.
    pub fn total_writes(&self) -> usize {
        self.lock().writes.values().sum()
    }

    /// All file paths, sorted.
    pub fn files(&self) -> Vec<PathBuf> {
        self.lock().files.keys().cloned().collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryState> {
        // A poisoned lock only means another test thread panicked mid-write
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl FileSystem for MemoryFs {
    async fn exists(&self, path: &Path) -> bool {
        let state = self.lock();
        state.files.contains_key(path) || state.dirs.contains(path)
    }

    async fn is_dir(&self, path: &Path) -> bool {
        self.lock().dirs.contains(path)
    }

    async fn create_dir_all(&self, path: &Path) -> ScaffoldResult<()> {
        let mut state = self.lock();
        if state.files.contains_key(path) {
            return Err(ScaffoldError::io(path, "a file exists at this path"));
        }
        state.add_ancestors(path);
        state.dirs.insert(path.to_path_buf());
        Ok(())
    }

    async fn read_raw(&self, path: &Path) -> ScaffoldResult<String> {
        self.lock()
            .files
            .get(path)
            .cloned()
            .ok_or_else(|| ScaffoldError::not_found(path))
    }

    async fn write_raw(&self, path: &Path, contents: &str) -> ScaffoldResult<()> {
        let mut state = self.lock();
        if state.dirs.contains(path) {
            return Err(ScaffoldError::io(path, "a directory exists at this path"));
        }
        state.add_ancestors(path);
        state.files.insert(path.to_path_buf(), contents.to_string());
        *state.writes.entry(path.to_path_buf()).or_default() += 1;
        Ok(())
    }

    async fn list_subdirs(&self, dir: &Path) -> ScaffoldResult<Vec<PathBuf>> {
        let state = self.lock();
        if !state.dirs.contains(dir) {
            return Err(ScaffoldError::not_found(dir));
        }
        Ok(state
            .dirs
            .iter()
            .filter(|d| d.parent() == Some(dir))
            .cloned()
            .collect())
    }
}

/// Reads from disk, writes to memory.
///
/// Lets a run resolve conflicts against the real target directory without
/// changing it. Writes made during the run shadow the disk contents.
#[derive(Debug, Default)]
pub struct DryRunFs {
    disk: DiskFs,
    pending: MemoryFs,
}

impl DryRunFs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Writes the run would have made, with their final contents.
    pub fn pending(&self) -> &MemoryFs {
        &self.pending
    }
}

#[async_trait]
impl FileSystem for DryRunFs {
    async fn exists(&self, path: &Path) -> bool {
        self.pending.exists(path).await || self.disk.exists(path).await
    }

    async fn is_dir(&self, path: &Path) -> bool {
        self.pending.is_dir(path).await || self.disk.is_dir(path).await
    }

    async fn create_dir_all(&self, path: &Path) -> ScaffoldResult<()> {
        self.pending.create_dir_all(path).await
    }

    async fn read_raw(&self, path: &Path) -> ScaffoldResult<String> {
        match self.pending.contents(path) {
            Some(contents) => Ok(contents),
            None => self.disk.read_raw(path).await,
        }
    }

    async fn write_raw(&self, path: &Path, contents: &str) -> ScaffoldResult<()> {
        self.pending.write_raw(path, contents).await
    }

    async fn list_subdirs(&self, dir: &Path) -> ScaffoldResult<Vec<PathBuf>> {
        let mut subdirs: BTreeSet<PathBuf> = BTreeSet::new();
        if self.disk.is_dir(dir).await {
            subdirs.extend(self.disk.list_subdirs(dir).await?);
        }
        if self.pending.is_dir(dir).await {
            subdirs.extend(self.pending.list_subdirs(dir).await?);
        }
        Ok(subdirs.into_iter().collect())
    }
}

//! Data-only recipe files.
//!
//! A recipe lists entries in YAML or JSON. Every string in a file's content
//! may use `{{key}}` placeholders, filled from the entry's `input`.
//!
//! ```yaml
//! entries:
//!   - name: eslint
//!     priority: 10
//!     input: { root: true }
//!     dependencies:
//!       - { name: eslint, dev: true }
//!     files:
//!       - filename: .eslintrc.json
//!         content: { root: "{{root}}" }
//!     strategy: merge
//!     manifest:
//!       scripts: { lint: "eslint ." }
//! ```

use crate::conflict::{ConflictFileData, ConflictStrategy, CustomMerge, Merger, Parser, Serializer};
use crate::entry::{ConfigEntry, Dependency, FileArtifact};
use crate::error::{ScaffoldError, ScaffoldResult};
use crate::fs::{FileSystem, Format};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

/// A parsed recipe file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Recipe {
    #[serde(default)]
    pub entries: Vec<EntrySpec>,
}

/// One entry as written in a recipe.
#[derive(Debug, Clone, Deserialize)]
pub struct EntrySpec {
    pub name: String,
    #[serde(default)]
    pub priority: i32,
    #[serde(default)]
    pub input: Value,
    #[serde(default)]
    pub dependencies: Vec<Dependency>,
    #[serde(default)]
    pub files: Vec<FileSpec>,
    /// Conflict strategy name, checked when the entry is built.
    #[serde(default)]
    pub strategy: Option<String>,
    #[serde(default)]
    pub manifest: Value,
}

/// One file as written in a recipe.
#[derive(Debug, Clone, Deserialize)]
pub struct FileSpec {
    pub filename: PathBuf,
    pub content: Value,
    #[serde(default)]
    pub merge: MergeKind,
}

/// Named merge pipelines available to recipes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MergeKind {
    /// Format chosen by extension, deep merge or text concatenation.
    #[default]
    Default,
    /// Read and write YAML whatever the extension.
    Yaml,
    /// Union of lines, existing lines first (ignore files and the like).
    TextLines,
}

impl MergeKind {
    pub fn file_data(self) -> ConflictFileData {
        match self {
            MergeKind::Default => ConflictFileData::Default,
            MergeKind::Yaml => ConflictFileData::Custom(
                CustomMerge::new()
                    .with_parse(Parser::new("yaml", |path, raw| {
                        Ok(Format::Yaml.parse(path, raw)?)
                    }))
                    .with_serialize(Serializer::new("yaml", |path, value| {
                        Ok(Format::Yaml.serialize(path, value)?)
                    })),
            ),
            MergeKind::TextLines => ConflictFileData::Custom(
                CustomMerge::new().with_merge(Merger::new("text-lines", |old, new| {
                    Ok(Value::String(merge_lines(
                        old.as_str().unwrap_or_default(),
                        new.as_str().unwrap_or_default(),
                    )))
                })),
            ),
        }
    }
}

/// Lines of `old` followed by the lines of `new` not already present.
fn merge_lines(old: &str, new: &str) -> String {
    let mut lines: Vec<&str> = old.lines().collect();
    for line in new.lines() {
        if line.trim().is_empty() || !lines.contains(&line) {
            lines.push(line);
        }
    }
    while lines.last().is_some_and(|l| l.trim().is_empty()) {
        lines.pop();
    }
    let mut out = lines.join("\n");
    out.push('\n');
    out
}

impl Recipe {
    /// Parse recipe text. A bare list of entries is accepted as well.
    pub fn parse(path: &Path, raw: &str) -> ScaffoldResult<Self> {
        let value = match Format::from_path(path) {
            Format::Json => Format::Json.parse(path, raw)?,
            Format::Yaml | Format::Text => Format::Yaml.parse(path, raw)?,
        };
        let value = match value {
            Value::Array(entries) => {
                let mut map = Map::new();
                map.insert("entries".into(), Value::Array(entries));
                Value::Object(map)
            }
            other => other,
        };
        serde_json::from_value(value).map_err(|e| ScaffoldError::parse(path, e))
    }

    pub async fn load(fs: &dyn FileSystem, path: &Path) -> ScaffoldResult<Self> {
        let raw = fs.read_raw(path).await?;
        Self::parse(path, &raw)
    }

    /// Turn every entry spec into a [`ConfigEntry`], keeping file order.
    pub fn into_entries(self) -> ScaffoldResult<Vec<ConfigEntry>> {
        self.entries.into_iter().map(EntrySpec::into_entry).collect()
    }
}

impl EntrySpec {
    pub fn into_entry(self) -> ScaffoldResult<ConfigEntry> {
        let strategy = match &self.strategy {
            Some(name) => Some(name.parse::<ConflictStrategy>().map_err(|reason| {
                ScaffoldError::invalid_value(&format!("{}.strategy", self.name), &reason)
            })?),
            None => None,
        };
        let mut builder = ConfigEntry::builder(self.name)
            .priority(self.priority)
            .input(self.input)
            .manifest_patch(self.manifest);
        if let Some(strategy) = strategy {
            builder = builder.conflict_strategy(strategy);
        }
        for dependency in self.dependencies {
            builder = builder.dependency(dependency);
        }
        for file in self.files {
            let template = file.content;
            builder = builder.file(
                FileArtifact::new(file.filename, move |input| render(&template, input))
                    .with_file_data(file.merge.file_data()),
            );
        }
        builder.build()
    }
}

/// Fill `{{key}}` placeholders in every string of `template`.
///
/// A string that is exactly one placeholder takes the input value as is, so
/// `"{{strict}}"` can produce a boolean. Unknown keys are left untouched.
pub fn render(template: &Value, input: &Value) -> Value {
    match template {
        Value::String(s) => render_str(s, input),
        Value::Array(items) => Value::Array(items.iter().map(|v| render(v, input)).collect()),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), render(v, input)))
                .collect(),
        ),
        other => other.clone(),
    }
}

fn render_str(s: &str, input: &Value) -> Value {
    if let Some(key) = whole_placeholder(s)
        && let Some(value) = input.get(key)
    {
        return value.clone();
    }

    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(start) = rest.find("{{") {
        let Some(len) = rest[start + 2..].find("}}") else {
            break;
        };
        let key = rest[start + 2..start + 2 + len].trim();
        out.push_str(&rest[..start]);
        match input.get(key) {
            Some(Value::String(v)) => out.push_str(v),
            Some(v) => out.push_str(&v.to_string()),
            None => out.push_str(&rest[start..start + 2 + len + 2]),
        }
        rest = &rest[start + 2 + len + 2..];
    }
    out.push_str(rest);
    Value::String(out)
}

fn whole_placeholder(s: &str) -> Option<&str> {
    let inner = s.strip_prefix("{{")?.strip_suffix("}}")?;
    if inner.contains("{{") || inner.contains("}}") {
        return None;
    }
    Some(inner.trim())
}

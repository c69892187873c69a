//! Conflict strategies, file kinds and resolution records.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

/// How to handle a file that already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConflictStrategy {
    /// Stop the whole run.
    Abort,
    /// Leave the existing file untouched.
    Skip,
    /// Replace the existing file with the generated content.
    Overwrite,
    /// Merge the existing file with the generated content.
    Merge,
}

impl ConflictStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConflictStrategy::Abort => "abort",
            ConflictStrategy::Skip => "skip",
            ConflictStrategy::Overwrite => "overwrite",
            ConflictStrategy::Merge => "merge",
        }
    }
}

impl fmt::Display for ConflictStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConflictStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "abort" => Ok(ConflictStrategy::Abort),
            "skip" => Ok(ConflictStrategy::Skip),
            "overwrite" => Ok(ConflictStrategy::Overwrite),
            "merge" => Ok(ConflictStrategy::Merge),
            other => Err(format!(
                "unknown conflict strategy '{}' (expected abort, skip, overwrite or merge)",
                other
            )),
        }
    }
}

/// Outcome of a confirmation prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confirmation {
    /// Go ahead and write.
    Proceed,
    /// Leave the file untouched.
    Skip,
    /// Stop the whole run.
    Abort,
}

/// Decision point consulted before an overwrite or merge is written.
///
/// `old` is the existing content and `new` the content about to be written.
#[async_trait]
pub trait Confirm: Send + Sync {
    async fn confirm(&self, path: &Path, old: &Value, new: &Value) -> Confirmation;
}

#[async_trait]
impl<F> Confirm for F
where
    F: Fn(&Path, &Value, &Value) -> Confirmation + Send + Sync,
{
    async fn confirm(&self, path: &Path, old: &Value, new: &Value) -> Confirmation {
        self(path, old, new)
    }
}

/// A function with a name that is reported in resolution records.
pub struct Named<F: ?Sized> {
    name: String,
    func: Arc<F>,
}

impl<F: ?Sized> Named<F> {
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl<F: ?Sized> Clone for Named<F> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            func: Arc::clone(&self.func),
        }
    }
}

impl<F: ?Sized> fmt::Debug for Named<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Named").field(&self.name).finish()
    }
}

pub type ParseFn = dyn Fn(&Path, &str) -> anyhow::Result<Value> + Send + Sync;
pub type MergeFn = dyn Fn(&Value, &Value) -> anyhow::Result<Value> + Send + Sync;
pub type SerializeFn = dyn Fn(&Path, &Value) -> anyhow::Result<String> + Send + Sync;

/// Custom parse step: raw file contents to a value.
pub type Parser = Named<ParseFn>;
/// Custom merge step: (existing, incoming) to merged.
pub type Merger = Named<MergeFn>;
/// Custom serialize step: value to file contents.
pub type Serializer = Named<SerializeFn>;

impl Named<ParseFn> {
    pub fn new<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(&Path, &str) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            func: Arc::new(func),
        }
    }

    pub fn parse(&self, path: &Path, raw: &str) -> anyhow::Result<Value> {
        (self.func)(path, raw)
    }
}

impl Named<MergeFn> {
    pub fn new<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(&Value, &Value) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            func: Arc::new(func),
        }
    }

    pub fn merge(&self, existing: &Value, incoming: &Value) -> anyhow::Result<Value> {
        (self.func)(existing, incoming)
    }
}

impl Named<SerializeFn> {
    pub fn new<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(&Path, &Value) -> anyhow::Result<String> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            func: Arc::new(func),
        }
    }

    pub fn serialize(&self, path: &Path, value: &Value) -> anyhow::Result<String> {
        (self.func)(path, value)
    }
}

/// Overrides for the merge pipeline. Missing steps fall back to the defaults.
#[derive(Debug, Clone, Default)]
pub struct CustomMerge {
    pub parse: Option<Parser>,
    pub merge: Option<Merger>,
    pub serialize: Option<Serializer>,
}

impl CustomMerge {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_parse(mut self, parser: Parser) -> Self {
        self.parse = Some(parser);
        self
    }

    pub fn with_merge(mut self, merger: Merger) -> Self {
        self.merge = Some(merger);
        self
    }

    pub fn with_serialize(mut self, serializer: Serializer) -> Self {
        self.serialize = Some(serializer);
        self
    }
}

/// How an existing file of a given kind is parsed, merged and written back.
#[derive(Debug, Clone, Default)]
pub enum ConflictFileData {
    /// Structured read, deep merge, structured write.
    #[default]
    Default,
    /// Like `Default`, but written with a custom serializer.
    DefaultWithSerializer(Serializer),
    /// Any subset of the three steps overridden.
    Custom(CustomMerge),
}

impl ConflictFileData {
    pub fn parser(&self) -> Option<&Parser> {
        match self {
            ConflictFileData::Custom(custom) => custom.parse.as_ref(),
            ConflictFileData::Default | ConflictFileData::DefaultWithSerializer(_) => None,
        }
    }

    pub fn merger(&self) -> Option<&Merger> {
        match self {
            ConflictFileData::Custom(custom) => custom.merge.as_ref(),
            ConflictFileData::Default | ConflictFileData::DefaultWithSerializer(_) => None,
        }
    }

    pub fn serializer(&self) -> Option<&Serializer> {
        match self {
            ConflictFileData::Default => None,
            ConflictFileData::DefaultWithSerializer(serializer) => Some(serializer),
            ConflictFileData::Custom(custom) => custom.serialize.as_ref(),
        }
    }
}

/// Names of the steps a merge actually used.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MergeSteps {
    pub parse: String,
    pub merge: String,
    pub serialize: String,
}

/// Record of how one conflicting path was resolved.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConflictResolutionResult {
    /// The strategy that was requested and ran.
    pub handled_with: ConflictStrategy,
    /// Confirmation outcome, when a confirmation was asked for.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confirmation: Option<Confirmation>,
    /// Whether the file was written.
    pub written: bool,
    /// Steps used by a merge.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merge: Option<MergeSteps>,
}

impl ConflictResolutionResult {
    pub(crate) fn untouched(strategy: ConflictStrategy) -> Self {
        Self {
            handled_with: strategy,
            confirmation: None,
            written: false,
            merge: None,
        }
    }

    /// Whether this resolution must stop the run.
    pub fn aborts_run(&self) -> bool {
        self.handled_with == ConflictStrategy::Abort
            || self.confirmation == Some(Confirmation::Abort)
    }
}

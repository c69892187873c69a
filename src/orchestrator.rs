//! Sequencing of configuration entries into one scaffolding run.
//!
//! Entries run strictly in the order given. For each entry the orchestrator
//! installs dependencies, folds the manifest patch into a private accumulator,
//! runs the pre-process hook, writes or reconciles every file, then runs the
//! post-process hook. The manifest is written once, after the last entry.
//!
//! Every run ends in exactly one [`RunStatus`]. Failures scoped to a single
//! dependency, file or hook are recorded in the entry's report and the run
//! continues; an invalid target directory, an unusable installer, an abort
//! from conflict resolution, or a failed manifest write end the run.

use crate::config::{deep_merge, deep_merge_into};
use crate::conflict::{
    Confirm, ConflictRequest, ConflictResolutionResult, ConflictStrategy, resolve,
};
use crate::entry::{ConfigEntry, FileArtifact, Hook, HookContext, shared_targets};
use crate::error::{ErrorCode, ScaffoldError, ScaffoldResult};
use crate::fs::{FileSystem, write_value};
use crate::install::{DependencyInstaller, InstallOutcome};
use crate::manifest::{DerivedScripts, ExistingManifest, ManifestOps, derived_fields};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Inputs of one orchestration run.
#[derive(Clone)]
pub struct OrchestratorOptions {
    pub entries: Vec<ConfigEntry>,
    pub target_dir: PathBuf,
    pub fs: Arc<dyn FileSystem>,
    pub installer: Arc<dyn DependencyInstaller>,
    pub manifest: Arc<dyn ManifestOps>,
    /// Strategy for entries that do not declare one.
    pub default_strategy: ConflictStrategy,
    pub confirm: Option<Arc<dyn Confirm>>,
    pub existing_manifest: ExistingManifest,
    pub derived_scripts: DerivedScripts,
}

impl OrchestratorOptions {
    pub fn new(
        target_dir: impl Into<PathBuf>,
        fs: Arc<dyn FileSystem>,
        installer: Arc<dyn DependencyInstaller>,
        manifest: Arc<dyn ManifestOps>,
    ) -> Self {
        Self {
            entries: Vec::new(),
            target_dir: target_dir.into(),
            fs,
            installer,
            manifest,
            default_strategy: ConflictStrategy::Merge,
            confirm: None,
            existing_manifest: ExistingManifest::Merge,
            derived_scripts: DerivedScripts::default(),
        }
    }

    pub fn entries(mut self, entries: Vec<ConfigEntry>) -> Self {
        self.entries = entries;
        self
    }

    pub fn default_strategy(mut self, strategy: ConflictStrategy) -> Self {
        self.default_strategy = strategy;
        self
    }

    pub fn confirm(mut self, confirm: Arc<dyn Confirm>) -> Self {
        self.confirm = Some(confirm);
        self
    }

    pub fn existing_manifest(mut self, policy: ExistingManifest) -> Self {
        self.existing_manifest = policy;
        self
    }

    pub fn derived_scripts(mut self, derived: DerivedScripts) -> Self {
        self.derived_scripts = derived;
        self
    }
}

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunStatus {
    Success,
    Aborted {
        reason: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        path: Option<PathBuf>,
    },
    Error {
        code: ErrorCode,
        message: String,
    },
}

impl RunStatus {
    fn error(err: &ScaffoldError) -> Self {
        RunStatus::Error {
            code: err.code,
            message: err.to_string(),
        }
    }
}

/// Outcome of one dependency.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DependencyReport {
    pub name: String,
    pub dev: bool,
    pub outcome: InstallOutcome,
}

/// Outcome of one declared file.
#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    pub path: PathBuf,
    /// Whether the file already existed.
    pub conflict: bool,
    pub written: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolution: Option<ConflictResolutionResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ScaffoldError>,
}

/// Everything one entry contributed to the run.
#[derive(Debug, Clone, Serialize)]
pub struct EntryReport {
    pub name: String,
    pub dependencies: Vec<DependencyReport>,
    pub files: Vec<FileReport>,
    pub manifest_patch: Value,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub hook_failures: Vec<ScaffoldError>,
}

impl EntryReport {
    fn new(entry: &ConfigEntry) -> Self {
        Self {
            name: entry.name.clone(),
            dependencies: Vec::new(),
            files: Vec::new(),
            manifest_patch: entry.manifest_patch.clone(),
            hook_failures: Vec::new(),
        }
    }
}

/// Result of one orchestration run.
#[derive(Debug, Clone, Serialize)]
pub struct OrchestratorResult {
    #[serde(flatten)]
    pub status: RunStatus,
    pub target_dir: PathBuf,
    pub entries: Vec<EntryReport>,
    /// All patches folded in entry order, plus derived fields once the run
    /// reaches the manifest write.
    pub final_manifest_patch: Value,
    /// The manifest document as written, when the write happened.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manifest: Option<Value>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl OrchestratorResult {
    pub fn is_success(&self) -> bool {
        self.status == RunStatus::Success
    }

    pub fn is_aborted(&self) -> bool {
        matches!(self.status, RunStatus::Aborted { .. })
    }

    /// All file reports across entries, in write order.
    pub fn files(&self) -> impl Iterator<Item = &FileReport> {
        self.entries.iter().flat_map(|e| e.files.iter())
    }

    /// All dependency reports whose install failed.
    pub fn failed_dependencies(&self) -> impl Iterator<Item = &DependencyReport> {
        self.entries
            .iter()
            .flat_map(|e| e.dependencies.iter())
            .filter(|d| d.outcome.is_failed())
    }
}

/// Why an entry stopped the run.
enum Halt {
    Aborted { reason: String, path: Option<PathBuf> },
    Error(ScaffoldError),
}

/// Run every entry against the target directory.
///
/// Never returns an error: run-terminal failures are reported in
/// [`OrchestratorResult::status`].
pub async fn orchestrate(options: OrchestratorOptions) -> OrchestratorResult {
    let started_at = Utc::now();
    let mut run = Run {
        options,
        accumulator: Value::Object(Map::new()),
        reports: Vec::new(),
    };

    let (status, manifest) = match run.execute().await {
        Ok(manifest) => (RunStatus::Success, Some(manifest)),
        Err(Halt::Aborted { reason, path }) => {
            warn!(reason = %reason, "Run aborted");
            (RunStatus::Aborted { reason, path }, None)
        }
        Err(Halt::Error(err)) => {
            warn!(code = ?err.code, error = %err, "Run failed");
            (RunStatus::error(&err), None)
        }
    };

    let finished_at = Utc::now();
    info!(
        status = ?status,
        entries = run.reports.len(),
        elapsed_ms = (finished_at - started_at).num_milliseconds(),
        "Run finished"
    );

    OrchestratorResult {
        status,
        target_dir: run.options.target_dir,
        entries: run.reports,
        final_manifest_patch: run.accumulator,
        manifest,
        started_at,
        finished_at,
    }
}

/// State owned by a single run.
struct Run {
    options: OrchestratorOptions,
    /// The only mutable shared state of a run; never handed out.
    accumulator: Value,
    reports: Vec<EntryReport>,
}

impl Run {
    async fn execute(&mut self) -> Result<Value, Halt> {
        self.check_target().await.map_err(Halt::Error)?;

        for (path, owners) in shared_targets(&self.options.entries) {
            warn!(
                path = %path.display(),
                entries = ?owners,
                "File is declared by more than one entry"
            );
        }

        let entries = std::mem::take(&mut self.options.entries);
        for entry in &entries {
            info!(entry = %entry.name, "Applying entry");
            let mut report = EntryReport::new(entry);
            let outcome = self.apply_entry(entry, &mut report).await;
            self.reports.push(report);
            outcome?;
        }
        self.options.entries = entries;

        self.write_manifest().await.map_err(Halt::Error)
    }

    /// The target must be a directory; a missing one is created.
    async fn check_target(&self) -> ScaffoldResult<()> {
        let fs = self.options.fs.as_ref();
        let target = &self.options.target_dir;
        if fs.exists(target).await {
            if !fs.is_dir(target).await {
                return Err(ScaffoldError::invalid_target(target, "not a directory"));
            }
            return Ok(());
        }
        debug!(target = %target.display(), "Creating target directory");
        fs.create_dir_all(target)
            .await
            .map_err(|e| ScaffoldError::invalid_target(target, &e.to_string()))
    }

    async fn apply_entry(&mut self, entry: &ConfigEntry, report: &mut EntryReport) -> Result<(), Halt> {
        for dependency in &entry.dependencies {
            let outcome = self
                .options
                .installer
                .install(&dependency.name, dependency.options)
                .await
                .map_err(|e| Halt::Error(ScaffoldError::installer(e)))?;
            if let InstallOutcome::Failed(reason) = &outcome {
                warn!(entry = %entry.name, package = %dependency.name, reason = %reason, "Dependency failed");
            }
            report.dependencies.push(DependencyReport {
                name: dependency.name.clone(),
                dev: dependency.options.dev,
                outcome,
            });
        }

        deep_merge_into(&mut self.accumulator, entry.manifest_patch.clone());

        self.run_hook(entry, "pre-process", entry.pre_process.as_ref(), report)
            .await;

        for file in &entry.files {
            let file_report = self.apply_file(entry, file).await;
            let aborts = file_report
                .resolution
                .as_ref()
                .is_some_and(ConflictResolutionResult::aborts_run);
            let path = file_report.path.clone();
            report.files.push(file_report);
            if aborts {
                return Err(Halt::Aborted {
                    reason: format!("conflict on {} aborted the run", path.display()),
                    path: Some(path),
                });
            }
        }

        self.run_hook(entry, "post-process", entry.post_process.as_ref(), report)
            .await;
        Ok(())
    }

    async fn apply_file(&self, entry: &ConfigEntry, file: &FileArtifact) -> FileReport {
        let fs = self.options.fs.as_ref();
        let path = self.options.target_dir.join(&file.filename);
        let content = file.render(&entry.input);

        if !fs.exists(&path).await {
            let result = write_value(fs, &path, &content).await;
            if result.is_ok() {
                info!(entry = %entry.name, path = %path.display(), "Wrote file");
            }
            return FileReport {
                written: result.is_ok(),
                conflict: false,
                resolution: None,
                error: result.err(),
                path,
            };
        }

        let strategy = entry
            .conflict_strategy
            .unwrap_or(self.options.default_strategy);
        let request = ConflictRequest {
            file_path: &path,
            file_data: &file.file_data,
            incoming: &content,
            confirm: self.options.confirm.as_deref(),
        };

        match resolve(fs, strategy, request).await {
            Ok(resolution) => {
                if resolution.written {
                    info!(entry = %entry.name, path = %path.display(), strategy = %strategy, "Resolved conflict");
                } else {
                    warn!(
                        entry = %entry.name,
                        path = %path.display(),
                        strategy = %strategy,
                        confirmation = ?resolution.confirmation,
                        "Existing file left untouched"
                    );
                }
                FileReport {
                    written: resolution.written,
                    conflict: true,
                    resolution: Some(resolution),
                    error: None,
                    path,
                }
            }
            Err(err) => {
                warn!(entry = %entry.name, path = %path.display(), error = %err, "Conflict resolution failed");
                FileReport {
                    written: false,
                    conflict: true,
                    resolution: None,
                    error: Some(err),
                    path,
                }
            }
        }
    }

    async fn run_hook(
        &self,
        entry: &ConfigEntry,
        stage: &str,
        hook: Option<&Hook>,
        report: &mut EntryReport,
    ) {
        let Some(hook) = hook else {
            return;
        };
        debug!(entry = %entry.name, stage = stage, "Running hook");
        let ctx = HookContext {
            entry: entry.name.clone(),
            target_dir: self.options.target_dir.clone(),
            fs: Arc::clone(&self.options.fs),
        };
        if let Err(err) = hook(ctx).await {
            warn!(entry = %entry.name, stage = stage, error = %err, "Hook failed");
            report
                .hook_failures
                .push(ScaffoldError::hook(&entry.name, stage, err));
        }
    }

    /// Fold derived fields into the accumulator and write the manifest once.
    async fn write_manifest(&mut self) -> ScaffoldResult<Value> {
        let manifest = Arc::clone(&self.options.manifest);
        let policy = self.options.existing_manifest;

        let preview = match policy {
            ExistingManifest::Merge => {
                let existing = manifest
                    .read()
                    .await
                    .map_err(|e| ScaffoldError::manifest_write(manifest.path(), e))?
                    .unwrap_or_else(|| Value::Object(Map::new()));
                deep_merge(&existing, &self.accumulator)
            }
            ExistingManifest::Replace => self.accumulator.clone(),
        };
        let derived = derived_fields(&preview, &self.options.derived_scripts);
        deep_merge_into(&mut self.accumulator, derived);

        let written = match policy {
            ExistingManifest::Merge => manifest.merge(&self.accumulator).await,
            ExistingManifest::Replace => manifest.replace(&self.accumulator).await,
        }
        .map_err(|e| manifest_failure(manifest.path(), e))?;

        info!(path = %manifest.path().display(), "Wrote manifest");
        Ok(written)
    }
}

fn manifest_failure(path: &Path, err: ScaffoldError) -> ScaffoldError {
    if err.code == ErrorCode::ManifestWriteFailed {
        err
    } else {
        ScaffoldError::manifest_write(path, err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conflict::Confirmation;
    use crate::entry::Dependency;
    use crate::fs::MemoryFs;
    use crate::install::RecordingInstaller;
    use crate::manifest::JsonManifest;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;

    /// Manifest double that records every write.
    #[derive(Default)]
    struct RecordingManifest {
        path: PathBuf,
        writes: Mutex<Vec<Value>>,
    }

    #[async_trait]
    impl ManifestOps for RecordingManifest {
        fn path(&self) -> &Path {
            &self.path
        }

        async fn read(&self) -> ScaffoldResult<Option<Value>> {
            Ok(None)
        }

        async fn merge(&self, patch: &Value) -> ScaffoldResult<Value> {
            self.writes.lock().unwrap().push(patch.clone());
            Ok(patch.clone())
        }

        async fn replace(&self, document: &Value) -> ScaffoldResult<Value> {
            self.merge(document).await
        }
    }

    fn options(fs: Arc<MemoryFs>, manifest: Arc<dyn ManifestOps>) -> OrchestratorOptions {
        OrchestratorOptions::new("/proj", fs, Arc::new(RecordingInstaller::new()), manifest)
    }

    fn entry(name: &str, patch: Value) -> ConfigEntry {
        ConfigEntry::builder(name).manifest_patch(patch).build().unwrap()
    }

    #[tokio::test]
    async fn test_manifest_written_once_with_folded_patches() {
        let fs = Arc::new(MemoryFs::new().with_dir("/proj"));
        let manifest = Arc::new(RecordingManifest {
            path: PathBuf::from("/proj/package.json"),
            ..Default::default()
        });
        let entries = vec![
            entry("a", json!({"scripts": {"lint": "eslint ."}, "keywords": ["x"]})),
            entry("b", json!({"scripts": {"test": "vitest"}, "keywords": ["x", "y"]})),
            entry("c", json!({"private": true})),
        ];

        let result = orchestrate(options(fs, manifest.clone()).entries(entries)).await;
        assert!(result.is_success());

        let writes = manifest.writes.lock().unwrap();
        assert_eq!(writes.len(), 1);
        assert_eq!(
            writes[0],
            json!({
                "scripts": {"lint": "eslint .", "test": "vitest"},
                "keywords": ["x", "y"],
                "private": true
            })
        );
        assert_eq!(result.final_manifest_patch, writes[0]);
    }

    #[tokio::test]
    async fn test_second_entry_merges_file_written_by_first() {
        let fs = Arc::new(MemoryFs::new().with_dir("/proj"));
        let manifest = Arc::new(JsonManifest::new(fs.clone(), "/proj/package.json"));
        let a = ConfigEntry::builder("a")
            .file(FileArtifact::fixed("x.json", json!({"rules": {"a": 1}})))
            .manifest_patch(json!({"rules": {"a": 1}}))
            .build()
            .unwrap();
        let b = ConfigEntry::builder("b")
            .file(FileArtifact::fixed("x.json", json!({"rules": {"b": 2}})))
            .manifest_patch(json!({"rules": {"b": 2}}))
            .conflict_strategy(ConflictStrategy::Merge)
            .build()
            .unwrap();

        let result = orchestrate(
            options(fs.clone(), manifest)
                .default_strategy(ConflictStrategy::Skip)
                .entries(vec![a, b]),
        )
        .await;
        assert!(result.is_success());

        let first = &result.entries[0].files[0];
        assert!(!first.conflict);
        assert!(first.written);

        let second = &result.entries[1].files[0];
        assert!(second.conflict);
        let resolution = second.resolution.as_ref().unwrap();
        assert_eq!(resolution.handled_with, ConflictStrategy::Merge);
        assert!(resolution.written);

        let x: Value = serde_json::from_str(&fs.contents("/proj/x.json").unwrap()).unwrap();
        assert_eq!(x, json!({"rules": {"a": 1, "b": 2}}));
        assert_eq!(result.final_manifest_patch, json!({"rules": {"a": 1, "b": 2}}));
        assert_eq!(fs.write_count("/proj/package.json"), 1);
    }

    #[tokio::test]
    async fn test_abort_strategy_ends_run_without_manifest_write() {
        let fs = Arc::new(MemoryFs::new().with_file("/proj/x.json", "{}"));
        let manifest = Arc::new(RecordingManifest::default());
        let a = ConfigEntry::builder("a")
            .file(FileArtifact::fixed("x.json", json!({"a": 1})))
            .build()
            .unwrap();
        let b = entry("b", json!({"never": true}));

        let result = orchestrate(
            options(fs.clone(), manifest.clone())
                .default_strategy(ConflictStrategy::Abort)
                .entries(vec![a, b]),
        )
        .await;
        assert!(result.is_aborted());
        assert_eq!(result.entries.len(), 1);
        assert!(manifest.writes.lock().unwrap().is_empty());
        assert_eq!(fs.total_writes(), 0);
        match result.status {
            RunStatus::Aborted { path, .. } => assert_eq!(path, Some(PathBuf::from("/proj/x.json"))),
            other => panic!("unexpected status {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_confirm_abort_ends_run_and_skip_continues() {
        let fs = Arc::new(
            MemoryFs::new()
                .with_file("/proj/keep.json", r#"{"k": 1}"#)
                .with_file("/proj/stop.json", "{}"),
        );
        let manifest = Arc::new(RecordingManifest::default());
        let entry = ConfigEntry::builder("a")
            .file(FileArtifact::fixed("keep.json", json!({"k": 2})))
            .file(FileArtifact::fixed("stop.json", json!({"s": 1})))
            .build()
            .unwrap();
        let confirm = |path: &Path, _: &Value, _: &Value| {
            if path.ends_with("stop.json") {
                Confirmation::Abort
            } else {
                Confirmation::Skip
            }
        };

        let result = orchestrate(
            options(fs.clone(), manifest)
                .default_strategy(ConflictStrategy::Overwrite)
                .confirm(Arc::new(confirm))
                .entries(vec![entry]),
        )
        .await;
        assert!(result.is_aborted());
        let files = &result.entries[0].files;
        assert_eq!(files.len(), 2);
        assert_eq!(
            files[0].resolution.as_ref().unwrap().confirmation,
            Some(Confirmation::Skip)
        );
        assert_eq!(fs.total_writes(), 0);
    }

    #[tokio::test]
    async fn test_failed_dependency_does_not_stop_run() {
        let fs = Arc::new(MemoryFs::new().with_dir("/proj"));
        let manifest = Arc::new(RecordingManifest::default());
        let installer = Arc::new(RecordingInstaller::new().with_failing("husky"));
        let entry = ConfigEntry::builder("commits")
            .dependency(Dependency::dev("husky"))
            .dependency(Dependency::dev("@commitlint/cli"))
            .file(FileArtifact::fixed(".commitlintrc.json", json!({"extends": ["@commitlint/config-conventional"]})))
            .build()
            .unwrap();

        let mut opts = options(fs.clone(), manifest.clone()).entries(vec![entry]);
        opts.installer = installer.clone();
        let result = orchestrate(opts).await;

        assert!(result.is_success());
        assert_eq!(result.failed_dependencies().count(), 1);
        assert_eq!(installer.calls().len(), 2);
        assert!(fs.contents("/proj/.commitlintrc.json").is_some());
        assert_eq!(manifest.writes.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unusable_installer_is_run_error() {
        let fs = Arc::new(MemoryFs::new().with_dir("/proj"));
        let manifest = Arc::new(RecordingManifest::default());
        let entry = ConfigEntry::builder("lint")
            .dependency(Dependency::dev("eslint"))
            .build()
            .unwrap();

        let mut opts = options(fs, manifest.clone()).entries(vec![entry]);
        opts.installer = Arc::new(RecordingInstaller::new().unavailable());
        let result = orchestrate(opts).await;

        match &result.status {
            RunStatus::Error { code, .. } => assert_eq!(*code, ErrorCode::InstallerUnavailable),
            other => panic!("unexpected status {:?}", other),
        }
        assert!(manifest.writes.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_target_that_is_a_file_is_run_error() {
        let fs = Arc::new(MemoryFs::new().with_file("/proj", "not a dir"));
        let manifest = Arc::new(RecordingManifest::default());
        let result = orchestrate(options(fs, manifest).entries(vec![entry("a", json!({}))])).await;
        match &result.status {
            RunStatus::Error { code, .. } => assert_eq!(*code, ErrorCode::InvalidTarget),
            other => panic!("unexpected status {:?}", other),
        }
        assert!(result.entries.is_empty());
    }

    #[tokio::test]
    async fn test_missing_target_is_created() {
        let fs = Arc::new(MemoryFs::new());
        let manifest = Arc::new(JsonManifest::new(fs.clone(), "/proj/package.json"));
        let result = orchestrate(options(fs.clone(), manifest)).await;
        assert!(result.is_success());
        assert!(fs.is_dir(Path::new("/proj")).await);
    }

    #[tokio::test]
    async fn test_malformed_existing_file_is_recorded_and_run_continues() {
        let fs = Arc::new(MemoryFs::new().with_file("/proj/a.json", "{ nope"));
        let manifest = Arc::new(RecordingManifest::default());
        let entry = ConfigEntry::builder("a")
            .file(FileArtifact::fixed("a.json", json!({"x": 1})))
            .file(FileArtifact::fixed("b.json", json!({"y": 1})))
            .build()
            .unwrap();

        let result = orchestrate(options(fs.clone(), manifest).entries(vec![entry])).await;
        assert!(result.is_success());
        let files = &result.entries[0].files;
        assert_eq!(
            files[0].error.as_ref().map(|e| e.code),
            Some(ErrorCode::ParseError)
        );
        assert!(files[1].written);
        assert_eq!(fs.contents("/proj/a.json").as_deref(), Some("{ nope"));
    }

    #[tokio::test]
    async fn test_hooks_run_around_files_and_failures_are_recorded() {
        let fs = Arc::new(MemoryFs::new().with_dir("/proj"));
        let manifest = Arc::new(RecordingManifest::default());
        let entry = ConfigEntry::builder("husky")
            .pre_process(|ctx: HookContext| async move {
                // The entry's file must not exist yet
                assert!(!ctx.fs.exists(&ctx.target_dir.join(".lintstagedrc.json")).await);
                Err::<(), _>(anyhow::anyhow!("git is not initialised"))
            })
            .post_process(|ctx: HookContext| async move {
                assert!(ctx.fs.exists(&ctx.target_dir.join(".lintstagedrc.json")).await);
                ctx.fs
                    .write_raw(&ctx.target_dir.join(".husky/pre-commit"), "npx lint-staged\n")
                    .await?;
                Ok::<(), anyhow::Error>(())
            })
            .file(FileArtifact::fixed(".lintstagedrc.json", json!({"*.ts": "eslint"})))
            .build()
            .unwrap();

        let result = orchestrate(options(fs.clone(), manifest).entries(vec![entry])).await;
        assert!(result.is_success());
        let failures = &result.entries[0].hook_failures;
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].code, ErrorCode::HookFailed);
        assert!(fs.contents("/proj/.husky/pre-commit").is_some());
    }

    #[tokio::test]
    async fn test_derived_scripts_and_existing_manifest() {
        let fs = Arc::new(MemoryFs::new().with_file(
            "/proj/package.json",
            r#"{"name": "app", "scripts": {"test": "vitest"}}"#,
        ));
        let manifest = Arc::new(JsonManifest::new(fs.clone(), "/proj/package.json"));
        let entries = vec![entry(
            "lint",
            json!({"scripts": {"lint": "eslint .", "update:deps": "ncu -u"}}),
        )];

        let result = orchestrate(
            options(fs.clone(), manifest)
                .derived_scripts(DerivedScripts {
                    check: vec!["lint".into(), "typecheck".into(), "test".into()],
                    update_prefix: "update:".into(),
                })
                .entries(entries),
        )
        .await;
        assert!(result.is_success());
        let written = result.manifest.unwrap();
        assert_eq!(written["name"], "app");
        assert_eq!(written["scripts"]["check"], "npm run lint && npm run test");
        assert_eq!(written["scripts"]["update"], "npm run update:deps");
        assert_eq!(fs.write_count("/proj/package.json"), 1);
    }

    #[tokio::test]
    async fn test_replace_policy_drops_existing_manifest_fields() {
        let fs = Arc::new(MemoryFs::new().with_file("/proj/package.json", r#"{"name": "old"}"#));
        let manifest = Arc::new(JsonManifest::new(fs.clone(), "/proj/package.json"));
        let result = orchestrate(
            options(fs.clone(), manifest)
                .existing_manifest(ExistingManifest::Replace)
                .entries(vec![entry("a", json!({"private": true}))]),
        )
        .await;
        assert!(result.is_success());
        assert_eq!(result.manifest, Some(json!({"private": true})));
    }

    #[tokio::test]
    async fn test_manifest_write_failure_is_run_error() {
        let fs = Arc::new(MemoryFs::new().with_file("/proj/package.json", "{ nope"));
        let manifest = Arc::new(JsonManifest::new(fs.clone(), "/proj/package.json"));
        let result = orchestrate(options(fs, manifest).entries(vec![entry("a", json!({"a": 1}))])).await;
        match &result.status {
            RunStatus::Error { code, .. } => assert_eq!(*code, ErrorCode::ManifestWriteFailed),
            other => panic!("unexpected status {:?}", other),
        }
        assert_eq!(result.final_manifest_patch, json!({"a": 1}));
    }
}

//! Integration tests for orchestration runs against a real directory.
//!
//! Covers the run-level guarantees:
//! - the manifest is written once, after every entry
//! - a second entry targeting the same file goes through conflict resolution
//! - abort stops the run and leaves the target untouched

use scaffold_kit::conflict::{
    ConflictFileData, ConflictStrategy, CustomMerge, Merger, Serializer,
};
use scaffold_kit::entry::{ConfigEntry, Dependency, FileArtifact};
use scaffold_kit::fs::{DiskFs, FileSystem};
use scaffold_kit::install::{InstallOutcome, RecordingInstaller};
use scaffold_kit::manifest::{DerivedScripts, JsonManifest};
use scaffold_kit::orchestrator::{OrchestratorOptions, RunStatus, orchestrate};
use serde_json::{Value, json};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

/// Options for a run in `dir` with disk storage and a recording installer.
fn disk_options(dir: &Path, installer: Arc<RecordingInstaller>) -> OrchestratorOptions {
    let fs: Arc<dyn FileSystem> = Arc::new(DiskFs);
    let manifest = Arc::new(JsonManifest::new(fs.clone(), dir.join("package.json")));
    OrchestratorOptions::new(dir, fs, installer, manifest)
}

fn read_json(path: &Path) -> Value {
    serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
}

#[tokio::test]
async fn test_two_entries_same_file_end_to_end() {
    let temp = TempDir::new().unwrap();
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

    let installer = Arc::new(RecordingInstaller::new());
    let result = orchestrate(disk_options(temp.path(), installer).entries(vec![a, b])).await;

    assert_eq!(result.status, RunStatus::Success);
    assert!(!result.entries[0].files[0].conflict);
    assert!(result.entries[1].files[0].conflict);
    assert_eq!(
        read_json(&temp.path().join("x.json")),
        json!({"rules": {"a": 1, "b": 2}})
    );
    assert_eq!(
        result.final_manifest_patch,
        json!({"rules": {"a": 1, "b": 2}})
    );
    assert_eq!(
        read_json(&temp.path().join("package.json")),
        json!({"rules": {"a": 1, "b": 2}})
    );
}

#[tokio::test]
async fn test_existing_project_is_reconciled() {
    let temp = TempDir::new().unwrap();
    fs::write(
        temp.path().join("package.json"),
        r#"{"name": "web", "scripts": {"test": "vitest", "dev": "vite"}}"#,
    )
    .unwrap();
    fs::write(temp.path().join(".gitignore"), "node_modules\n").unwrap();
    fs::write(
        temp.path().join("tsconfig.json"),
        r#"{"compilerOptions": {"strict": false, "lib": ["dom"]}}"#,
    )
    .unwrap();

    let lines = ConflictFileData::Custom(CustomMerge::new().with_merge(Merger::new(
        "append-missing-lines",
        |old, new| {
            let old = old.as_str().unwrap_or_default();
            let mut out = old.to_string();
            for line in new.as_str().unwrap_or_default().lines() {
                if !old.lines().any(|l| l == line) {
                    out.push_str(line);
                    out.push('\n');
                }
            }
            Ok(Value::String(out))
        },
    )));

    let git = ConfigEntry::builder("git")
        .file(FileArtifact::fixed(".gitignore", json!("node_modules\ndist\n")).with_file_data(lines))
        .build()
        .unwrap();
    let ts = ConfigEntry::builder("typescript")
        .input(json!({"strict": true}))
        .dependency(Dependency::dev("typescript"))
        .file(FileArtifact::new("tsconfig.json", |input| {
            json!({"compilerOptions": {"strict": input["strict"], "lib": ["dom", "esnext"]}})
        }))
        .manifest_patch(json!({"scripts": {"typecheck": "tsc --noEmit"}}))
        .build()
        .unwrap();
    let lint = ConfigEntry::builder("lint")
        .dependency(Dependency::dev("eslint"))
        .manifest_patch(json!({"scripts": {"lint": "eslint ."}}))
        .build()
        .unwrap();

    let installer = Arc::new(RecordingInstaller::new().with_present("typescript"));
    let result = orchestrate(
        disk_options(temp.path(), installer.clone())
            .derived_scripts(DerivedScripts {
                check: vec!["lint".into(), "typecheck".into(), "test".into()],
                update_prefix: "update:".into(),
            })
            .entries(vec![git, ts, lint]),
    )
    .await;

    assert!(result.is_success());
    assert_eq!(
        fs::read_to_string(temp.path().join(".gitignore")).unwrap(),
        "node_modules\ndist\n"
    );
    assert_eq!(
        read_json(&temp.path().join("tsconfig.json")),
        json!({"compilerOptions": {"strict": true, "lib": ["dom", "esnext"]}})
    );

    let manifest = read_json(&temp.path().join("package.json"));
    assert_eq!(manifest["name"], "web");
    assert_eq!(manifest["scripts"]["dev"], "vite");
    assert_eq!(
        manifest["scripts"]["check"],
        "npm run lint && npm run typecheck && npm run test"
    );
    assert!(manifest["scripts"].get("update").is_none());

    let outcomes: Vec<&InstallOutcome> = result
        .entries
        .iter()
        .flat_map(|e| e.dependencies.iter().map(|d| &d.outcome))
        .collect();
    assert_eq!(
        outcomes,
        vec![&InstallOutcome::AlreadyPresent, &InstallOutcome::Installed]
    );
    assert_eq!(installer.calls().len(), 2);
}

#[tokio::test]
async fn test_abort_leaves_target_untouched() {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("a.json"), r#"{"keep": true}"#).unwrap();

    let entry = ConfigEntry::builder("a")
        .file(FileArtifact::fixed("fresh.json", json!({"new": true})))
        .file(FileArtifact::fixed("a.json", json!({"keep": false})))
        .build()
        .unwrap();
    let later = ConfigEntry::builder("later")
        .file(FileArtifact::fixed("later.json", json!({})))
        .build()
        .unwrap();

    let installer = Arc::new(RecordingInstaller::new());
    let result = orchestrate(
        disk_options(temp.path(), installer)
            .default_strategy(ConflictStrategy::Abort)
            .entries(vec![entry, later]),
    )
    .await;

    assert!(result.is_aborted());
    // Files before the abort stay written; nothing after it runs
    assert!(temp.path().join("fresh.json").exists());
    assert!(!temp.path().join("later.json").exists());
    assert!(!temp.path().join("package.json").exists());
    assert_eq!(read_json(&temp.path().join("a.json")), json!({"keep": true}));
}

#[tokio::test]
async fn test_custom_serializer_round_trip_on_disk() {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join(".prettierrc.json"), "{\"semi\":false}").unwrap();

    let compact = ConflictFileData::DefaultWithSerializer(Serializer::new(
        "compact-json",
        |_, value| Ok(serde_json::to_string(value)?),
    ));
    let entry = ConfigEntry::builder("prettier")
        .file(
            FileArtifact::fixed(".prettierrc.json", json!({"singleQuote": true}))
                .with_file_data(compact),
        )
        .build()
        .unwrap();

    let result = orchestrate(
        disk_options(temp.path(), Arc::new(RecordingInstaller::new())).entries(vec![entry]),
    )
    .await;

    assert!(result.is_success());
    let steps = result.entries[0].files[0]
        .resolution
        .as_ref()
        .and_then(|r| r.merge.clone())
        .unwrap();
    assert_eq!(steps.parse, "json");
    assert_eq!(steps.serialize, "compact-json");
    assert_eq!(
        fs::read_to_string(temp.path().join(".prettierrc.json")).unwrap(),
        r#"{"semi":false,"singleQuote":true}"#
    );
}

#[tokio::test]
async fn test_missing_target_directory_is_created() {
    let temp = TempDir::new().unwrap();
    let target = temp.path().join("new-app");

    let entry = ConfigEntry::builder("a")
        .file(FileArtifact::fixed("src/index.ts", json!("export {};\n")))
        .manifest_patch(json!({"name": "new-app"}))
        .build()
        .unwrap();
    let result = orchestrate(
        disk_options(&target, Arc::new(RecordingInstaller::new())).entries(vec![entry]),
    )
    .await;

    assert!(result.is_success());
    assert_eq!(
        fs::read_to_string(target.join("src/index.ts")).unwrap(),
        "export {};\n"
    );
    assert_eq!(read_json(&target.join("package.json")), json!({"name": "new-app"}));
}

#[tokio::test]
async fn test_target_is_a_file_is_reported_not_raised() {
    let temp = TempDir::new().unwrap();
    let target = temp.path().join("file.txt");
    fs::write(&target, "x").unwrap();

    let result = orchestrate(disk_options(&target, Arc::new(RecordingInstaller::new()))).await;
    match result.status {
        RunStatus::Error { message, .. } => assert!(message.contains("not a directory")),
        other => panic!("unexpected status {:?}", other),
    }
}

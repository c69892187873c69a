//! Integration tests for recipe files applied through the orchestrator.
//!
//! Tests cover:
//! - YAML recipes with placeholders, priorities and per-entry strategies
//! - Line-union merging of ignore files
//! - Dry runs that read the real tree but write nothing to disk

use scaffold_kit::conflict::ConflictStrategy;
use scaffold_kit::entry::sort_by_priority;
use scaffold_kit::fs::{DiskFs, DryRunFs, FileSystem};
use scaffold_kit::install::RecordingInstaller;
use scaffold_kit::manifest::JsonManifest;
use scaffold_kit::orchestrator::{OrchestratorOptions, OrchestratorResult, orchestrate};
use scaffold_kit::recipe::Recipe;
use serde_json::{Value, json};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

const RECIPE: &str = r#"
entries:
  - name: prettier
    priority: 20
    files:
      - filename: .prettierrc.json
        content: { singleQuote: true }
    manifest:
      scripts: { format: "prettier --write ." }
  - name: typescript
    priority: 10
    input: { strict: true, outDir: dist }
    dependencies:
      - { name: typescript, dev: true }
    files:
      - filename: tsconfig.json
        content:
          compilerOptions:
            strict: "{{strict}}"
            outDir: "./{{outDir}}"
      - filename: .gitignore
        content: "{{outDir}}\n"
        merge: text-lines
    manifest:
      scripts: { typecheck: "tsc --noEmit" }
  - name: lint
    priority: 10
    strategy: skip
    dependencies:
      - { name: eslint, dev: true }
    files:
      - filename: .eslintrc.json
        content: { root: true }
    manifest:
      scripts: { lint: "eslint ." }
"#;

/// Load the recipe from `dir`, sort it and apply it with `fs`.
async fn apply(dir: &Path, fs: Arc<dyn FileSystem>) -> OrchestratorResult {
    let recipe_path = dir.join("recipe.yaml");
    let recipe = Recipe::load(fs.as_ref(), &recipe_path).await.unwrap();
    let mut entries = recipe.into_entries().unwrap();
    sort_by_priority(&mut entries);

    let manifest = Arc::new(JsonManifest::new(fs.clone(), dir.join("package.json")));
    let options = OrchestratorOptions::new(
        dir,
        fs,
        Arc::new(RecordingInstaller::new()),
        manifest,
    )
    .entries(entries)
    .default_strategy(ConflictStrategy::Merge);
    orchestrate(options).await
}

fn existing_project() -> TempDir {
    let temp = TempDir::new().unwrap();
    let dir = temp.path();
    fs::write(dir.join("recipe.yaml"), RECIPE).unwrap();
    fs::write(dir.join("package.json"), r#"{"name": "app"}"#).unwrap();
    fs::write(dir.join(".gitignore"), "node_modules\n").unwrap();
    fs::write(dir.join(".eslintrc.json"), r#"{"root": false}"#).unwrap();
    temp
}

fn read_json(path: &Path) -> Value {
    serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
}

#[tokio::test]
async fn test_recipe_applied_to_disk() {
    let temp = existing_project();
    let dir = temp.path();

    let result = apply(dir, Arc::new(DiskFs)).await;
    assert!(result.is_success(), "{:?}", result.status);

    let order: Vec<&str> = result.entries.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(order, vec!["typescript", "lint", "prettier"]);

    assert_eq!(
        read_json(&dir.join("tsconfig.json")),
        json!({"compilerOptions": {"strict": true, "outDir": "./dist"}})
    );
    assert_eq!(
        fs::read_to_string(dir.join(".gitignore")).unwrap(),
        "node_modules\ndist\n"
    );
    // lint declares skip, so the existing file survives
    assert_eq!(read_json(&dir.join(".eslintrc.json")), json!({"root": false}));
    assert_eq!(read_json(&dir.join(".prettierrc.json")), json!({"singleQuote": true}));

    let manifest = read_json(&dir.join("package.json"));
    assert_eq!(manifest["name"], "app");
    assert_eq!(manifest["scripts"]["typecheck"], "tsc --noEmit");
    assert_eq!(manifest["scripts"]["lint"], "eslint .");
    assert_eq!(manifest["scripts"]["format"], "prettier --write .");
}

#[tokio::test]
async fn test_recipe_applied_twice_is_stable() {
    let temp = existing_project();
    let dir = temp.path();

    assert!(apply(dir, Arc::new(DiskFs)).await.is_success());
    let gitignore = fs::read_to_string(dir.join(".gitignore")).unwrap();
    let tsconfig = read_json(&dir.join("tsconfig.json"));
    let manifest = read_json(&dir.join("package.json"));

    assert!(apply(dir, Arc::new(DiskFs)).await.is_success());
    assert_eq!(fs::read_to_string(dir.join(".gitignore")).unwrap(), gitignore);
    assert_eq!(read_json(&dir.join("tsconfig.json")), tsconfig);
    assert_eq!(read_json(&dir.join("package.json")), manifest);
}

#[tokio::test]
async fn test_dry_run_writes_nothing() {
    let temp = existing_project();
    let dir = temp.path();
    let dry = Arc::new(DryRunFs::new());

    let result = apply(dir, dry.clone()).await;
    assert!(result.is_success());

    // Disk is untouched
    assert!(!dir.join("tsconfig.json").exists());
    assert_eq!(
        fs::read_to_string(dir.join(".gitignore")).unwrap(),
        "node_modules\n"
    );
    assert_eq!(read_json(&dir.join("package.json")), json!({"name": "app"}));

    // The overlay holds what would have been written
    let pending = dry.pending();
    assert_eq!(
        pending.contents(dir.join(".gitignore")).as_deref(),
        Some("node_modules\ndist\n")
    );
    assert!(pending.contents(dir.join("tsconfig.json")).is_some());
    assert_eq!(pending.write_count(dir.join("package.json")), 1);
    assert!(pending.contents(dir.join(".eslintrc.json")).is_none());
}

#[test]
fn test_recipe_rejects_duplicate_filenames() {
    let raw = r#"
- name: twice
  files:
    - { filename: a.json, content: {} }
    - { filename: a.json, content: {} }
"#;
    let recipe = Recipe::parse(Path::new("r.yaml"), raw).unwrap();
    assert!(recipe.into_entries().is_err());
}

#[test]
fn test_json_recipe() {
    let raw = r#"{"entries": [{"name": "a", "files": [{"filename": "a.txt", "content": "hi {{who}}"}], "input": {"who": "there"}}]}"#;
    let entries = Recipe::parse(Path::new("r.json"), raw)
        .unwrap()
        .into_entries()
        .unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].files[0].render(&entries[0].input), json!("hi there"));
}

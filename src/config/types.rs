//! Configuration types and structures.
//!
//! This module contains the tool configuration consumed by the CLI when it
//! assembles an orchestration run.

use crate::conflict::ConflictStrategy;
use crate::manifest::{DerivedScripts, ExistingManifest};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default manifest file name relative to the target directory.
pub const DEFAULT_MANIFEST: &str = "package.json";

/// Top-level tool configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub conflicts: ConflictsConfig,

    #[serde(default)]
    pub manifest: ManifestConfig,

    #[serde(default)]
    pub install: InstallConfig,
}

impl Config {
    /// Load a single configuration file (YAML or JSON) without tier merging.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        Ok(config)
    }
}

/// How existing files are reconciled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConflictsConfig {
    /// Strategy used when an entry does not declare its own.
    #[serde(default = "default_strategy")]
    pub default_strategy: ConflictStrategy,

    /// Whether overwrite/merge must be confirmed before writing.
    #[serde(default)]
    pub confirm: bool,
}

impl Default for ConflictsConfig {
    fn default() -> Self {
        Self {
            default_strategy: default_strategy(),
            confirm: false,
        }
    }
}

fn default_strategy() -> ConflictStrategy {
    ConflictStrategy::Merge
}

/// Manifest location and derived-field settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestConfig {
    /// Manifest path relative to the target directory.
    #[serde(default = "default_manifest_filename")]
    pub filename: PathBuf,

    /// What to do with a manifest that already exists.
    #[serde(default)]
    pub on_existing: ExistingManifest,

    /// Scripts chained into the composite `check` script, in order.
    #[serde(default = "default_check_scripts")]
    pub check_scripts: Vec<String>,

    /// Prefix of scripts chained into the composite `update` script.
    #[serde(default = "default_update_prefix")]
    pub update_prefix: String,
}

impl Default for ManifestConfig {
    fn default() -> Self {
        Self {
            filename: default_manifest_filename(),
            on_existing: ExistingManifest::default(),
            check_scripts: default_check_scripts(),
            update_prefix: default_update_prefix(),
        }
    }
}

impl ManifestConfig {
    /// Derived-script settings for the orchestrator.
    pub fn derived_scripts(&self) -> DerivedScripts {
        DerivedScripts {
            check: self.check_scripts.clone(),
            update_prefix: self.update_prefix.clone(),
        }
    }
}

fn default_manifest_filename() -> PathBuf {
    PathBuf::from(DEFAULT_MANIFEST)
}

fn default_check_scripts() -> Vec<String> {
    vec!["lint".into(), "typecheck".into(), "test".into()]
}

fn default_update_prefix() -> String {
    "update:".into()
}

/// Dependency installer command settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstallConfig {
    /// Set to false to record dependencies without installing them.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Package manager executable.
    #[serde(default = "default_install_command")]
    pub command: String,

    /// Arguments placed before the package name.
    #[serde(default = "default_install_args")]
    pub args: Vec<String>,

    /// Flag appended for development-only dependencies.
    #[serde(default = "default_dev_flag")]
    pub dev_flag: String,
}

impl Default for InstallConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            command: default_install_command(),
            args: default_install_args(),
            dev_flag: default_dev_flag(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_install_command() -> String {
    "npm".into()
}

fn default_install_args() -> Vec<String> {
    vec!["install".into()]
}

fn default_dev_flag() -> String {
    "--save-dev".into()
}

//! Configuration loader with tier-based merging.
//!
//! Loads configuration from multiple tiers and merges them field-by-field.

use super::merge::deep_merge_all;
use super::types::Config;
use crate::conflict::ConflictStrategy;
use anyhow::{Context, Result};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Name of the per-project and per-user configuration directory.
pub const CONFIG_DIR_NAME: &str = ".scaffold-kit";

/// Name of the configuration file inside each tier directory.
pub const CONFIG_FILE_NAME: &str = "config.yaml";

/// Tier a config source came from (lowest to highest priority).
///
/// Built-in defaults are not a tier: serde fills them in for every field no
/// source sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ConfigTier {
    /// Project-level config (<target>/.scaffold-kit/)
    Project = 1,
    /// User-level config (~/.scaffold-kit/)
    User = 2,
    /// Explicit file from SCAFFOLD_KIT_CONFIG_PATH (highest priority)
    Environment = 3,
}

impl std::fmt::Display for ConfigTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigTier::Project => write!(f, "project"),
            ConfigTier::User => write!(f, "user"),
            ConfigTier::Environment => write!(f, "environment"),
        }
    }
}

/// Paths for each configuration tier.
#[derive(Debug, Clone)]
pub struct ConfigPaths {
    /// Project-level config directory
    pub project_dir: Option<PathBuf>,
    /// User-level config directory
    pub user_dir: Option<PathBuf>,
}

impl ConfigPaths {
    /// Discover configuration paths for a target directory.
    pub fn discover(target_dir: &Path) -> Self {
        // User dir: SCAFFOLD_KIT_USER_DIR or ~/.scaffold-kit
        let user_dir = std::env::var("SCAFFOLD_KIT_USER_DIR")
            .ok()
            .map(PathBuf::from)
            .or_else(|| dirs::home_dir().map(|h| h.join(CONFIG_DIR_NAME)));

        Self {
            project_dir: Some(target_dir.join(CONFIG_DIR_NAME)),
            user_dir,
        }
    }

    /// Create paths with explicit directories.
    pub fn with_dirs(project_dir: Option<PathBuf>, user_dir: Option<PathBuf>) -> Self {
        Self {
            project_dir,
            user_dir,
        }
    }
}

/// Configuration loader that handles tier-based merging.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    /// Paths for each tier
    pub paths: ConfigPaths,
    /// Loaded configuration
    config: Config,
    /// Config files that contributed, lowest tier first
    sources: Vec<(ConfigTier, PathBuf)>,
}

impl ConfigLoader {
    /// Load configuration for a target directory from all tiers.
    pub fn load(target_dir: &Path) -> Result<Self> {
        Self::load_with_paths(ConfigPaths::discover(target_dir))
    }

    /// Load configuration with explicit paths.
    pub fn load_with_paths(paths: ConfigPaths) -> Result<Self> {
        // Check for explicit config path override
        if let Ok(explicit_path) = std::env::var("SCAFFOLD_KIT_CONFIG_PATH") {
            let path = PathBuf::from(&explicit_path);
            let mut config = Config::load(&path)?;
            Self::apply_env_overrides(&mut config)?;
            return Ok(Self {
                paths,
                config,
                sources: vec![(ConfigTier::Environment, path)],
            });
        }

        let mut configs: Vec<Value> = Vec::new();
        let mut sources = Vec::new();

        // Serde fills defaults for every field no file sets, so lists in a
        // file replace the built-in list instead of extending it.

        // Project config
        if let Some(ref project_dir) = paths.project_dir
            && let Some((value, file)) = read_tier_file(project_dir)
        {
            configs.push(value);
            sources.push((ConfigTier::Project, file));
        }

        // User config
        if let Some(ref user_dir) = paths.user_dir
            && let Some((value, file)) = read_tier_file(user_dir)
        {
            configs.push(value);
            sources.push((ConfigTier::User, file));
        }

        let merged = match deep_merge_all(configs) {
            Value::Null => Value::Object(Default::default()),
            merged => merged,
        };
        let mut config: Config =
            serde_json::from_value(merged).context("Invalid merged configuration")?;

        // Environment variable overrides
        Self::apply_env_overrides(&mut config)?;

        for (tier, file) in &sources {
            debug!(tier = %tier, path = %file.display(), "Loaded config tier");
        }

        Ok(Self {
            paths,
            config,
            sources,
        })
    }

    /// Apply environment variable overrides to config.
    fn apply_env_overrides(config: &mut Config) -> Result<()> {
        if let Ok(strategy) = std::env::var("SCAFFOLD_KIT_STRATEGY") {
            config.conflicts.default_strategy = strategy
                .parse::<ConflictStrategy>()
                .map_err(|e| anyhow::anyhow!("Invalid SCAFFOLD_KIT_STRATEGY: {}", e))?;
        }

        if let Ok(manifest) = std::env::var("SCAFFOLD_KIT_MANIFEST") {
            config.manifest.filename = PathBuf::from(manifest);
        }

        if let Ok(command) = std::env::var("SCAFFOLD_KIT_INSTALL_COMMAND") {
            config.install.command = command;
        }

        Ok(())
    }

    /// Get the loaded configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Consume the loader and return the configuration.
    pub fn into_config(self) -> Config {
        self.config
    }

    /// Config files that were merged, lowest tier first.
    pub fn sources(&self) -> &[(ConfigTier, PathBuf)] {
        &self.sources
    }
}

/// Read `config.yaml` from a tier directory.
///
/// A missing file is not an error. An unreadable or malformed file is skipped
/// with a warning so one broken tier does not block scaffolding.
fn read_tier_file(dir: &Path) -> Option<(Value, PathBuf)> {
    let file = dir.join(CONFIG_FILE_NAME);
    if !file.exists() {
        return None;
    }

    let content = match std::fs::read_to_string(&file) {
        Ok(content) => content,
        Err(e) => {
            warn!(path = %file.display(), error = %e, "Failed to read config file");
            return None;
        }
    };

    match serde_yaml::from_str::<Value>(&content) {
        Ok(value) => Some((value, file)),
        Err(e) => {
            warn!(path = %file.display(), error = %e, "Ignoring malformed config file");
            None
        }
    }
}

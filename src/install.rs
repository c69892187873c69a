//! Dependency installation.
//!
//! The installer reports one outcome per package and only returns `Err` when
//! the installer itself cannot run (missing executable, spawn failure). A
//! package that fails to install is an `InstallOutcome::Failed`, not an error.

use crate::config::InstallConfig;
use crate::entry::InstallOptions;
use async_trait::async_trait;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Mutex;
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, warn};

/// Result of installing one package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum InstallOutcome {
    Installed,
    AlreadyPresent,
    Failed(String),
}

impl InstallOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, InstallOutcome::Failed(_))
    }
}

/// The installer could not be used at all.
#[derive(Debug, Error)]
pub enum InstallError {
    /// The package manager executable could not be started.
    #[error("failed to run `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The installer was configured with nothing to run.
    #[error("no install command configured")]
    NoCommand,
}

/// Injected dependency installer.
#[async_trait]
pub trait DependencyInstaller: Send + Sync {
    async fn install(&self, name: &str, options: InstallOptions)
    -> Result<InstallOutcome, InstallError>;
}

/// Installs packages by running a package manager in the target directory.
#[derive(Debug, Clone)]
pub struct CommandInstaller {
    program: String,
    args: Vec<String>,
    dev_flag: String,
    working_dir: PathBuf,
}

impl CommandInstaller {
    pub fn new(config: &InstallConfig, working_dir: impl Into<PathBuf>) -> Self {
        Self {
            program: config.command.clone(),
            args: config.args.clone(),
            dev_flag: config.dev_flag.clone(),
            working_dir: working_dir.into(),
        }
    }

    /// Full argument list for one package.
    pub fn command_args(&self, name: &str, options: InstallOptions) -> Vec<String> {
        let mut args = self.args.clone();
        args.push(name.to_string());
        if options.dev && !self.dev_flag.is_empty() {
            args.push(self.dev_flag.clone());
        }
        args
    }

    fn installed_manifest(&self, name: &str) -> PathBuf {
        self.working_dir
            .join("node_modules")
            .join(name)
            .join("package.json")
    }
}

#[async_trait]
impl DependencyInstaller for CommandInstaller {
    async fn install(
        &self,
        name: &str,
        options: InstallOptions,
    ) -> Result<InstallOutcome, InstallError> {
        if self.program.trim().is_empty() {
            return Err(InstallError::NoCommand);
        }

        if tokio::fs::try_exists(self.installed_manifest(name))
            .await
            .unwrap_or(false)
        {
            debug!(package = %name, "Dependency already present");
            return Ok(InstallOutcome::AlreadyPresent);
        }

        let args = self.command_args(name, options);
        debug!(program = %self.program, args = ?args, "Running installer");

        let output = Command::new(&self.program)
            .args(&args)
            .current_dir(&self.working_dir)
            .output()
            .await
            .map_err(|source| InstallError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        if output.status.success() {
            Ok(InstallOutcome::Installed)
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let reason = format!(
                "{} exited with status {}: {}",
                self.program,
                output.status.code().unwrap_or(-1),
                stderr.trim()
            );
            warn!(package = %name, reason = %reason, "Dependency install failed");
            Ok(InstallOutcome::Failed(reason))
        }
    }
}

/// Installer that records requests without running anything.
///
/// Used for dry runs, `--no-install`, and tests. Packages listed as present
/// report `AlreadyPresent`; packages listed as failing report `Failed`.
#[derive(Debug, Default)]
pub struct RecordingInstaller {
    present: Vec<String>,
    failing: Vec<String>,
    unavailable: bool,
    calls: Mutex<Vec<(String, InstallOptions)>>,
}

impl RecordingInstaller {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_present(mut self, name: impl Into<String>) -> Self {
        self.present.push(name.into());
        self
    }

    pub fn with_failing(mut self, name: impl Into<String>) -> Self {
        self.failing.push(name.into());
        self
    }

    /// Make every call fail as if the package manager were missing.
    pub fn unavailable(mut self) -> Self {
        self.unavailable = true;
        self
    }

    /// Every install request, in call order.
    pub fn calls(&self) -> Vec<(String, InstallOptions)> {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

#[async_trait]
impl DependencyInstaller for RecordingInstaller {
    async fn install(
        &self,
        name: &str,
        options: InstallOptions,
    ) -> Result<InstallOutcome, InstallError> {
        if self.unavailable {
            return Err(InstallError::NoCommand);
        }
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((name.to_string(), options));

        if self.failing.iter().any(|n| n == name) {
            Ok(InstallOutcome::Failed(format!("{} could not be installed", name)))
        } else if self.present.iter().any(|n| n == name) {
            Ok(InstallOutcome::AlreadyPresent)
        } else {
            Ok(InstallOutcome::Installed)
        }
    }
}

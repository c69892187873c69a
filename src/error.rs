//! Structured error types for scaffolding runs.

use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};

/// Error codes for programmatic error handling.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Caller contract violations
    DuplicateFile,
    UnsupportedFormat,
    InvalidFieldValue,

    // Target and file errors
    InvalidTarget,
    FileNotFound,
    ParseError,
    MergeFailed,
    IoError,

    // Collaborator failures
    InstallerUnavailable,
    ManifestWriteFailed,
    HookFailed,

    InternalError,
}

/// Structured error carried through the scaffolding pipeline.
#[derive(Debug, Clone, Serialize)]
pub struct ScaffoldError {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ScaffoldError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            path: None,
            details: None,
        }
    }

    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    // Convenience constructors

    pub fn duplicate_file(entry: &str, filename: &str) -> Self {
        Self::new(
            ErrorCode::DuplicateFile,
            format!("Entry {} declares {} more than once", entry, filename),
        )
    }

    pub fn unsupported_format(path: &Path, reason: &str) -> Self {
        Self::new(
            ErrorCode::UnsupportedFormat,
            format!("Cannot serialize {}: {}", path.display(), reason),
        )
        .with_path(path)
    }

    pub fn invalid_value(field: &str, reason: &str) -> Self {
        Self::new(ErrorCode::InvalidFieldValue, format!("{}: {}", field, reason))
    }

    pub fn invalid_target(path: &Path, reason: &str) -> Self {
        Self::new(
            ErrorCode::InvalidTarget,
            format!("Invalid target directory {}: {}", path.display(), reason),
        )
        .with_path(path)
    }

    pub fn not_found(path: &Path) -> Self {
        Self::new(
            ErrorCode::FileNotFound,
            format!("File not found: {}", path.display()),
        )
        .with_path(path)
    }

    pub fn parse(path: &Path, err: impl fmt::Display) -> Self {
        Self::new(
            ErrorCode::ParseError,
            format!("Failed to parse {}", path.display()),
        )
        .with_path(path)
        .with_details(err.to_string())
    }

    pub fn merge(path: &Path, step: &str, err: impl fmt::Display) -> Self {
        Self::new(
            ErrorCode::MergeFailed,
            format!("Merge step '{}' failed for {}", step, path.display()),
        )
        .with_path(path)
        .with_details(err.to_string())
    }

    pub fn io(path: &Path, err: impl fmt::Display) -> Self {
        Self::new(
            ErrorCode::IoError,
            format!("I/O error on {}: {}", path.display(), err),
        )
        .with_path(path)
    }

    pub fn installer(err: impl fmt::Display) -> Self {
        Self::new(
            ErrorCode::InstallerUnavailable,
            format!("Dependency installer unavailable: {}", err),
        )
    }

    pub fn manifest_write(path: &Path, err: impl fmt::Display) -> Self {
        Self::new(
            ErrorCode::ManifestWriteFailed,
            format!("Failed to write manifest {}: {}", path.display(), err),
        )
        .with_path(path)
    }

    pub fn hook(entry: &str, stage: &str, err: impl fmt::Display) -> Self {
        Self::new(
            ErrorCode::HookFailed,
            format!("{} hook of {} failed: {}", stage, entry, err),
        )
    }

    pub fn internal(err: impl fmt::Display) -> Self {
        Self::new(ErrorCode::InternalError, err.to_string())
    }
}

impl fmt::Display for ScaffoldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(ref details) = self.details {
            write!(f, " ({})", details)?;
        }
        Ok(())
    }
}

impl std::error::Error for ScaffoldError {}

// Allow using ? with anyhow errors by converting them
impl From<anyhow::Error> for ScaffoldError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast::<ScaffoldError>() {
            Ok(scaffold_err) => scaffold_err,
            Err(err) => ScaffoldError::internal(err),
        }
    }
}

impl From<serde_json::Error> for ScaffoldError {
    fn from(err: serde_json::Error) -> Self {
        Self::new(ErrorCode::ParseError, "Invalid JSON").with_details(err.to_string())
    }
}

impl From<serde_yaml::Error> for ScaffoldError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::new(ErrorCode::ParseError, "Invalid YAML").with_details(err.to_string())
    }
}

/// Result type for scaffolding operations.
pub type ScaffoldResult<T> = std::result::Result<T, ScaffoldError>;

//! Marker-file discovery built on the walks.
//!
//! `find_up` locates the project root (nearest ancestor holding a marker such
//! as `package.json`); `discover_scopes` finds workspace packages below a root.

use super::{DownwardBounds, Step, values, walk_down, walk_down_async, walk_up, walk_up_async};
use crate::error::{ScaffoldError, ScaffoldResult};
use crate::fs::FileSystem;
use std::path::{Path, PathBuf};

/// Directory names never descended into during scope discovery.
const SKIPPED_DIRS: &[&str] = &["node_modules"];

/// Immediate subdirectories of `dir`, sorted by path.
pub fn read_subdirs(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut subdirs = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            subdirs.push(entry.path());
        }
    }
    subdirs.sort();
    Ok(subdirs)
}

/// Absolute path of the nearest `marker` at or above `start`.
///
/// Returns `None` when no ancestor up to the filesystem root has it.
pub fn find_up(start: &Path, marker: &str) -> Option<PathBuf> {
    let start = std::path::absolute(start).unwrap_or_else(|_| start.to_path_buf());
    let found = walk_up(&start, None, |dir| {
        let candidate = dir.join(marker);
        if candidate.exists() {
            Step::found_and_stop(candidate)
        } else {
            Step::next()
        }
    });
    values(found).into_iter().next()
}

/// Async form of [`find_up`] over an injected filesystem.
///
/// `start` is used as given; the filesystem decides what paths mean.
pub async fn find_up_async(fs: &dyn FileSystem, start: &Path, marker: &str) -> Option<PathBuf> {
    let found = walk_up_async(start, None, |dir| async move {
        let candidate = dir.join(marker);
        if fs.exists(&candidate).await {
            Step::found_and_stop(candidate)
        } else {
            Step::next()
        }
    })
    .await;
    values(found).into_iter().next()
}

/// Directories at or below `root` that contain `marker`, breadth-first.
///
/// Hidden directories and `node_modules` are not descended into.
pub async fn discover_scopes(
    fs: &dyn FileSystem,
    root: &Path,
    marker: &str,
    max_depth: Option<usize>,
) -> ScaffoldResult<Vec<PathBuf>> {
    let bounds = DownwardBounds {
        end_at: None,
        max_depth,
    };
    let found = walk_down_async(
        root,
        &bounds,
        |dir| async move {
            let subdirs = fs.list_subdirs(&dir).await?;
            Ok::<Vec<PathBuf>, ScaffoldError>(
                subdirs.into_iter().filter(|d| is_descendable(d)).collect(),
            )
        },
        |dir| async move {
            if fs.exists(&dir.join(marker)).await {
                Step::found(dir)
            } else {
                Step::next()
            }
        },
    )
    .await?;
    Ok(values(found))
}

/// Blocking form of [`discover_scopes`] over the real filesystem.
pub fn discover_scopes_sync(
    root: &Path,
    marker: &str,
    max_depth: Option<usize>,
) -> std::io::Result<Vec<PathBuf>> {
    let bounds = DownwardBounds {
        end_at: None,
        max_depth,
    };
    let found = walk_down(
        root,
        &bounds,
        |dir| {
            let subdirs = read_subdirs(dir)?;
            Ok::<Vec<PathBuf>, std::io::Error>(
                subdirs.into_iter().filter(|d| is_descendable(d)).collect(),
            )
        },
        |dir| {
            if dir.join(marker).is_file() {
                Step::found(dir.to_path_buf())
            } else {
                Step::next()
            }
        },
    )?;
    Ok(values(found))
}

fn is_descendable(dir: &Path) -> bool {
    match dir.file_name().and_then(|n| n.to_str()) {
        Some(name) => !name.starts_with('.') && !SKIPPED_DIRS.contains(&name),
        None => false,
    }
}

//! Upward walk from a start directory towards an ancestor.

use super::{Collect, Found, ResultHandler, Step};
use std::future::Future;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Walk from `start` up to `end` (or the filesystem root when `end` is `None`).
///
/// `start` is always visited. `end` itself is not visited unless it equals
/// `start`, in which case the visitor fires exactly once. The walk stops as
/// soon as a step asks to break, when the next directory would be `end`, or
/// after the root has been visited. `start` should be absolute; a relative
/// path stops at its first component. An `end` that is not an ancestor of
/// `start` never matches, so the walk continues to the filesystem root.
pub fn walk_up<T, F>(start: &Path, end: Option<&Path>, visit: F) -> Vec<Found<T>>
where
    F: FnMut(&Path) -> Step<T>,
{
    walk_up_with(start, end, visit, &mut Collect)
}

/// [`walk_up`] with a custom result handler.
pub fn walk_up_with<T, F, H>(
    start: &Path,
    end: Option<&Path>,
    mut visit: F,
    handler: &mut H,
) -> Vec<Found<T>>
where
    F: FnMut(&Path) -> Step<T>,
    H: ResultHandler<T>,
{
    let mut found = Vec::new();
    let mut current = Some(start);

    while let Some(dir) = current {
        let step = visit(dir);
        let stop = step.should_break || end == Some(dir);
        if let Some(result) = step.result {
            handler.handle(&mut found, dir, result);
        }
        if stop {
            debug!(dir = %dir.display(), "Upward walk stopped");
            break;
        }
        current = next_dir(dir, end);
    }

    found
}

/// Async form of [`walk_up`]. The visitor receives an owned path so the
/// returned future does not borrow from the walk.
pub async fn walk_up_async<T, F, Fut>(start: &Path, end: Option<&Path>, visit: F) -> Vec<Found<T>>
where
    F: FnMut(PathBuf) -> Fut,
    Fut: Future<Output = Step<T>>,
{
    walk_up_async_with(start, end, visit, &mut Collect).await
}

/// Async form of [`walk_up_with`].
pub async fn walk_up_async_with<T, F, Fut, H>(
    start: &Path,
    end: Option<&Path>,
    mut visit: F,
    handler: &mut H,
) -> Vec<Found<T>>
where
    F: FnMut(PathBuf) -> Fut,
    Fut: Future<Output = Step<T>>,
    H: ResultHandler<T>,
{
    let mut found = Vec::new();
    let mut current = Some(start);

    while let Some(dir) = current {
        let step = visit(dir.to_path_buf()).await;
        let stop = step.should_break || end == Some(dir);
        if let Some(result) = step.result {
            handler.handle(&mut found, dir, result);
        }
        if stop {
            debug!(dir = %dir.display(), "Upward walk stopped");
            break;
        }
        current = next_dir(dir, end);
    }

    found
}

/// Parent of `dir`, unless it is the end boundary or there is none.
fn next_dir<'a>(dir: &'a Path, end: Option<&Path>) -> Option<&'a Path> {
    let parent = dir.parent().filter(|p| !p.as_os_str().is_empty())?;
    if end == Some(parent) {
        return None;
    }
    Some(parent)
}

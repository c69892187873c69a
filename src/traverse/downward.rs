//! Breadth-first downward walk.

use super::{Collect, Found, QueuedDir, ResultHandler, Step, TraversalQueue};
use std::collections::VecDeque;
use std::future::Future;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Limits on a downward walk.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DownwardBounds {
    /// Directory that is visited but never expanded.
    pub end_at: Option<PathBuf>,
    /// Maximum depth below the start that is expanded (start is depth 0).
    pub max_depth: Option<usize>,
}

impl DownwardBounds {
    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn end_at(mut self, dir: impl Into<PathBuf>) -> Self {
        self.end_at = Some(dir.into());
        self
    }

    pub fn max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    fn should_expand(&self, dir: &QueuedDir) -> bool {
        if self.end_at.as_deref() == Some(dir.path.as_path()) {
            return false;
        }
        match self.max_depth {
            Some(max) => dir.depth < max,
            None => true,
        }
    }
}

/// Walk breadth-first from `start`, listing children with `list`.
///
/// Directories are visited strictly in FIFO order. The walk stops when a step
/// asks to break or the queue drains. A directory equal to `bounds.end_at` (or
/// at `bounds.max_depth`) is visited but not expanded, so `start == end_at`
/// fires the visitor exactly once. Listing errors abort the walk.
pub fn walk_down<T, E, L, F>(
    start: &Path,
    bounds: &DownwardBounds,
    list: L,
    visit: F,
) -> Result<Vec<Found<T>>, E>
where
    L: FnMut(&Path) -> Result<Vec<PathBuf>, E>,
    F: FnMut(&Path) -> Step<T>,
{
    walk_down_with(start, bounds, list, visit, &mut Collect, VecDeque::new())
}

/// [`walk_down`] with a custom result handler and queue.
pub fn walk_down_with<T, E, L, F, H, Q>(
    start: &Path,
    bounds: &DownwardBounds,
    mut list: L,
    mut visit: F,
    handler: &mut H,
    mut queue: Q,
) -> Result<Vec<Found<T>>, E>
where
    L: FnMut(&Path) -> Result<Vec<PathBuf>, E>,
    F: FnMut(&Path) -> Step<T>,
    H: ResultHandler<T>,
    Q: TraversalQueue<QueuedDir>,
{
    let mut found = Vec::new();
    queue.enqueue(QueuedDir {
        path: start.to_path_buf(),
        depth: 0,
    });

    while let Some(current) = queue.dequeue() {
        let step = visit(&current.path);
        let stop = step.should_break;
        if let Some(result) = step.result {
            handler.handle(&mut found, &current.path, result);
        }
        if stop {
            debug!(dir = %current.path.display(), "Downward walk stopped");
            break;
        }
        if !bounds.should_expand(&current) {
            continue;
        }
        for child in list(&current.path)? {
            queue.enqueue(QueuedDir {
                path: child,
                depth: current.depth + 1,
            });
        }
    }

    Ok(found)
}

/// Async form of [`walk_down`].
pub async fn walk_down_async<T, E, L, LFut, F, VFut>(
    start: &Path,
    bounds: &DownwardBounds,
    list: L,
    visit: F,
) -> Result<Vec<Found<T>>, E>
where
    L: FnMut(PathBuf) -> LFut,
    LFut: Future<Output = Result<Vec<PathBuf>, E>>,
    F: FnMut(PathBuf) -> VFut,
    VFut: Future<Output = Step<T>>,
{
    walk_down_async_with(start, bounds, list, visit, &mut Collect, VecDeque::new()).await
}

/// Async form of [`walk_down_with`].
///
/// Each listing is awaited before the next directory is dequeued; no two
/// directories are expanded concurrently.
pub async fn walk_down_async_with<T, E, L, LFut, F, VFut, H, Q>(
    start: &Path,
    bounds: &DownwardBounds,
    mut list: L,
    mut visit: F,
    handler: &mut H,
    mut queue: Q,
) -> Result<Vec<Found<T>>, E>
where
    L: FnMut(PathBuf) -> LFut,
    LFut: Future<Output = Result<Vec<PathBuf>, E>>,
    F: FnMut(PathBuf) -> VFut,
    VFut: Future<Output = Step<T>>,
    H: ResultHandler<T>,
    Q: TraversalQueue<QueuedDir>,
{
    let mut found = Vec::new();
    queue.enqueue(QueuedDir {
        path: start.to_path_buf(),
        depth: 0,
    });

    while let Some(current) = queue.dequeue() {
        let step = visit(current.path.clone()).await;
        let stop = step.should_break;
        if let Some(result) = step.result {
            handler.handle(&mut found, &current.path, result);
        }
        if stop {
            debug!(dir = %current.path.display(), "Downward walk stopped");
            break;
        }
        if !bounds.should_expand(&current) {
            continue;
        }
        for child in list(current.path.clone()).await? {
            queue.enqueue(QueuedDir {
                path: child,
                depth: current.depth + 1,
            });
        }
    }

    Ok(found)
}

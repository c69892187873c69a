//! Bounded directory traversal.
//!
//! Two walk shapes share one aggregation contract:
//! - **Upward** ([`walk_up`]) climbs from a start directory towards an end
//!   directory or the filesystem root.
//! - **Downward** ([`walk_down`]) descends breadth-first through an injected
//!   subdirectory lister.
//!
//! At every directory the caller's visitor returns a [`Step`]: whether to stop,
//! and optionally a value (or several) to record for that directory. Recorded
//! values are folded into the result list by a [`ResultHandler`]; the default
//! [`Collect`] pushes single values and splices in lists.
//!
//! Every walk has a blocking and an async form with identical semantics.

mod discover;
mod downward;
mod queue;
mod upward;

pub use discover::{discover_scopes, discover_scopes_sync, find_up, find_up_async, read_subdirs};
pub use downward::{DownwardBounds, walk_down, walk_down_async, walk_down_async_with, walk_down_with};
pub use queue::{QueuedDir, TraversalQueue};
pub use upward::{walk_up, walk_up_async, walk_up_async_with, walk_up_with};

use std::path::{Path, PathBuf};

/// Value produced by a visitor for one directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepResult<T> {
    One(T),
    Many(Vec<T>),
}

/// Visitor decision for one directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step<T> {
    pub should_break: bool,
    pub result: Option<StepResult<T>>,
}

impl<T> Step<T> {
    /// Record nothing and keep walking.
    pub fn next() -> Self {
        Self {
            should_break: false,
            result: None,
        }
    }

    /// Record nothing and stop.
    pub fn stop() -> Self {
        Self {
            should_break: true,
            result: None,
        }
    }

    /// Record a value and keep walking.
    pub fn found(value: T) -> Self {
        Self {
            should_break: false,
            result: Some(StepResult::One(value)),
        }
    }

    /// Record a value and stop.
    pub fn found_and_stop(value: T) -> Self {
        Self {
            should_break: true,
            result: Some(StepResult::One(value)),
        }
    }

    /// Record several values and keep walking.
    pub fn found_many(values: Vec<T>) -> Self {
        Self {
            should_break: false,
            result: Some(StepResult::Many(values)),
        }
    }

    /// Change whether the walk stops after this step.
    pub fn with_break(mut self, should_break: bool) -> Self {
        self.should_break = should_break;
        self
    }
}

/// A recorded value and the directory that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Found<T> {
    pub dir: PathBuf,
    pub value: T,
}

/// Folds a visitor's result into the accumulated list.
pub trait ResultHandler<T> {
    fn handle(&mut self, found: &mut Vec<Found<T>>, dir: &Path, result: StepResult<T>);
}

/// Default handler: push single values, splice in lists.
#[derive(Debug, Clone, Copy, Default)]
pub struct Collect;

impl<T> ResultHandler<T> for Collect {
    fn handle(&mut self, found: &mut Vec<Found<T>>, dir: &Path, result: StepResult<T>) {
        match result {
            StepResult::One(value) => found.push(Found {
                dir: dir.to_path_buf(),
                value,
            }),
            StepResult::Many(values) => found.extend(values.into_iter().map(|value| Found {
                dir: dir.to_path_buf(),
                value,
            })),
        }
    }
}

/// Extract just the values from a walk result.
pub fn values<T>(found: Vec<Found<T>>) -> Vec<T> {
    found.into_iter().map(|f| f.value).collect()
}

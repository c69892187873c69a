//! scaffold-kit library
//!
//! This module exports the core components for testing and integration:
//! deep merge, directory traversal, conflict resolution and the orchestrator
//! that ties them to dependency installation and the shared manifest.

pub mod cli;
pub mod config;
pub mod conflict;
pub mod entry;
pub mod error;
pub mod format;
pub mod fs;
pub mod install;
pub mod logging;
pub mod manifest;
pub mod orchestrator;
pub mod recipe;
pub mod traverse;

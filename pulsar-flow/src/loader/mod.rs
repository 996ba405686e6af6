//! Stage discovery from definition files.
//!
//! This module provides:
//! - [`StageLoader`], which scans a package directory for stage definitions
//! - [`DependencyGraph`], an index-keyed graph ordered with Kahn's algorithm
//! - [`LoaderConfig`], the serde-backed discovery settings

mod config;
mod discovery;
mod graph;

pub use config::LoaderConfig;
pub use discovery::{load_stage_modules, DiscoveredStage, StageDefinition, StageLoader};
pub use graph::{DependencyGraph, NodeId};

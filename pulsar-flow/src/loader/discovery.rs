//! Directory-based stage discovery.

use super::{DependencyGraph, LoaderConfig};
use crate::collaborators::RequiredCollaborators;
use crate::core::StageMetadata;
use crate::errors::LoaderError;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// A stage described by one definition file.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StageDefinition {
    /// Display name; the file stem when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// What the stage does.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Modules that must load first, as full ids or bare stems.
    #[serde(default)]
    pub dependencies: Vec<String>,
    /// Collaborators the stage needs.
    #[serde(default)]
    pub requires: RequiredCollaborators,
    /// Whether the stage is optional.
    #[serde(default)]
    pub optional: bool,
    /// Stage parameters.
    #[serde(default)]
    pub params: HashMap<String, serde_json::Value>,
}

impl StageDefinition {
    /// Builds metadata, naming the stage `fallback` if the file has no name.
    #[must_use]
    pub fn metadata(&self, fallback: &str) -> StageMetadata {
        let mut meta = StageMetadata::new(self.name.as_deref().unwrap_or(fallback))
            .with_dependencies(self.dependencies.iter().cloned())
            .with_requires(self.requires.clone());
        if let Some(ref description) = self.description {
            meta = meta.with_description(description.as_str());
        }
        if self.optional {
            meta = meta.optional();
        }
        meta
    }
}

/// A definition recorded under its module id.
#[derive(Debug, Clone, PartialEq)]
pub struct DiscoveredStage {
    /// `<package>.<stem>`.
    pub module_id: String,
    /// The file it came from.
    pub path: PathBuf,
    /// The parsed definition.
    pub definition: StageDefinition,
}

/// Discovers stage definitions in a package directory.
#[derive(Debug, Clone)]
pub struct StageLoader {
    config: LoaderConfig,
    identifier: Regex,
}

impl StageLoader {
    /// Creates a loader.
    ///
    /// # Errors
    ///
    /// Returns [`LoaderError::Config`] if the identifier pattern is invalid.
    pub fn new(config: LoaderConfig) -> Result<Self, LoaderError> {
        let identifier = Regex::new(&config.identifier_pattern)
            .map_err(|e| LoaderError::Config(format!("invalid identifier pattern: {e}")))?;
        Ok(Self { config, identifier })
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &LoaderConfig {
        &self.config
    }

    /// Discovers every definition in `dir`, ordered so each follows its
    /// dependencies.
    ///
    /// # Errors
    ///
    /// Returns [`LoaderError::NotADirectory`] or [`LoaderError::NotAPackage`]
    /// for an unusable directory, [`LoaderError::Io`] if it cannot be listed,
    /// and [`LoaderError::CyclicDependency`] if the definitions form a cycle.
    pub fn discover(&self, dir: impl AsRef<Path>) -> Result<Vec<DiscoveredStage>, LoaderError> {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            return Err(LoaderError::NotADirectory {
                path: dir.to_path_buf(),
            });
        }
        if !dir.join(&self.config.package_marker).is_file() {
            return Err(LoaderError::NotAPackage {
                path: dir.to_path_buf(),
                marker: self.config.package_marker.clone(),
            });
        }

        let package = package_name(dir);
        let mut graph = DependencyGraph::new();
        let mut recorded: HashMap<String, DiscoveredStage> = HashMap::new();

        for path in self.candidate_files(dir)? {
            let Some(stage) = self.read_definition(&package, &path) else {
                continue;
            };
            let deps = match resolve_dependencies(&package, &stage, &recorded) {
                Ok(deps) => deps,
                Err(missing) => {
                    warn!(
                        module = %stage.module_id,
                        dependency = %missing,
                        "Skipping stage definition: dependency not found"
                    );
                    continue;
                }
            };

            let node = graph.add_node(stage.module_id.as_str());
            for dep in &deps {
                let dep_node = graph.add_node(dep.as_str());
                graph.add_edge(node, dep_node);
            }
            info!(module = %stage.module_id, path = %path.display(), "Loaded stage definition");
            recorded.insert(stage.module_id.clone(), stage);
        }

        let order = graph.sorted_labels()?;
        debug!(package = %package, order = ?order, "Resolved stage load order");
        Ok(order
            .into_iter()
            .filter_map(|id| recorded.remove(&id))
            .collect())
    }

    /// Returns the module ids in `dir` in dependency order.
    ///
    /// # Errors
    ///
    /// Same as [`StageLoader::discover`].
    pub fn module_ids(&self, dir: impl AsRef<Path>) -> Result<Vec<String>, LoaderError> {
        Ok(self
            .discover(dir)?
            .into_iter()
            .map(|stage| stage.module_id)
            .collect())
    }

    fn candidate_files(&self, dir: &Path) -> Result<Vec<PathBuf>, LoaderError> {
        let mut files = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            if !path.is_file() {
                continue;
            }
            let accepted = path
                .file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| self.config.accepts(name));
            if accepted {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }

    fn read_definition(&self, package: &str, path: &Path) -> Option<DiscoveredStage> {
        let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or_default();
        if !self.identifier.is_match(stem) {
            warn!(path = %path.display(), "Skipping stage definition: file stem is not a valid identifier");
            return None;
        }

        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Skipping stage definition: unreadable");
                return None;
            }
        };
        let definition: StageDefinition = match serde_json::from_str(&raw) {
            Ok(definition) => definition,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Skipping stage definition: invalid JSON");
                return None;
            }
        };

        Some(DiscoveredStage {
            module_id: format!("{package}.{stem}"),
            path: path.to_path_buf(),
            definition,
        })
    }
}

/// Resolves declared dependencies to module ids; a reference to the
/// module itself counts as recorded. Returns the first unresolved name.
fn resolve_dependencies(
    package: &str,
    stage: &DiscoveredStage,
    recorded: &HashMap<String, DiscoveredStage>,
) -> Result<Vec<String>, String> {
    let mut seen = HashSet::new();
    let mut resolved = Vec::new();
    for dep in &stage.definition.dependencies {
        let id = if dep.contains('.') {
            dep.clone()
        } else {
            format!("{package}.{dep}")
        };
        if id != stage.module_id && !recorded.contains_key(&id) {
            return Err(dep.clone());
        }
        if seen.insert(id.clone()) {
            resolved.push(id);
        }
    }
    Ok(resolved)
}

fn package_name(dir: &Path) -> String {
    dir.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "stages".to_string())
}

/// Returns the module ids in `dir` in dependency order, using the default
/// configuration.
///
/// # Errors
///
/// Same as [`StageLoader::discover`].
pub fn load_stage_modules(dir: impl AsRef<Path>) -> Result<Vec<String>, LoaderError> {
    StageLoader::new(LoaderConfig::default())?.module_ids(dir)
}

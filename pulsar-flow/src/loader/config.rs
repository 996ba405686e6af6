//! Configuration for stage discovery.

use crate::errors::LoaderError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Configuration for [`StageLoader`](super::StageLoader).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoaderConfig {
    /// File that marks a directory as a stage package.
    #[serde(default = "default_package_marker")]
    pub package_marker: String,
    /// Extension of stage definition files, without the dot.
    #[serde(default = "default_extension")]
    pub extension: String,
    /// File names that are never treated as stage definitions.
    #[serde(default = "default_excluded_files")]
    pub excluded_files: Vec<String>,
    /// File names starting with this prefix are ignored.
    #[serde(default = "default_private_prefix")]
    pub private_prefix: String,
    /// Pattern a file stem must match to become a module name.
    #[serde(default = "default_identifier_pattern")]
    pub identifier_pattern: String,
}

fn default_package_marker() -> String {
    "_package.json".to_string()
}

fn default_extension() -> String {
    "json".to_string()
}

fn default_excluded_files() -> Vec<String> {
    vec![
        "_package.json".to_string(),
        "base_stage.json".to_string(),
        "factory.json".to_string(),
    ]
}

fn default_private_prefix() -> String {
    "__".to_string()
}

fn default_identifier_pattern() -> String {
    r"^[A-Za-z_][A-Za-z0-9_]*$".to_string()
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            package_marker: default_package_marker(),
            extension: default_extension(),
            excluded_files: default_excluded_files(),
            private_prefix: default_private_prefix(),
            identifier_pattern: default_identifier_pattern(),
        }
    }
}

impl LoaderConfig {
    /// Creates a configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a configuration from JSON; missing fields take defaults.
    ///
    /// # Errors
    ///
    /// Returns [`LoaderError::Config`] if the JSON is malformed.
    pub fn from_json_str(json: &str) -> Result<Self, LoaderError> {
        serde_json::from_str(json).map_err(|e| LoaderError::Config(e.to_string()))
    }

    /// Reads a configuration from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns [`LoaderError::Io`] if the file cannot be read, or
    /// [`LoaderError::Config`] if it is malformed.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, LoaderError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    /// Sets the package marker file.
    #[must_use]
    pub fn with_package_marker(mut self, marker: impl Into<String>) -> Self {
        self.package_marker = marker.into();
        self
    }

    /// Sets the definition file extension.
    #[must_use]
    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into();
        self
    }

    /// Adds an excluded file name.
    #[must_use]
    pub fn with_excluded_file(mut self, name: impl Into<String>) -> Self {
        self.excluded_files.push(name.into());
        self
    }

    /// Sets the identifier pattern.
    #[must_use]
    pub fn with_identifier_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.identifier_pattern = pattern.into();
        self
    }

    /// Returns true if a file called `file_name` should be considered.
    #[must_use]
    pub fn accepts(&self, file_name: &str) -> bool {
        let suffix = format!(".{}", self.extension);
        file_name.ends_with(&suffix)
            && !file_name.starts_with(&self.private_prefix)
            && !self.excluded_files.iter().any(|f| f == file_name)
    }
}

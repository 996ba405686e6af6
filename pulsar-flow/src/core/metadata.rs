//! Descriptive stage metadata.

use crate::collaborators::RequiredCollaborators;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

/// Descriptive, non-authoritative information about a stage.
///
/// Used for introspection and printing only; execution never reads it.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StageMetadata {
    /// The stage name.
    pub name: String,
    /// What the stage does.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Version string.
    #[serde(default = "default_version")]
    pub version: String,
    /// Author.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    /// Free-form tags.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Names of prerequisite stages.
    #[serde(default)]
    pub dependencies: Vec<String>,
    /// Collaborators the stage needs.
    #[serde(default)]
    pub requires: RequiredCollaborators,
    /// Whether the workflow may proceed without this stage.
    #[serde(default)]
    pub optional: bool,
}

fn default_version() -> String {
    "0.1.0".to_string()
}

impl StageMetadata {
    /// Creates metadata for the named stage.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: default_version(),
            ..Default::default()
        }
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Sets the version.
    #[must_use]
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Sets the author.
    #[must_use]
    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    /// Adds a tag.
    #[must_use]
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    /// Sets the prerequisite stage names.
    #[must_use]
    pub fn with_dependencies(mut self, deps: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.dependencies = deps.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the required collaborators.
    #[must_use]
    pub fn with_requires(mut self, requires: RequiredCollaborators) -> Self {
        self.requires = requires;
        self
    }

    /// Marks the stage as optional.
    #[must_use]
    pub const fn optional(mut self) -> Self {
        self.optional = true;
        self
    }
}

/// Renders a numbered listing of stages about to run.
#[must_use]
pub fn describe_stages(stages: &[StageMetadata]) -> String {
    let mut out = String::from("Stages to be executed:\n");
    for (i, meta) in stages.iter().enumerate() {
        let _ = writeln!(out, "{}. {}", i + 1, meta.name);
        let _ = writeln!(out, "    Optional: {}", meta.optional);
        let _ = writeln!(out, "    Dependencies: [{}]", meta.dependencies.join(", "));
        if let Some(ref description) = meta.description {
            let _ = writeln!(out, "    Description: {description}");
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::CollaboratorKind;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_metadata_builder() {
        let meta = StageMetadata::new("send_messages")
            .with_description("Publishes test messages")
            .with_author("qa")
            .with_tag("producer")
            .with_dependencies(["get_logs"])
            .with_requires(RequiredCollaborators::new([
                CollaboratorKind::Producer,
                CollaboratorKind::Metrics,
            ]));

        assert_eq!(meta.version, "0.1.0");
        assert_eq!(meta.dependencies, vec!["get_logs".to_string()]);
        assert!(meta.requires.contains(CollaboratorKind::Producer));
        assert!(!meta.optional);
    }

    #[test]
    fn test_metadata_deserialize_defaults() {
        let meta: StageMetadata = serde_json::from_str(r#"{"name": "get_logs"}"#).unwrap();
        assert_eq!(meta.name, "get_logs");
        assert_eq!(meta.version, "0.1.0");
        assert!(meta.tags.is_empty());
        assert!(meta.requires.is_empty());
    }

    #[test]
    fn test_describe_stages() {
        let stages = vec![
            StageMetadata::new("get_logs").with_description("Fetch broker logs"),
            StageMetadata::new("send_messages")
                .with_dependencies(["get_logs"])
                .optional(),
        ];

        let text = describe_stages(&stages);
        assert_eq!(
            text,
            "Stages to be executed:\n\
             1. get_logs\n    Optional: false\n    Dependencies: []\n    Description: Fetch broker logs\n\
             2. send_messages\n    Optional: true\n    Dependencies: [get_logs]\n"
        );
    }
}

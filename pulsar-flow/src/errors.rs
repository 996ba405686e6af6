//! Error types for the pulsar-flow engine.
//!
//! Every error that can end up inside a [`StageResult`](crate::core::StageResult)
//! is `Clone`, so results stay plain values that observers can keep around.

use crate::collaborators::CollaboratorKind;
use std::collections::HashMap;
use thiserror::Error;

/// The umbrella error type for pulsar-flow operations.
#[derive(Debug, Error)]
pub enum PulsarError {
    /// A stage lifecycle error.
    #[error("{0}")]
    Stage(#[from] StageError),

    /// A workflow construction error.
    #[error("{0}")]
    Workflow(#[from] WorkflowError),

    /// A stage discovery error.
    #[error("{0}")]
    Loader(#[from] LoaderError),

    /// A required collaborator was missing.
    #[error("{0}")]
    Dependency(#[from] DependencyError),
}

/// Errors raised by a stage while it executes or tears down.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StageError {
    /// The stage's run reported a recognised failure.
    #[error("Stage '{stage}' execution failed: {message}")]
    Execution {
        /// The stage name.
        stage: String,
        /// What went wrong.
        message: String,
    },

    /// The stage's run panicked.
    #[error("Stage '{stage}' panicked: {message}")]
    Panicked {
        /// The stage name.
        stage: String,
        /// The panic payload, rendered as text.
        message: String,
    },

    /// The stage received a missing or malformed parameter.
    #[error("Stage '{stage}' received invalid parameter '{parameter}': {message}")]
    InvalidParameter {
        /// The stage name.
        stage: String,
        /// The offending parameter name.
        parameter: String,
        /// Why the parameter was rejected.
        message: String,
    },

    /// The stage's collaborators are incomplete.
    #[error("{0}")]
    Dependency(#[from] DependencyError),

    /// The stage failed to release its resources.
    #[error("Stage '{stage}' teardown failed: {message}")]
    Teardown {
        /// The stage name.
        stage: String,
        /// What went wrong.
        message: String,
    },

    /// No stage with the given name is registered.
    #[error("Stage '{stage}' not found")]
    NotFound {
        /// The requested stage name.
        stage: String,
    },
}

impl StageError {
    /// Creates an execution failure.
    #[must_use]
    pub fn execution(stage: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Execution {
            stage: stage.into(),
            message: message.into(),
        }
    }

    /// Creates a panic failure.
    #[must_use]
    pub fn panicked(stage: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Panicked {
            stage: stage.into(),
            message: message.into(),
        }
    }

    /// Creates an invalid parameter error.
    #[must_use]
    pub fn invalid_parameter(
        stage: impl Into<String>,
        parameter: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::InvalidParameter {
            stage: stage.into(),
            parameter: parameter.into(),
            message: message.into(),
        }
    }

    /// Creates a teardown failure.
    #[must_use]
    pub fn teardown(stage: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Teardown {
            stage: stage.into(),
            message: message.into(),
        }
    }

    /// Creates a not-found error.
    #[must_use]
    pub fn not_found(stage: impl Into<String>) -> Self {
        Self::NotFound {
            stage: stage.into(),
        }
    }

    /// Returns the name of the stage that raised the error.
    #[must_use]
    pub fn stage(&self) -> &str {
        match self {
            Self::Execution { stage, .. }
            | Self::Panicked { stage, .. }
            | Self::InvalidParameter { stage, .. }
            | Self::Teardown { stage, .. }
            | Self::NotFound { stage } => stage,
            Self::Dependency(err) => &err.stage,
        }
    }

    /// Returns a short machine-readable kind tag.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Execution { .. } => "execution",
            Self::Panicked { .. } => "panicked",
            Self::InvalidParameter { .. } => "invalid_parameter",
            Self::Dependency(_) => "dependency",
            Self::Teardown { .. } => "teardown",
            Self::NotFound { .. } => "not_found",
        }
    }

    /// Converts to a dictionary representation.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        let mut map = HashMap::new();
        map.insert("type".to_string(), serde_json::json!(self.kind()));
        map.insert("stage".to_string(), serde_json::json!(self.stage()));
        map.insert("message".to_string(), serde_json::json!(self.to_string()));
        map
    }
}

/// Raised when a stage's required collaborators are not all supplied.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Stage '{stage}' has unmet dependencies: {}", format_kinds(.missing))]
pub struct DependencyError {
    /// The stage name.
    pub stage: String,
    /// The collaborators that were required but absent.
    pub missing: Vec<CollaboratorKind>,
}

impl DependencyError {
    /// Creates a new dependency error.
    #[must_use]
    pub fn new(stage: impl Into<String>, missing: Vec<CollaboratorKind>) -> Self {
        Self {
            stage: stage.into(),
            missing,
        }
    }
}

fn format_kinds(kinds: &[CollaboratorKind]) -> String {
    kinds
        .iter()
        .map(CollaboratorKind::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Raised by a collaborator that cannot perform an operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{collaborator} error: {message}")]
pub struct CollaboratorError {
    /// Which collaborator failed.
    pub collaborator: CollaboratorKind,
    /// What went wrong.
    pub message: String,
}

impl CollaboratorError {
    /// Creates a new collaborator error.
    #[must_use]
    pub fn new(collaborator: CollaboratorKind, message: impl Into<String>) -> Self {
        Self {
            collaborator,
            message: message.into(),
        }
    }
}

/// Errors raised while wiring a workflow.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorkflowError {
    /// A stage named a dependency that was not registered before it.
    #[error("Dependency '{dependency}' of stage '{stage}' not found in stages")]
    DependencyNotFound {
        /// The dependent stage.
        stage: String,
        /// The unresolved dependency name.
        dependency: String,
    },
}

impl WorkflowError {
    /// Creates a dependency-not-found error.
    #[must_use]
    pub fn dependency_not_found(stage: impl Into<String>, dependency: impl Into<String>) -> Self {
        Self::DependencyNotFound {
            stage: stage.into(),
            dependency: dependency.into(),
        }
    }
}

/// Raised when a dependency graph cannot be ordered.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Cyclic dependency detected among stages: {}", .nodes.join(", "))]
pub struct CycleDetectedError {
    /// The nodes that could not be placed in the order.
    pub nodes: Vec<String>,
}

impl CycleDetectedError {
    /// Creates a new cycle error.
    #[must_use]
    pub fn new(nodes: Vec<String>) -> Self {
        Self { nodes }
    }
}

/// Errors raised while discovering stage definitions on disk.
#[derive(Debug, Error)]
pub enum LoaderError {
    /// The path does not point to a directory.
    #[error("Provided path '{}' is not a valid directory", .path.display())]
    NotADirectory {
        /// The rejected path.
        path: std::path::PathBuf,
    },

    /// The directory lacks the package marker file.
    #[error("Provided path '{}' is not a package (missing '{marker}')", .path.display())]
    NotAPackage {
        /// The rejected path.
        path: std::path::PathBuf,
        /// The marker file that was expected.
        marker: String,
    },

    /// The discovered definitions contain a dependency cycle.
    #[error("{0}")]
    CyclicDependency(#[from] CycleDetectedError),

    /// The loader configuration could not be parsed.
    #[error("Invalid loader configuration: {0}")]
    Config(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

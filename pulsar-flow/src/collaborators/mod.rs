//! Collaborators injected into stages.
//!
//! A collaborator is an external object a stage needs to do its work: a
//! logger, a message producer or a metrics sink. Stages receive an immutable
//! [`Collaborators`] bundle at construction time; nothing is shared through
//! type-level state.
//!
//! Required collaborators ([`RequiredCollaborators`]) are a different concept
//! from prerequisite stages ([`PrerequisiteStages`](crate::stages::PrerequisiteStages)):
//! the former are objects handed to a stage, the latter are stages that must
//! finish before it.

mod defaults;

pub use defaults::{InMemoryMetrics, InMemoryProducer, TracingLogger};

use crate::core::StageStatus;
use crate::errors::{CollaboratorError, DependencyError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Anything a stage can depend on exposes an availability check.
pub trait Collaborator: Send + Sync {
    /// Returns true if the collaborator can currently be used.
    fn is_available(&self) -> bool;
}

/// Logging collaborator.
pub trait Logger: Collaborator {
    /// Logs an info message.
    fn info(&self, msg: &str);
    /// Logs an error message.
    fn error(&self, msg: &str);
    /// Logs a debug message.
    fn debug(&self, msg: &str);
    /// Logs a warning message.
    fn warning(&self, msg: &str);
}

/// Message producer collaborator.
pub trait Producer: Collaborator {
    /// Connects to the message broker.
    fn connect(&self);
    /// Disconnects from the message broker.
    fn disconnect(&self);
    /// Sends one message.
    ///
    /// # Errors
    ///
    /// Returns an error if the producer is not connected or the broker
    /// rejects the message.
    fn send_message(&self, msg: &str) -> Result<(), CollaboratorError>;
}

/// Metrics collaborator.
pub trait Metrics: Collaborator {
    /// Records sent messages.
    fn record_send(&self, value: f64);
    /// Records the latency of an operation in milliseconds.
    fn record_latency(&self, value: f64, operation: &str);
    /// Records a stage status transition.
    fn record_stage_status(&self, stage: &str, status: StageStatus);
    /// Reads back a metric value, `0.0` if never recorded.
    fn metric(&self, name: &str) -> f64;
}

/// The kinds of collaborator a stage can require.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollaboratorKind {
    /// A [`Logger`].
    Logger,
    /// A [`Producer`].
    Producer,
    /// A [`Metrics`] sink.
    Metrics,
}

impl CollaboratorKind {
    /// Returns the collaborator's registration name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Logger => "logger",
            Self::Producer => "producer",
            Self::Metrics => "metrics",
        }
    }
}

impl fmt::Display for CollaboratorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The collaborator kinds a stage needs before it can run.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequiredCollaborators(Vec<CollaboratorKind>);

impl RequiredCollaborators {
    /// Creates a requirement list, dropping duplicates but keeping order.
    #[must_use]
    pub fn new(kinds: impl IntoIterator<Item = CollaboratorKind>) -> Self {
        let mut list = Vec::new();
        for kind in kinds {
            if !list.contains(&kind) {
                list.push(kind);
            }
        }
        Self(list)
    }

    /// Requires nothing.
    #[must_use]
    pub const fn none() -> Self {
        Self(Vec::new())
    }

    /// Returns true if `kind` is required.
    #[must_use]
    pub fn contains(&self, kind: CollaboratorKind) -> bool {
        self.0.contains(&kind)
    }

    /// Iterates the required kinds in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = CollaboratorKind> + '_ {
        self.0.iter().copied()
    }

    /// Returns the number of required kinds.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if nothing is required.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// An immutable bundle of collaborators handed to one stage instance.
#[derive(Clone, Default)]
pub struct Collaborators {
    logger: Option<Arc<dyn Logger>>,
    producer: Option<Arc<dyn Producer>>,
    metrics: Option<Arc<dyn Metrics>>,
}

impl fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collaborators")
            .field("has_logger", &self.logger.is_some())
            .field("has_producer", &self.producer.is_some())
            .field("has_metrics", &self.metrics.is_some())
            .finish()
    }
}

impl Collaborators {
    /// Creates an empty bundle.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the logger.
    #[must_use]
    pub fn with_logger(mut self, logger: Arc<dyn Logger>) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Sets the producer.
    #[must_use]
    pub fn with_producer(mut self, producer: Arc<dyn Producer>) -> Self {
        self.producer = Some(producer);
        self
    }

    /// Sets the metrics sink.
    #[must_use]
    pub fn with_metrics(mut self, metrics: Arc<dyn Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Returns the logger, if supplied.
    #[must_use]
    pub const fn logger(&self) -> Option<&Arc<dyn Logger>> {
        self.logger.as_ref()
    }

    /// Returns the producer, if supplied.
    #[must_use]
    pub const fn producer(&self) -> Option<&Arc<dyn Producer>> {
        self.producer.as_ref()
    }

    /// Returns the metrics sink, if supplied.
    #[must_use]
    pub const fn metrics(&self) -> Option<&Arc<dyn Metrics>> {
        self.metrics.as_ref()
    }

    /// Returns true if a collaborator of `kind` was supplied.
    #[must_use]
    pub const fn has(&self, kind: CollaboratorKind) -> bool {
        match kind {
            CollaboratorKind::Logger => self.logger.is_some(),
            CollaboratorKind::Producer => self.producer.is_some(),
            CollaboratorKind::Metrics => self.metrics.is_some(),
        }
    }

    fn availability(&self, kind: CollaboratorKind) -> bool {
        match kind {
            CollaboratorKind::Logger => self.logger.as_ref().is_some_and(|c| c.is_available()),
            CollaboratorKind::Producer => self.producer.as_ref().is_some_and(|c| c.is_available()),
            CollaboratorKind::Metrics => self.metrics.as_ref().is_some_and(|c| c.is_available()),
        }
    }

    /// Lists the required kinds that were not supplied.
    #[must_use]
    pub fn missing(&self, required: &RequiredCollaborators) -> Vec<CollaboratorKind> {
        required.iter().filter(|kind| !self.has(*kind)).collect()
    }

    /// Lists the required kinds that are missing or report unavailable.
    #[must_use]
    pub fn unavailable(&self, required: &RequiredCollaborators) -> Vec<CollaboratorKind> {
        required.iter().filter(|kind| !self.availability(*kind)).collect()
    }

    /// Returns a bundle holding only the collaborators in `required`.
    #[must_use]
    pub fn subset(&self, required: &RequiredCollaborators) -> Self {
        Self {
            logger: self.logger.clone().filter(|_| required.contains(CollaboratorKind::Logger)),
            producer: self
                .producer
                .clone()
                .filter(|_| required.contains(CollaboratorKind::Producer)),
            metrics: self.metrics.clone().filter(|_| required.contains(CollaboratorKind::Metrics)),
        }
    }

    /// Returns true if every required collaborator is supplied and available.
    #[must_use]
    pub fn is_available(&self, required: &RequiredCollaborators) -> bool {
        required.iter().all(|kind| self.availability(kind))
    }

    /// Checks that every required collaborator was supplied.
    ///
    /// # Errors
    ///
    /// Returns a [`DependencyError`] naming the missing kinds.
    pub fn validate(&self, stage: &str, required: &RequiredCollaborators) -> Result<(), DependencyError> {
        let missing = self.missing(required);
        if missing.is_empty() {
            Ok(())
        } else {
            Err(DependencyError::new(stage, missing))
        }
    }

    /// Returns the logger or a dependency error for `stage`.
    ///
    /// # Errors
    ///
    /// Returns a [`DependencyError`] if no logger was supplied.
    pub fn require_logger(&self, stage: &str) -> Result<&Arc<dyn Logger>, DependencyError> {
        self.logger
            .as_ref()
            .ok_or_else(|| DependencyError::new(stage, vec![CollaboratorKind::Logger]))
    }

    /// Returns the producer or a dependency error for `stage`.
    ///
    /// # Errors
    ///
    /// Returns a [`DependencyError`] if no producer was supplied.
    pub fn require_producer(&self, stage: &str) -> Result<&Arc<dyn Producer>, DependencyError> {
        self.producer
            .as_ref()
            .ok_or_else(|| DependencyError::new(stage, vec![CollaboratorKind::Producer]))
    }

    /// Returns the metrics sink or a dependency error for `stage`.
    ///
    /// # Errors
    ///
    /// Returns a [`DependencyError`] if no metrics sink was supplied.
    pub fn require_metrics(&self, stage: &str) -> Result<&Arc<dyn Metrics>, DependencyError> {
        self.metrics
            .as_ref()
            .ok_or_else(|| DependencyError::new(stage, vec![CollaboratorKind::Metrics]))
    }
}

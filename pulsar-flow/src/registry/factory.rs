//! Explicit stage registry with collaborator injection.

use crate::collaborators::{CollaboratorKind, Collaborators, Logger, Metrics, Producer};
use crate::context::ExecutionContext;
use crate::core::{StageMetadata, StageResult, StageStatus};
use crate::errors::{DependencyError, StageError};
use crate::observer::StageObserver;
use crate::stages::{PrerequisiteStages, StageCommand, StageHandle, StageId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// A collaborator handed to [`StageFactory::register_collaborator`].
#[derive(Clone)]
pub enum CollaboratorHandle {
    /// A logger.
    Logger(Arc<dyn Logger>),
    /// A message producer.
    Producer(Arc<dyn Producer>),
    /// A metrics sink.
    Metrics(Arc<dyn Metrics>),
}

impl CollaboratorHandle {
    /// Returns the kind of collaborator held.
    #[must_use]
    pub const fn kind(&self) -> CollaboratorKind {
        match self {
            Self::Logger(_) => CollaboratorKind::Logger,
            Self::Producer(_) => CollaboratorKind::Producer,
            Self::Metrics(_) => CollaboratorKind::Metrics,
        }
    }
}

impl fmt::Debug for CollaboratorHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("CollaboratorHandle").field(&self.kind()).finish()
    }
}

type StageConstructor = Box<dyn Fn(&Collaborators) -> StageHandle + Send + Sync>;

struct Registration {
    metadata: StageMetadata,
    constructor: StageConstructor,
}

/// Builds stages by name, injecting the collaborators each one requires.
///
/// Each created stage receives only the subset of collaborators its
/// metadata lists, as an immutable [`Collaborators`] bundle.
#[derive(Default)]
pub struct StageFactory {
    collaborators: Collaborators,
    registrations: Vec<Registration>,
    index: HashMap<String, usize>,
}

impl fmt::Debug for StageFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StageFactory")
            .field("collaborators", &self.collaborators)
            .field("stages", &self.registered_stages())
            .finish()
    }
}

impl StageFactory {
    /// Creates an empty factory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a factory with a prepared collaborator bundle.
    #[must_use]
    pub fn with_collaborators(collaborators: Collaborators) -> Self {
        Self {
            collaborators,
            ..Self::default()
        }
    }

    /// Registers (or replaces) the collaborator of the handle's kind.
    pub fn register_collaborator(&mut self, handle: CollaboratorHandle) -> &mut Self {
        debug!(collaborator = %handle.kind(), "Registering collaborator");
        let current = std::mem::take(&mut self.collaborators);
        self.collaborators = match handle {
            CollaboratorHandle::Logger(logger) => current.with_logger(logger),
            CollaboratorHandle::Producer(producer) => current.with_producer(producer),
            CollaboratorHandle::Metrics(metrics) => current.with_metrics(metrics),
        };
        self
    }

    /// Registers a stage constructor under `metadata.name`.
    ///
    /// Registering a name twice replaces the earlier registration in place.
    pub fn register_stage<F>(&mut self, metadata: StageMetadata, constructor: F) -> &mut Self
    where
        F: Fn(&Collaborators) -> StageHandle + Send + Sync + 'static,
    {
        let registration = Registration {
            metadata,
            constructor: Box::new(constructor),
        };
        let name = registration.metadata.name.clone();
        if let Some(&slot) = self.index.get(&name) {
            warn!(stage = %name, "Stage is already registered; replacing");
            self.registrations[slot] = registration;
        } else {
            self.index.insert(name, self.registrations.len());
            self.registrations.push(registration);
        }
        self
    }

    /// Returns the metadata registered for `name`.
    ///
    /// # Errors
    ///
    /// Returns [`StageError::NotFound`] for an unknown name.
    pub fn stage_metadata(&self, name: &str) -> Result<&StageMetadata, StageError> {
        self.registration(name).map(|r| &r.metadata)
    }

    /// Lists registered names in registration order.
    #[must_use]
    pub fn registered_stages(&self) -> Vec<&str> {
        self.registrations
            .iter()
            .map(|r| r.metadata.name.as_str())
            .collect()
    }

    /// Creates the stage registered as `name`.
    ///
    /// An optional stage is created even when collaborators are missing;
    /// its `is_available` then reports false.
    ///
    /// # Errors
    ///
    /// Returns [`StageError::NotFound`] for an unknown name, or
    /// [`StageError::Dependency`] if a required stage lacks collaborators.
    pub fn create_stage(&self, name: &str) -> Result<StageHandle, StageError> {
        let registration = self.registration(name)?;
        let metadata = &registration.metadata;

        let missing = self.collaborators.missing(&metadata.requires);
        if !missing.is_empty() && !metadata.optional {
            return Err(DependencyError::new(name, missing).into());
        }

        let bundle = self.collaborators.subset(&metadata.requires);
        let available = bundle.is_available(&metadata.requires);
        let stage = (registration.constructor)(&bundle);
        debug!(stage = %name, available, "Created stage");

        Ok(Arc::new(RegisteredStage {
            inner: stage,
            optional: metadata.optional,
            available,
        }))
    }

    /// Creates every registered stage that can run, in registration order.
    ///
    /// Unavailable optional stages are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`StageError::Dependency`] if a required stage is unavailable.
    pub fn available_stages(&self) -> Result<Vec<StageHandle>, StageError> {
        let mut stages = Vec::new();
        for registration in &self.registrations {
            let name = registration.metadata.name.as_str();
            let stage = self.create_stage(name)?;
            if stage.is_available() {
                stages.push(stage);
            } else if registration.metadata.optional {
                warn!(stage = %name, "Skipping unavailable optional stage");
            } else {
                let unavailable = self.collaborators.unavailable(&registration.metadata.requires);
                return Err(DependencyError::new(name, unavailable).into());
            }
        }
        Ok(stages)
    }

    fn registration(&self, name: &str) -> Result<&Registration, StageError> {
        self.index
            .get(name)
            .map(|&slot| &self.registrations[slot])
            .ok_or_else(|| StageError::not_found(name))
    }
}

/// A factory-built stage carrying the availability computed at creation.
struct RegisteredStage {
    inner: StageHandle,
    optional: bool,
    available: bool,
}

impl fmt::Debug for RegisteredStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisteredStage")
            .field("inner", &self.inner)
            .field("optional", &self.optional)
            .field("available", &self.available)
            .finish()
    }
}

impl StageCommand for RegisteredStage {
    fn id(&self) -> StageId {
        self.inner.id()
    }

    fn name(&self) -> &str {
        self.inner.name()
    }

    fn status(&self) -> StageStatus {
        self.inner.status()
    }

    fn execute(&self, ctx: &ExecutionContext) -> StageResult {
        self.inner.execute(ctx)
    }

    fn teardown(&self, ctx: &ExecutionContext) -> Result<(), StageError> {
        self.inner.teardown(ctx)
    }

    fn add_dependency(&self, stage: StageHandle) {
        self.inner.add_dependency(stage);
    }

    fn add_observer(&self, observer: Arc<dyn StageObserver>) {
        self.inner.add_observer(observer);
    }

    fn dependencies(&self) -> PrerequisiteStages {
        self.inner.dependencies()
    }

    fn is_optional(&self) -> bool {
        self.optional || self.inner.is_optional()
    }

    fn is_available(&self) -> bool {
        self.available && self.inner.is_available()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::mocks::MockProducer;
    use crate::collaborators::{InMemoryMetrics, InMemoryProducer, RequiredCollaborators, TracingLogger};
    use crate::stages::{FnTask, Stage};
    use crate::testing::MockTask;

    fn send_messages_meta() -> StageMetadata {
        StageMetadata::new("send_messages").with_requires(RequiredCollaborators::new([
            CollaboratorKind::Producer,
            CollaboratorKind::Metrics,
        ]))
    }

    fn factory_with_stages() -> StageFactory {
        let mut factory = StageFactory::new();
        factory
            .register_stage(
                StageMetadata::new("get_logs")
                    .with_requires(RequiredCollaborators::new([CollaboratorKind::Logger])),
                |_| Stage::shared(MockTask::new("get_logs")),
            )
            .register_stage(send_messages_meta(), |collaborators: &Collaborators| {
                let producer = collaborators.producer().cloned();
                Stage::shared(FnTask::new("send_messages", move |_: &ExecutionContext| {
                    let producer = producer
                        .clone()
                        .ok_or_else(|| StageError::execution("send_messages", "no producer"))?;
                    producer
                        .send_message("hello")
                        .map_err(|e| StageError::execution("send_messages", e.to_string()))?;
                    Ok(serde_json::json!({"sent": 1}))
                }))
            })
            .register_stage(
                StageMetadata::new("export_metrics")
                    .with_requires(RequiredCollaborators::new([CollaboratorKind::Metrics]))
                    .optional(),
                |_| Stage::shared(MockTask::new("export_metrics")),
            );
        factory
    }

    #[test]
    fn test_registered_stages_in_order() {
        let factory = factory_with_stages();
        assert_eq!(
            factory.registered_stages(),
            vec!["get_logs", "send_messages", "export_metrics"]
        );
        assert!(factory.stage_metadata("export_metrics").unwrap().optional);
        assert!(matches!(
            factory.stage_metadata("ghost"),
            Err(StageError::NotFound { .. })
        ));
    }

    #[test]
    fn test_required_stage_missing_collaborator() {
        let mut factory = factory_with_stages();
        factory.register_collaborator(CollaboratorHandle::Metrics(Arc::new(InMemoryMetrics::default())));

        let err = factory.create_stage("send_messages").unwrap_err();

        match err {
            StageError::Dependency(dep) => {
                assert_eq!(dep.stage, "send_messages");
                assert_eq!(dep.missing, vec![CollaboratorKind::Producer]);
            }
            other => panic!("expected dependency error, got {other}"),
        }
    }

    #[test]
    fn test_optional_stage_created_but_unavailable() {
        let factory = factory_with_stages();

        let stage = factory.create_stage("export_metrics").unwrap();

        assert_eq!(stage.name(), "export_metrics");
        assert!(!stage.is_available());
        assert!(stage.is_optional());
    }

    #[test]
    fn test_constructor_receives_required_collaborators() {
        let producer = Arc::new(InMemoryProducer::new());
        producer.connect();
        let mut factory = factory_with_stages();
        factory
            .register_collaborator(CollaboratorHandle::Producer(producer.clone()))
            .register_collaborator(CollaboratorHandle::Metrics(Arc::new(InMemoryMetrics::default())));

        let stage = factory.create_stage("send_messages").unwrap();
        let result = stage.execute(&ExecutionContext::new());

        assert!(stage.is_available());
        assert_eq!(result.status(), StageStatus::Completed);
        assert_eq!(producer.sent_messages(), vec!["hello"]);
    }

    #[test]
    fn test_available_stages_skips_optional() {
        let producer = Arc::new(InMemoryProducer::new());
        producer.connect();
        let mut factory = StageFactory::with_collaborators(
            Collaborators::new()
                .with_logger(Arc::new(TracingLogger::new()))
                .with_producer(producer),
        );
        factory
            .register_stage(
                StageMetadata::new("get_logs")
                    .with_requires(RequiredCollaborators::new([CollaboratorKind::Logger])),
                |_| Stage::shared(MockTask::new("get_logs")),
            )
            .register_stage(
                StageMetadata::new("export_metrics")
                    .with_requires(RequiredCollaborators::new([CollaboratorKind::Metrics]))
                    .optional(),
                |_| Stage::shared(MockTask::new("export_metrics")),
            );

        let stages = factory.available_stages().unwrap();
        let names: Vec<_> = stages.iter().map(|s| s.name().to_string()).collect();
        assert_eq!(names, vec!["get_logs"]);
    }

    #[test]
    fn test_available_stages_fails_for_unavailable_required() {
        let factory = factory_with_stages();
        let err = factory.available_stages().unwrap_err();
        assert_eq!(err.kind(), "dependency");
        assert_eq!(err.stage(), "get_logs");
    }

    #[test]
    fn test_unavailable_producer_makes_required_stage_unavailable() {
        let mut producer = MockProducer::new();
        producer.expect_is_available().return_const(false);
        let mut factory = StageFactory::new();
        factory
            .register_collaborator(CollaboratorHandle::Producer(Arc::new(producer)))
            .register_stage(
                StageMetadata::new("publish")
                    .with_requires(RequiredCollaborators::new([CollaboratorKind::Producer])),
                |_| Stage::shared(MockTask::new("publish")),
            );

        let stage = factory.create_stage("publish").unwrap();
        assert!(!stage.is_available());

        let err = factory.available_stages().unwrap_err();
        assert!(matches!(
            err,
            StageError::Dependency(ref dep) if dep.missing == vec![CollaboratorKind::Producer]
        ));
    }

    #[test]
    fn test_reregistration_replaces() {
        let mut factory = factory_with_stages();
        factory.register_stage(
            StageMetadata::new("get_logs").with_description("replacement"),
            |_| Stage::shared(MockTask::new("get_logs")),
        );

        assert_eq!(factory.registered_stages().len(), 3);
        assert_eq!(
            factory.stage_metadata("get_logs").unwrap().description.as_deref(),
            Some("replacement")
        );
        assert!(factory.create_stage("get_logs").is_ok());
    }
}

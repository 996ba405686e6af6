//! Incremental workflow construction.

use crate::errors::WorkflowError;
use crate::stages::{CompositeStage, Stage, StageCommand, StageHandle, StageTask};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// Name given to the root composite when none is supplied.
pub const DEFAULT_WORKFLOW_NAME: &str = "main_workflow";

/// Builds a workflow one stage at a time.
///
/// A stage may only depend on stages registered before it, so the resulting
/// graph is acyclic by construction. Every registered stage also becomes a
/// substage of the root composite; the per-run execution record makes sure a
/// stage that is both a substage and a prerequisite still runs once.
pub struct WorkflowBuilder {
    root: Arc<CompositeStage>,
    stages: HashMap<String, StageHandle>,
    order: Vec<String>,
}

impl Default for WorkflowBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_WORKFLOW_NAME)
    }
}

impl fmt::Debug for WorkflowBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkflowBuilder")
            .field("name", &self.root.name())
            .field("stages", &self.order)
            .finish()
    }
}

impl WorkflowBuilder {
    /// Creates a builder whose root composite is called `name`.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            root: Arc::new(CompositeStage::new(name)),
            stages: HashMap::new(),
            order: Vec::new(),
        }
    }

    /// Registers `stage`, wiring it to the already registered `depends_on`.
    ///
    /// Registering a name twice rebinds the name for later lookups; the
    /// earlier stage stays a substage of the root.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError::DependencyNotFound`] if a dependency name was
    /// not registered earlier. Nothing is registered in that case.
    pub fn add_stage(
        &mut self,
        stage: StageHandle,
        depends_on: &[&str],
    ) -> Result<&mut Self, WorkflowError> {
        let name = stage.name().to_string();

        let resolved = depends_on
            .iter()
            .map(|dep| {
                self.stages
                    .get(*dep)
                    .cloned()
                    .ok_or_else(|| WorkflowError::dependency_not_found(&name, *dep))
            })
            .collect::<Result<Vec<_>, _>>()?;

        if self.stages.contains_key(&name) {
            warn!(stage = %name, "Stage is already registered; overwriting");
        } else {
            self.order.push(name.clone());
        }

        for dependency in resolved {
            stage.add_dependency(dependency);
        }
        debug!(stage = %name, dependencies = ?depends_on, "Stage registered");

        self.root.add_substage(stage.clone());
        self.stages.insert(name, stage);
        Ok(self)
    }

    /// Wraps `task` in a [`Stage`] and registers it.
    ///
    /// # Errors
    ///
    /// Same as [`WorkflowBuilder::add_stage`].
    pub fn add_task<T>(&mut self, task: T, depends_on: &[&str]) -> Result<&mut Self, WorkflowError>
    where
        T: StageTask + 'static,
    {
        self.add_stage(Stage::shared(task), depends_on)
    }

    /// Looks up a registered stage.
    #[must_use]
    pub fn stage(&self, name: &str) -> Option<StageHandle> {
        self.stages.get(name).cloned()
    }

    /// Returns registered names in first-registration order.
    #[must_use]
    pub fn stage_names(&self) -> &[String] {
        &self.order
    }

    /// Returns the workflow name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.root.name()
    }

    /// Returns the number of distinct stage names.
    #[must_use]
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Returns true if nothing was registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Returns the root composite.
    #[must_use]
    pub fn build(&self) -> Arc<CompositeStage> {
        Arc::clone(&self.root)
    }
}

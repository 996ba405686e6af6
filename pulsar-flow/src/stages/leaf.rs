//! Leaf stage: a [`StageTask`] wrapped in the shared lifecycle.

use super::{PrerequisiteStages, StageCommand, StageCore, StageHandle, StageId, StageTask};
use crate::context::ExecutionContext;
use crate::core::{StageMetadata, StageResult, StageStatus};
use crate::errors::StageError;
use crate::observer::{panic_message, StageObserver};
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, error, warn};

/// A stage that drives one task through setup, run and cleanup.
///
/// Prerequisites run first, through the context's execution record, so a
/// prerequisite shared by several stages runs once per context.
pub struct Stage<T: StageTask> {
    core: StageCore,
    task: T,
}

impl<T: StageTask> Stage<T> {
    /// Wraps `task`.
    #[must_use]
    pub fn new(task: T) -> Self {
        Self {
            core: StageCore::new(task.name()),
            task,
        }
    }

    /// Wraps `task` in a shared handle.
    #[must_use]
    pub fn shared(task: T) -> StageHandle
    where
        T: 'static,
    {
        Arc::new(Self::new(task))
    }

    /// Attaches an observer and returns the stage.
    #[must_use]
    pub fn with_observer(self, observer: Arc<dyn StageObserver>) -> Self {
        self.core.add_observer(observer);
        self
    }

    /// Returns the wrapped task.
    #[must_use]
    pub const fn task(&self) -> &T {
        &self.task
    }

    /// Returns the task's metadata.
    #[must_use]
    pub fn metadata(&self) -> StageMetadata {
        self.task.metadata()
    }

    fn invoke(&self, ctx: &ExecutionContext) -> StageResult {
        let name = self.core.name();
        let outcome = catch_unwind(AssertUnwindSafe(|| {
            self.task.setup(ctx)?;
            self.task.run(ctx)
        }));

        match outcome {
            Ok(Ok(value)) => {
                debug!(stage = %name, "Stage completed");
                StageResult::completed(name, value)
            }
            Ok(Err(err)) => {
                error!(stage = %name, error = %err, "Stage failed");
                StageResult::failed(name, err)
            }
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                error!(stage = %name, panic = %message, "Stage panicked");
                StageResult::failed(name, StageError::panicked(name, message))
            }
        }
    }
}

impl<T: StageTask> fmt::Debug for Stage<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stage")
            .field("core", &self.core)
            .field("optional", &self.task.is_optional())
            .finish_non_exhaustive()
    }
}

impl<T: StageTask> StageCommand for Stage<T> {
    fn id(&self) -> StageId {
        self.core.id()
    }

    fn name(&self) -> &str {
        self.core.name()
    }

    fn status(&self) -> StageStatus {
        self.core.status()
    }

    fn execute(&self, ctx: &ExecutionContext) -> StageResult {
        self.core.transition(self.core.result(StageStatus::Running));

        if let Err(err) = self.core.run_prerequisites(ctx) {
            warn!(stage = %self.core.name(), error = %err, "Prerequisite failed");
            return self
                .core
                .transition(StageResult::failed(self.core.name(), err));
        }

        let result = self.invoke(ctx);
        self.core.transition(result)
    }

    fn teardown(&self, ctx: &ExecutionContext) -> Result<(), StageError> {
        let name = self.core.name();
        match catch_unwind(AssertUnwindSafe(|| self.task.cleanup(ctx))) {
            Ok(Ok(())) => {}
            Ok(Err(err)) => return Err(err),
            Err(panic) => {
                return Err(StageError::teardown(name, panic_message(panic.as_ref())));
            }
        }
        self.core.mark_torn_down();
        Ok(())
    }

    fn add_dependency(&self, stage: StageHandle) {
        self.core.add_dependency(stage);
    }

    fn add_observer(&self, observer: Arc<dyn StageObserver>) {
        self.core.add_observer(observer);
    }

    fn dependencies(&self) -> PrerequisiteStages {
        self.core.dependencies()
    }

    fn is_optional(&self) -> bool {
        self.task.is_optional()
    }

    fn is_available(&self) -> bool {
        self.task.is_available()
    }
}

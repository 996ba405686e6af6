//! The work a leaf stage performs.

use crate::context::ExecutionContext;
use crate::core::StageMetadata;
use crate::errors::StageError;
use std::fmt;

/// The capability a concrete stage implements.
///
/// Only `run` is mandatory. `setup` runs right before it, `cleanup` during
/// teardown; both default to no-ops.
pub trait StageTask: Send + Sync {
    /// Returns the stage name.
    fn name(&self) -> &str;

    /// Prepares resources before `run`.
    ///
    /// # Errors
    ///
    /// Returns an error if the stage cannot be prepared.
    fn setup(&self, _ctx: &ExecutionContext) -> Result<(), StageError> {
        Ok(())
    }

    /// Performs the stage's work.
    ///
    /// # Errors
    ///
    /// Returns an error if the work fails.
    fn run(&self, ctx: &ExecutionContext) -> Result<serde_json::Value, StageError>;

    /// Releases resources acquired by `setup` or `run`.
    ///
    /// # Errors
    ///
    /// Returns an error if resources cannot be released.
    fn cleanup(&self, _ctx: &ExecutionContext) -> Result<(), StageError> {
        Ok(())
    }

    /// Describes the stage.
    fn metadata(&self) -> StageMetadata {
        StageMetadata::new(self.name())
    }

    /// Returns true if teardown failures may be ignored.
    fn is_optional(&self) -> bool {
        false
    }

    /// Returns true if the task has everything it needs to run.
    fn is_available(&self) -> bool {
        true
    }
}

/// A task backed by a closure.
pub struct FnTask<F>
where
    F: Fn(&ExecutionContext) -> Result<serde_json::Value, StageError> + Send + Sync,
{
    name: String,
    func: F,
    optional: bool,
}

impl<F> FnTask<F>
where
    F: Fn(&ExecutionContext) -> Result<serde_json::Value, StageError> + Send + Sync,
{
    /// Creates a new closure task.
    pub fn new(name: impl Into<String>, func: F) -> Self {
        Self {
            name: name.into(),
            func,
            optional: false,
        }
    }

    /// Marks the task optional.
    #[must_use]
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }
}

impl<F> fmt::Debug for FnTask<F>
where
    F: Fn(&ExecutionContext) -> Result<serde_json::Value, StageError> + Send + Sync,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnTask")
            .field("name", &self.name)
            .field("optional", &self.optional)
            .finish()
    }
}

impl<F> StageTask for FnTask<F>
where
    F: Fn(&ExecutionContext) -> Result<serde_json::Value, StageError> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn run(&self, ctx: &ExecutionContext) -> Result<serde_json::Value, StageError> {
        (self.func)(ctx)
    }

    fn metadata(&self) -> StageMetadata {
        let meta = StageMetadata::new(self.name.as_str());
        if self.optional {
            meta.optional()
        } else {
            meta
        }
    }

    fn is_optional(&self) -> bool {
        self.optional
    }
}

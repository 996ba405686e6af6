//! The context threaded through every `execute`/`teardown` call.

use super::{ExecutionRecord, ResultLog};
use crate::core::StageResult;
use crate::errors::StageError;
use crate::observer::panic_message;
use crate::stages::StageCommand;
use std::collections::HashMap;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tracing::error;
use uuid::Uuid;

/// Per-run execution context.
///
/// Carries the ambient environment, the caller's parameters, an optional
/// result sink and the record of stages already executed during this run.
/// Create one context per workflow execution: reusing a context replays the
/// recorded results instead of running stages again.
pub struct ExecutionContext {
    run_id: Uuid,
    env: HashMap<String, serde_json::Value>,
    params: HashMap<String, serde_json::Value>,
    result: Option<Arc<dyn ResultLog>>,
    record: ExecutionRecord,
}

impl Default for ExecutionContext {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("run_id", &self.run_id)
            .field("env_keys", &self.env.keys().collect::<Vec<_>>())
            .field("param_keys", &self.params.keys().collect::<Vec<_>>())
            .field("has_result_log", &self.result.is_some())
            .field("executed", &self.record.len())
            .finish()
    }
}

impl ExecutionContext {
    /// Creates an empty context with a fresh run ID.
    #[must_use]
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            env: HashMap::new(),
            params: HashMap::new(),
            result: None,
            record: ExecutionRecord::new(),
        }
    }

    /// Sets the ambient environment.
    #[must_use]
    pub fn with_env(mut self, env: HashMap<String, serde_json::Value>) -> Self {
        self.env = env;
        self
    }

    /// Adds one environment entry.
    #[must_use]
    pub fn with_env_entry(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.env.insert(key.into(), value);
        self
    }

    /// Sets the caller parameters.
    #[must_use]
    pub fn with_params(mut self, params: HashMap<String, serde_json::Value>) -> Self {
        self.params = params;
        self
    }

    /// Adds one parameter.
    #[must_use]
    pub fn with_param(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.params.insert(key.into(), value);
        self
    }

    /// Sets the result sink.
    #[must_use]
    pub fn with_result_log(mut self, result: Arc<dyn ResultLog>) -> Self {
        self.result = Some(result);
        self
    }

    /// Returns the run ID.
    #[must_use]
    pub const fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Returns the ambient environment.
    #[must_use]
    pub const fn env(&self) -> &HashMap<String, serde_json::Value> {
        &self.env
    }

    /// Returns all caller parameters.
    #[must_use]
    pub const fn params(&self) -> &HashMap<String, serde_json::Value> {
        &self.params
    }

    /// Returns one parameter, if present.
    #[must_use]
    pub fn param(&self, key: &str) -> Option<&serde_json::Value> {
        self.params.get(key)
    }

    /// Returns a parameter that `stage` cannot run without.
    ///
    /// # Errors
    ///
    /// Returns [`StageError::InvalidParameter`] if the key is absent.
    pub fn require_param(&self, stage: &str, key: &str) -> Result<&serde_json::Value, StageError> {
        if self.params.is_empty() {
            return Err(StageError::invalid_parameter(
                stage,
                key,
                "No parameters were provided for the stage",
            ));
        }
        self.params.get(key).ok_or_else(|| {
            StageError::invalid_parameter(stage, key, format!("No '{key}' parameter provided"))
        })
    }

    /// Returns the result sink, if any.
    #[must_use]
    pub fn result_log(&self) -> Option<&Arc<dyn ResultLog>> {
        self.result.as_ref()
    }

    /// Writes to the result sink; a no-op without one.
    pub fn log(&self, message: &str) {
        if let Some(ref result) = self.result {
            result.log(message);
        }
    }

    /// Returns the per-run execution record.
    #[must_use]
    pub const fn record(&self) -> &ExecutionRecord {
        &self.record
    }

    /// Executes `stage` unless it already ran in this context.
    ///
    /// Composites route every prerequisite and child through here, so a stage
    /// that is both a root substage and another stage's prerequisite runs
    /// once per context. A stage requested again while it is still running
    /// (a prerequisite cycle wired by hand) fails instead of recursing, and a
    /// panicking `execute` is recorded as a failure.
    pub fn execute_once(&self, stage: &dyn StageCommand) -> StageResult {
        let id = stage.id();
        if let Some(result) = self.record.get(id) {
            return result;
        }
        if !self.record.begin(id) {
            return StageResult::failed(
                stage.name(),
                StageError::execution(stage.name(), "stage re-entered while running; prerequisites form a cycle"),
            );
        }

        let result = match catch_unwind(AssertUnwindSafe(|| stage.execute(self))) {
            Ok(result) => result,
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                error!(stage = %stage.name(), panic = %message, "Stage panicked during execute");
                StageResult::failed(stage.name(), StageError::panicked(stage.name(), message))
            }
        };
        self.record.finish(id, result.clone());
        result
    }
}

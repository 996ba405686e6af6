//! Mock tasks for testing.

use parking_lot::Mutex;
use std::sync::Arc;

use crate::context::ExecutionContext;
use crate::core::StageMetadata;
use crate::errors::StageError;
use crate::stages::StageTask;

/// A shared, ordered log of lifecycle calls.
///
/// Entries read `"setup:<name>"`, `"run:<name>"` and `"cleanup:<name>"`.
#[derive(Debug, Clone, Default)]
pub struct CallLog {
    entries: Arc<Mutex<Vec<String>>>,
}

impl CallLog {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one call.
    pub fn record(&self, phase: &str, name: &str) {
        self.entries.lock().push(format!("{phase}:{name}"));
    }

    /// Returns every entry in call order.
    #[must_use]
    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().clone()
    }

    /// Returns the names of stages whose `run` was called, in order.
    #[must_use]
    pub fn runs(&self) -> Vec<String> {
        self.phase("run")
    }

    /// Returns the names of stages whose `cleanup` was called, in order.
    #[must_use]
    pub fn cleanups(&self) -> Vec<String> {
        self.phase("cleanup")
    }

    fn phase(&self, phase: &str) -> Vec<String> {
        let prefix = format!("{phase}:");
        self.entries
            .lock()
            .iter()
            .filter_map(|entry| entry.strip_prefix(&prefix).map(ToString::to_string))
            .collect()
    }

    /// Clears the log.
    pub fn reset(&self) {
        self.entries.lock().clear();
    }
}

#[derive(Debug, Clone)]
enum Behavior {
    Succeed(serde_json::Value),
    Fail(String),
    Panic(String),
}

/// A configurable task that records its lifecycle calls.
#[derive(Debug)]
pub struct MockTask {
    name: String,
    behavior: Behavior,
    cleanup_error: Option<String>,
    optional: bool,
    log: CallLog,
    run_count: Mutex<usize>,
}

impl MockTask {
    /// Creates a task that succeeds with `null`.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            behavior: Behavior::Succeed(serde_json::Value::Null),
            cleanup_error: None,
            optional: false,
            log: CallLog::new(),
            run_count: Mutex::new(0),
        }
    }

    /// Succeeds with `value`.
    #[must_use]
    pub fn with_value(mut self, value: serde_json::Value) -> Self {
        self.behavior = Behavior::Succeed(value);
        self
    }

    /// Records calls into a shared log.
    #[must_use]
    pub fn with_log(mut self, log: CallLog) -> Self {
        self.log = log;
        self
    }

    /// Fails every run with an execution error.
    #[must_use]
    pub fn failing(mut self, message: impl Into<String>) -> Self {
        self.behavior = Behavior::Fail(message.into());
        self
    }

    /// Panics on every run.
    #[must_use]
    pub fn panicking(mut self, message: impl Into<String>) -> Self {
        self.behavior = Behavior::Panic(message.into());
        self
    }

    /// Fails every cleanup with a teardown error.
    #[must_use]
    pub fn failing_cleanup(mut self, message: impl Into<String>) -> Self {
        self.cleanup_error = Some(message.into());
        self
    }

    /// Marks the task optional.
    #[must_use]
    pub const fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Returns how many times `run` was called.
    #[must_use]
    pub fn run_count(&self) -> usize {
        *self.run_count.lock()
    }
}

impl StageTask for MockTask {
    fn name(&self) -> &str {
        &self.name
    }

    fn setup(&self, _ctx: &ExecutionContext) -> Result<(), StageError> {
        self.log.record("setup", &self.name);
        Ok(())
    }

    fn run(&self, _ctx: &ExecutionContext) -> Result<serde_json::Value, StageError> {
        *self.run_count.lock() += 1;
        self.log.record("run", &self.name);
        match &self.behavior {
            Behavior::Succeed(value) => Ok(value.clone()),
            Behavior::Fail(message) => Err(StageError::execution(&self.name, message.as_str())),
            Behavior::Panic(message) => panic!("{message}"),
        }
    }

    fn cleanup(&self, _ctx: &ExecutionContext) -> Result<(), StageError> {
        self.log.record("cleanup", &self.name);
        match &self.cleanup_error {
            Some(message) => Err(StageError::teardown(&self.name, message.as_str())),
            None => Ok(()),
        }
    }

    fn metadata(&self) -> StageMetadata {
        let meta = StageMetadata::new(self.name.as_str()).with_tag("mock");
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

//! Shared lifecycle state embedded in every stage.

use super::{PrerequisiteStages, StageHandle, StageId};
use crate::context::ExecutionContext;
use crate::core::{StageResult, StageStatus};
use crate::errors::StageError;
use crate::observer::{ObserverList, StageObserver};
use parking_lot::{Mutex, RwLock};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Metadata message attached to the result of a completed teardown.
pub(crate) const TEARDOWN_MESSAGE: &str = "Stage teardown completed";

/// Identity, status, prerequisites and observers of one stage.
///
/// Status only changes through [`StageCore::transition`], which also notifies
/// observers, so every transition is observable.
pub struct StageCore {
    id: StageId,
    name: String,
    status: Mutex<StageStatus>,
    prerequisites: RwLock<PrerequisiteStages>,
    observers: ObserverList,
}

impl fmt::Debug for StageCore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StageCore")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("status", &self.status())
            .field(
                "prerequisites",
                &self
                    .prerequisites
                    .read()
                    .iter()
                    .map(|s| s.name().to_string())
                    .collect::<Vec<_>>(),
            )
            .field("observers", &self.observers.len())
            .finish()
    }
}

impl StageCore {
    /// Creates pending state for a stage called `name`.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: StageId::new(),
            name: name.into(),
            status: Mutex::new(StageStatus::Pending),
            prerequisites: RwLock::new(Vec::new()),
            observers: ObserverList::new(),
        }
    }

    /// Returns the stage ID.
    #[must_use]
    pub const fn id(&self) -> StageId {
        self.id
    }

    /// Returns the stage name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the current status.
    #[must_use]
    pub fn status(&self) -> StageStatus {
        *self.status.lock()
    }

    /// Appends a prerequisite.
    pub fn add_dependency(&self, stage: StageHandle) {
        self.prerequisites.write().push(stage);
    }

    /// Appends an observer.
    pub fn add_observer(&self, observer: Arc<dyn StageObserver>) {
        self.observers.add(observer);
    }

    /// Returns a snapshot of the prerequisites.
    #[must_use]
    pub fn dependencies(&self) -> PrerequisiteStages {
        self.prerequisites.read().clone()
    }

    /// Builds a bare result for this stage.
    #[must_use]
    pub fn result(&self, status: StageStatus) -> StageResult {
        StageResult::new(self.name.as_str(), status)
    }

    /// Records `result`'s status and notifies every observer.
    ///
    /// Returns the result so callers can hand it straight back.
    pub fn transition(&self, result: StageResult) -> StageResult {
        let status = result.status();
        {
            *self.status.lock() = status;
        }
        debug!(stage = %self.name, status = %status, "Stage status changed");
        self.observers.notify(&result);
        result
    }

    /// Marks the stage skipped after a teardown.
    pub fn mark_torn_down(&self) {
        self.transition(
            self.result(StageStatus::Skipped)
                .with_metadata_entry("message", serde_json::json!(TEARDOWN_MESSAGE)),
        );
    }

    /// Executes every prerequisite in order, stopping at the first failure.
    ///
    /// # Errors
    ///
    /// Returns the failing prerequisite's error.
    pub fn run_prerequisites(&self, ctx: &ExecutionContext) -> Result<(), StageError> {
        for dependency in self.dependencies() {
            let outcome = ctx.execute_once(dependency.as_ref());
            if outcome.is_failed() {
                return Err(failure_of(&outcome));
            }
        }
        Ok(())
    }
}

/// Extracts the error carried by a failed result.
pub(crate) fn failure_of(result: &StageResult) -> StageError {
    result.error().cloned().unwrap_or_else(|| {
        StageError::execution(
            result.stage_name(),
            format!("Stage {} failed", result.stage_name()),
        )
    })
}

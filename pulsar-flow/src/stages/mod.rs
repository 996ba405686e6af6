//! Stage command trait and implementations.
//!
//! Stages are the units of work a workflow executes. Every stage exposes the
//! same lifecycle through [`StageCommand`]: it can be executed, torn down,
//! wired to prerequisite stages and watched by observers.
//!
//! This module provides:
//! - [`StageCommand`], the object-safe lifecycle contract
//! - [`Stage`], a leaf stage driving a [`StageTask`]
//! - [`CompositeStage`], which runs substages in dependency order

mod composite;
mod identity;
mod leaf;
mod state;
mod task;

pub use composite::CompositeStage;
pub use identity::StageId;
pub use leaf::Stage;
pub use state::StageCore;
pub use task::{FnTask, StageTask};

use crate::context::ExecutionContext;
use crate::core::{StageResult, StageStatus};
use crate::errors::StageError;
use crate::observer::StageObserver;
use std::fmt::Debug;
use std::sync::Arc;

/// A shared handle to any stage.
pub type StageHandle = Arc<dyn StageCommand>;

/// Stages that must complete before another stage runs.
///
/// Distinct from [`RequiredCollaborators`](crate::collaborators::RequiredCollaborators),
/// which names the external objects a stage needs.
pub type PrerequisiteStages = Vec<StageHandle>;

/// The lifecycle contract shared by every stage.
///
/// `execute` never returns an error and never unwinds: failures of any kind
/// are reported as a [`StageStatus::Failed`] result.
pub trait StageCommand: Send + Sync + Debug {
    /// Returns the stage's process-unique identity.
    fn id(&self) -> StageId;

    /// Returns the stage name.
    fn name(&self) -> &str;

    /// Returns the current status.
    fn status(&self) -> StageStatus;

    /// Runs the stage and its prerequisites.
    fn execute(&self, ctx: &ExecutionContext) -> StageResult;

    /// Releases the stage's resources and marks it skipped.
    ///
    /// # Errors
    ///
    /// Returns the error raised while releasing resources.
    fn teardown(&self, ctx: &ExecutionContext) -> Result<(), StageError>;

    /// Appends a prerequisite stage.
    fn add_dependency(&self, stage: StageHandle);

    /// Appends an observer.
    fn add_observer(&self, observer: Arc<dyn StageObserver>);

    /// Returns the prerequisite stages in registration order.
    fn dependencies(&self) -> PrerequisiteStages;

    /// Returns true if a teardown failure of this stage may be ignored.
    fn is_optional(&self) -> bool {
        false
    }

    /// Returns true if the stage has everything it needs to run.
    fn is_available(&self) -> bool {
        true
    }
}

//! Composite stage: substages executed in dependency order.

use super::state::failure_of;
use super::{PrerequisiteStages, StageCommand, StageCore, StageHandle, StageId};
use crate::context::ExecutionContext;
use crate::core::{StagePayload, StageResult, StageStatus};
use crate::errors::StageError;
use crate::observability::StageTimer;
use crate::observer::{panic_message, StageObserver};
use parking_lot::RwLock;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{error, info, warn};

/// A stage aggregating ordered substages.
///
/// Execution runs the composite's own prerequisites, then each substage in
/// registration order, stopping at the first failure. Teardown walks the
/// same lists backwards.
pub struct CompositeStage {
    core: StageCore,
    substages: RwLock<Vec<StageHandle>>,
    optional: bool,
}

impl fmt::Debug for CompositeStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositeStage")
            .field("core", &self.core)
            .field(
                "substages",
                &self
                    .substages
                    .read()
                    .iter()
                    .map(|s| s.name().to_string())
                    .collect::<Vec<_>>(),
            )
            .field("optional", &self.optional)
            .finish()
    }
}

impl CompositeStage {
    /// Creates an empty composite.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            core: StageCore::new(name),
            substages: RwLock::new(Vec::new()),
            optional: false,
        }
    }

    /// Marks the composite optional.
    #[must_use]
    pub const fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Appends a substage.
    pub fn add_substage(&self, stage: StageHandle) {
        self.substages.write().push(stage);
    }

    /// Returns the substages in registration order.
    #[must_use]
    pub fn substages(&self) -> Vec<StageHandle> {
        self.substages.read().clone()
    }

    fn fail(&self, err: StageError, children: Vec<StageResult>) -> StageResult {
        error!(stage = %self.core.name(), error = %err, "Workflow failed");
        let result = StageResult::failed(self.core.name(), err);
        let result = if children.is_empty() {
            result
        } else {
            result.with_payload(StagePayload::Children(children))
        };
        self.core.transition(result)
    }

    fn tear_down_each(
        ctx: &ExecutionContext,
        stages: &[StageHandle],
        role: &str,
    ) -> Result<(), StageError> {
        for stage in stages.iter().rev() {
            let outcome = catch_unwind(AssertUnwindSafe(|| stage.teardown(ctx))).unwrap_or_else(|panic| {
                Err(StageError::teardown(stage.name(), panic_message(panic.as_ref())))
            });
            match outcome {
                Ok(()) => ctx.log(&format!("{role} {} torn down successfully", stage.name())),
                Err(err) => {
                    ctx.log(&format!(
                        "Error tearing down {} {}: {err}",
                        role.to_lowercase(),
                        stage.name()
                    ));
                    if stage.is_optional() {
                        warn!(stage = %stage.name(), error = %err, "Ignoring teardown failure of optional stage");
                    } else {
                        error!(stage = %stage.name(), error = %err, "Teardown failed");
                        return Err(err);
                    }
                }
            }
        }
        Ok(())
    }
}

impl StageCommand for CompositeStage {
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
        info!(stage = %self.core.name(), run_id = %ctx.run_id(), "Executing workflow");
        let timer = StageTimer::start(self.core.name());

        for dependency in self.core.dependencies() {
            let outcome = ctx.execute_once(dependency.as_ref());
            if outcome.is_failed() {
                return self.fail(failure_of(&outcome), Vec::new());
            }
        }

        let substages = self.substages();
        let mut children = Vec::with_capacity(substages.len());
        for stage in substages {
            let outcome = ctx.execute_once(stage.as_ref());
            let failed = outcome.is_failed();
            let err = failed.then(|| failure_of(&outcome));
            children.push(outcome);
            if let Some(err) = err {
                return self.fail(err, children);
            }
        }

        info!(
            stage = %self.core.name(),
            stages = children.len(),
            duration_ms = timer.finish(),
            "Workflow completed"
        );
        self.core.transition(
            self.core
                .result(StageStatus::Completed)
                .with_payload(StagePayload::Children(children)),
        )
    }

    fn teardown(&self, ctx: &ExecutionContext) -> Result<(), StageError> {
        Self::tear_down_each(ctx, &self.substages(), "Stage")
            .and_then(|()| Self::tear_down_each(ctx, &self.core.dependencies(), "Dependency"))
            .map_err(|err| {
                ctx.log(&format!("Error during workflow teardown: {err}"));
                err
            })?;
        self.core.mark_torn_down();
        ctx.log(&format!("Workflow {} torn down successfully", self.core.name()));
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
        self.optional
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::MemoryResultLog;
    use crate::stages::Stage;
    use crate::testing::{CallLog, MockTask, RecordingObserver};
    use pretty_assertions::assert_eq;

    /// A hand-written command that panics from both lifecycle methods.
    #[derive(Debug)]
    struct Unruly {
        id: StageId,
    }

    impl StageCommand for Unruly {
        fn id(&self) -> StageId {
            self.id
        }

        fn name(&self) -> &str {
            "unruly"
        }

        fn status(&self) -> StageStatus {
            StageStatus::Pending
        }

        fn execute(&self, _ctx: &ExecutionContext) -> StageResult {
            panic!("custom stage blew up")
        }

        fn teardown(&self, _ctx: &ExecutionContext) -> Result<(), StageError> {
            panic!("custom cleanup blew up")
        }

        fn add_dependency(&self, _stage: StageHandle) {}

        fn add_observer(&self, _observer: Arc<dyn StageObserver>) {}

        fn dependencies(&self) -> PrerequisiteStages {
            Vec::new()
        }
    }

    fn unruly() -> StageHandle {
        Arc::new(Unruly { id: StageId::new() })
    }

    fn mock(name: &str, log: &CallLog) -> StageHandle {
        Stage::shared(MockTask::new(name).with_log(log.clone()))
    }

    #[test]
    fn test_runs_dependencies_then_substages_in_order() {
        let log = CallLog::new();
        let root = CompositeStage::new("root");
        root.add_dependency(mock("dep1", &log));
        root.add_dependency(mock("dep2", &log));
        root.add_substage(mock("child1", &log));
        root.add_substage(mock("child2", &log));

        let result = root.execute(&ExecutionContext::new());

        assert_eq!(result.status(), StageStatus::Completed);
        assert_eq!(
            log.runs(),
            vec!["dep1", "dep2", "child1", "child2"]
        );
        let children = result.payload().and_then(StagePayload::as_children).unwrap();
        let names: Vec<_> = children.iter().map(StageResult::stage_name).collect();
        assert_eq!(names, vec!["child1", "child2"]);
    }

    #[test]
    fn test_failed_dependency_stops_everything() {
        let log = CallLog::new();
        let root = CompositeStage::new("root");
        root.add_dependency(Stage::shared(MockTask::new("dep1").with_log(log.clone()).failing("no broker")));
        root.add_dependency(mock("dep2", &log));
        let child = mock("child", &log);
        root.add_substage(child.clone());

        let result = root.execute(&ExecutionContext::new());

        assert_eq!(result.status(), StageStatus::Failed);
        assert_eq!(result.error().map(StageError::stage), Some("dep1"));
        assert_eq!(log.runs(), vec!["dep1"]);
        assert_eq!(child.status(), StageStatus::Pending);
    }

    #[test]
    fn test_failed_substage_is_fail_fast() {
        let log = CallLog::new();
        let root = CompositeStage::new("root");
        root.add_substage(mock("first", &log));
        root.add_substage(Stage::shared(MockTask::new("second").with_log(log.clone()).failing("bad payload")));
        let third = mock("third", &log);
        root.add_substage(third.clone());

        let result = root.execute(&ExecutionContext::new());

        assert_eq!(result.status(), StageStatus::Failed);
        assert_eq!(
            result.error(),
            Some(&StageError::execution("second", "bad payload"))
        );
        assert_eq!(log.runs(), vec!["first", "second"]);
        assert_eq!(third.status(), StageStatus::Pending);
        assert_eq!(root.status(), StageStatus::Failed);
    }

    #[test]
    fn test_panicking_substage_fails_composite() {
        let root = CompositeStage::new("root");
        root.add_substage(Stage::shared(MockTask::new("wild").panicking("unexpected state")));

        let result = root.execute(&ExecutionContext::new());

        assert_eq!(result.status(), StageStatus::Failed);
        assert_eq!(result.error().map(StageError::kind), Some("panicked"));
    }

    #[test]
    fn test_panicking_command_fails_composite() {
        let log = CallLog::new();
        let observer = Arc::new(RecordingObserver::new());
        let root = CompositeStage::new("root");
        root.add_observer(observer.clone());
        root.add_substage(unruly());
        let after = mock("after", &log);
        root.add_substage(after.clone());
        let ctx = ExecutionContext::new();

        let result = root.execute(&ctx);

        assert_eq!(result.status(), StageStatus::Failed);
        assert_eq!(
            result.error(),
            Some(&StageError::panicked("unruly", "custom stage blew up"))
        );
        assert_eq!(root.status(), StageStatus::Failed);
        assert_eq!(
            observer.statuses_for("root"),
            vec![StageStatus::Running, StageStatus::Failed]
        );
        assert!(log.runs().is_empty());
        assert_eq!(after.status(), StageStatus::Pending);
        assert_eq!(ctx.record().len(), 1);
    }

    #[test]
    fn test_panicking_teardown_aborts_with_error() {
        let log = CallLog::new();
        let root = CompositeStage::new("root");
        root.add_substage(mock("first", &log));
        root.add_substage(unruly());
        let results = Arc::new(MemoryResultLog::new());
        let ctx = ExecutionContext::new().with_result_log(results.clone());

        let err = root.teardown(&ctx).unwrap_err();

        assert_eq!(err, StageError::teardown("unruly", "custom cleanup blew up"));
        assert!(log.cleanups().is_empty());
        assert!(results.contains("Error tearing down stage unruly"));
        assert!(results.contains("Error during workflow teardown"));
        assert_ne!(root.status(), StageStatus::Skipped);
    }

    #[test]
    fn test_empty_composite_completes() {
        let root = CompositeStage::new("root");
        let result = root.execute(&ExecutionContext::new());
        assert_eq!(result.status(), StageStatus::Completed);
        assert_eq!(
            result.payload().and_then(StagePayload::as_children).map(<[_]>::len),
            Some(0)
        );
    }

    #[test]
    fn test_teardown_reverse_order() {
        let log = CallLog::new();
        let root = CompositeStage::new("root");
        root.add_dependency(mock("dep1", &log));
        root.add_dependency(mock("dep2", &log));
        root.add_substage(mock("child1", &log));
        root.add_substage(mock("child2", &log));
        let results = Arc::new(MemoryResultLog::new());
        let ctx = ExecutionContext::new().with_result_log(results.clone());

        root.teardown(&ctx).unwrap();

        assert_eq!(log.cleanups(), vec!["child2", "child1", "dep2", "dep1"]);
        assert_eq!(root.status(), StageStatus::Skipped);
        assert_eq!(
            results.lines(),
            vec![
                "Stage child2 torn down successfully",
                "Stage child1 torn down successfully",
                "Dependency dep2 torn down successfully",
                "Dependency dep1 torn down successfully",
                "Workflow root torn down successfully",
            ]
        );
    }

    #[test]
    fn test_teardown_failure_aborts() {
        let log = CallLog::new();
        let root = CompositeStage::new("root");
        root.add_dependency(mock("dep", &log));
        root.add_substage(mock("child1", &log));
        root.add_substage(Stage::shared(
            MockTask::new("child2").with_log(log.clone()).failing_cleanup("socket stuck"),
        ));
        let results = Arc::new(MemoryResultLog::new());
        let ctx = ExecutionContext::new().with_result_log(results.clone());

        let err = root.teardown(&ctx).unwrap_err();

        assert_eq!(err, StageError::teardown("child2", "socket stuck"));
        assert_eq!(log.cleanups(), vec!["child2"]);
        assert!(results.contains("Error tearing down stage child2"));
        assert_eq!(
            results.lines().last().map(String::as_str),
            Some("Error during workflow teardown: Stage 'child2' teardown failed: socket stuck")
        );
        assert!(!results.contains("Workflow root torn down successfully"));
        assert_ne!(root.status(), StageStatus::Skipped);
    }

    #[test]
    fn test_optional_teardown_failure_is_swallowed() {
        let log = CallLog::new();
        let root = CompositeStage::new("root");
        root.add_substage(mock("child1", &log));
        root.add_substage(Stage::shared(
            MockTask::new("metrics")
                .with_log(log.clone())
                .optional()
                .failing_cleanup("exporter gone"),
        ));
        let results = Arc::new(MemoryResultLog::new());
        let ctx = ExecutionContext::new().with_result_log(results.clone());

        root.teardown(&ctx).unwrap();

        assert_eq!(log.cleanups(), vec!["metrics", "child1"]);
        assert!(results.contains("Error tearing down stage metrics"));
        assert!(results.contains("Workflow root torn down successfully"));
    }

    #[test]
    fn test_observer_sees_composite_transitions() {
        let observer = Arc::new(RecordingObserver::new());
        let root = CompositeStage::new("root");
        root.add_observer(observer.clone());
        root.add_substage(Stage::shared(MockTask::new("a")));

        root.execute(&ExecutionContext::new());

        assert_eq!(
            observer.statuses_for("root"),
            vec![StageStatus::Running, StageStatus::Completed]
        );
    }
}

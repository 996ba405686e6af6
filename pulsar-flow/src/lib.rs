//! # Pulsar Flow
//!
//! A synchronous stage-orchestration engine for message-broker test suites.
//!
//! Pulsar Flow runs named stages in dependency order and reports every status
//! change to observers. It provides:
//!
//! - **Stage lifecycle**: `Pending → Running → Completed | Failed`, with
//!   `Skipped` after teardown
//! - **Composite stages**: fail-fast execution and reverse-order teardown
//! - **Workflow building**: an incrementally built DAG that cannot express
//!   cycles
//! - **Stage discovery**: definition files ordered with Kahn's algorithm
//! - **Collaborator injection**: loggers, producers and metrics sinks handed
//!   to each stage through a [`StageFactory`](registry::StageFactory)
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use pulsar_flow::prelude::*;
//!
//! let mut builder = WorkflowBuilder::default();
//! builder
//!     .add_task(ConnectTask::new(), &[])?
//!     .add_task(SendMessagesTask::new(), &["connect"])?;
//!
//! let workflow = builder.build();
//! let ctx = ExecutionContext::new().with_param("num_messages", json!(10));
//! let result = workflow.execute(&ctx);
//! workflow.teardown(&ctx)?;
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod collaborators;
pub mod context;
pub mod core;
pub mod errors;
pub mod loader;
pub mod observability;
pub mod observer;
pub mod registry;
pub mod stages;
pub mod testing;
pub mod workflow;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::collaborators::{
        CollaboratorKind, Collaborators, InMemoryMetrics, InMemoryProducer, Logger, Metrics,
        Producer, RequiredCollaborators, TracingLogger,
    };
    pub use crate::context::{ExecutionContext, MemoryResultLog, ResultLog, TracingResultLog};
    pub use crate::core::{describe_stages, StageMetadata, StagePayload, StageResult, StageStatus};
    pub use crate::errors::{
        CycleDetectedError, DependencyError, LoaderError, PulsarError, StageError, WorkflowError,
    };
    pub use crate::loader::{load_stage_modules, LoaderConfig, StageDefinition, StageLoader};
    pub use crate::observability::{init_tracing, LogFormat};
    pub use crate::observer::{FnObserver, LoggingObserver, MetricsObserver, StageObserver};
    pub use crate::registry::{CollaboratorHandle, StageFactory};
    pub use crate::stages::{
        CompositeStage, FnTask, PrerequisiteStages, Stage, StageCommand, StageHandle, StageId,
        StageTask,
    };
    pub use crate::workflow::WorkflowBuilder;
}

//! Workflow construction.
//!
//! [`WorkflowBuilder`] assembles stages into a root [`CompositeStage`](crate::stages::CompositeStage),
//! resolving each declared dependency against stages registered earlier.

mod builder;

pub use builder::{WorkflowBuilder, DEFAULT_WORKFLOW_NAME};

mod integration_tests;

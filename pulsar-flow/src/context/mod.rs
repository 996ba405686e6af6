//! Execution context for stage runs.
//!
//! This module provides:
//! - The per-run [`ExecutionContext`] (environment, parameters, result sink)
//! - The [`ExecutionRecord`] that keeps each stage to one run per context
//! - Result sinks implementing [`ResultLog`]

mod execution;
mod record;
mod result_log;

pub use execution::ExecutionContext;
pub use record::ExecutionRecord;
pub use result_log::{MemoryResultLog, ResultLog, TracingResultLog};

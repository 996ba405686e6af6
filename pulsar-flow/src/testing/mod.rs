//! Testing utilities for pulsar-flow workflows.
//!
//! This module provides:
//! - Mock tasks and a shared call log
//! - A recording observer
//! - Assertions for stage results

mod assertions;
mod mocks;
mod observers;

pub use assertions::{
    assert_children, assert_failed_by, assert_result_failed, assert_result_status,
    assert_result_succeeded,
};
pub use mocks::{CallLog, MockTask};
pub use observers::RecordingObserver;

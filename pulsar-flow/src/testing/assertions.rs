//! Test assertions for stage results.

use crate::core::{StageResult, StageStatus};

/// Asserts that the result indicates success.
pub fn assert_result_succeeded(result: &StageResult) {
    assert!(
        result.is_success(),
        "Expected success for stage '{}', got status: {:?} (error: {:?})",
        result.stage_name(),
        result.status(),
        result.error()
    );
}

/// Asserts that the result indicates failure.
pub fn assert_result_failed(result: &StageResult) {
    assert!(
        result.is_failed(),
        "Expected failure for stage '{}', got status: {:?}",
        result.stage_name(),
        result.status()
    );
}

/// Asserts that the result has the expected status.
pub fn assert_result_status(result: &StageResult, expected: StageStatus) {
    assert_eq!(
        result.status(),
        expected,
        "Expected status {:?} for stage '{}', got {:?}",
        expected,
        result.stage_name(),
        result.status()
    );
}

/// Asserts that a failed result was caused by `stage`.
pub fn assert_failed_by(result: &StageResult, stage: &str) {
    assert_result_failed(result);
    let culprit = result.error().map(crate::errors::StageError::stage);
    assert_eq!(
        culprit,
        Some(stage),
        "Expected failure caused by '{}', got {:?}",
        stage,
        result.error()
    );
}

/// Asserts that a composite result holds children named `expected`, in order.
pub fn assert_children(result: &StageResult, expected: &[&str]) {
    let names: Vec<&str> = result
        .payload()
        .and_then(|p| p.as_children())
        .map(|children| children.iter().map(StageResult::stage_name).collect())
        .unwrap_or_default();
    assert_eq!(
        names, expected,
        "Unexpected children for stage '{}'",
        result.stage_name()
    );
}

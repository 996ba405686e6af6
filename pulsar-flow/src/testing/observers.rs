//! Observers that record what they see.

use parking_lot::Mutex;

use crate::core::{StageResult, StageStatus};
use crate::observer::StageObserver;

/// An observer keeping every result it receives, in delivery order.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    results: Mutex<Vec<StageResult>>,
}

impl RecordingObserver {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all recorded results.
    #[must_use]
    pub fn results(&self) -> Vec<StageResult> {
        self.results.lock().clone()
    }

    /// Returns `(stage, status)` pairs in delivery order.
    #[must_use]
    pub fn events(&self) -> Vec<(String, StageStatus)> {
        self.results
            .lock()
            .iter()
            .map(|r| (r.stage_name().to_string(), r.status()))
            .collect()
    }

    /// Returns the statuses recorded for one stage.
    #[must_use]
    pub fn statuses_for(&self, stage: &str) -> Vec<StageStatus> {
        self.results
            .lock()
            .iter()
            .filter(|r| r.stage_name() == stage)
            .map(StageResult::status)
            .collect()
    }

    /// Returns the number of recorded results.
    #[must_use]
    pub fn count(&self) -> usize {
        self.results.lock().len()
    }

    /// Clears recorded results.
    pub fn clear(&self) {
        self.results.lock().clear();
    }
}

impl StageObserver for RecordingObserver {
    fn update(&self, result: &StageResult) {
        self.results.lock().push(result.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_observer() {
        let observer = RecordingObserver::new();
        observer.update(&StageResult::new("a", StageStatus::Running));
        observer.update(&StageResult::new("b", StageStatus::Running));
        observer.update(&StageResult::new("a", StageStatus::Completed));

        assert_eq!(observer.count(), 3);
        assert_eq!(
            observer.statuses_for("a"),
            vec![StageStatus::Running, StageStatus::Completed]
        );
        assert_eq!(observer.events()[1], ("b".to_string(), StageStatus::Running));

        observer.clear();
        assert_eq!(observer.count(), 0);
    }
}

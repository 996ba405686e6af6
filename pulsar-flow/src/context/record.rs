//! Record of the stages executed during one run.

use crate::core::StageResult;
use crate::stages::StageId;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};

/// Tracks which stages started and finished in one execution context.
///
/// Keyed by [`StageId`], so two stages that happen to share a name are
/// still told apart.
#[derive(Debug, Default)]
pub struct ExecutionRecord {
    running: Mutex<HashSet<StageId>>,
    finished: Mutex<HashMap<StageId, StageResult>>,
}

impl ExecutionRecord {
    /// Creates an empty record.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the recorded result for `id`, if it finished.
    #[must_use]
    pub fn get(&self, id: StageId) -> Option<StageResult> {
        self.finished.lock().get(&id).cloned()
    }

    /// Marks `id` as running. Returns false if it already was.
    pub fn begin(&self, id: StageId) -> bool {
        self.running.lock().insert(id)
    }

    /// Stores the final result for `id`.
    pub fn finish(&self, id: StageId, result: StageResult) {
        self.running.lock().remove(&id);
        self.finished.lock().insert(id, result);
    }

    /// Returns true if `id` finished in this run.
    #[must_use]
    pub fn contains(&self, id: StageId) -> bool {
        self.finished.lock().contains_key(&id)
    }

    /// Returns the number of finished stages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.finished.lock().len()
    }

    /// Returns true if nothing finished yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.finished.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::StageStatus;

    #[test]
    fn test_begin_twice_is_rejected() {
        let record = ExecutionRecord::new();
        let id = StageId::new();

        assert!(record.begin(id));
        assert!(!record.begin(id));

        record.finish(id, StageResult::new("a", StageStatus::Completed));
        assert!(record.contains(id));
        assert!(record.begin(id));
    }

    #[test]
    fn test_get_returns_finished_result() {
        let record = ExecutionRecord::new();
        let id = StageId::new();
        assert!(record.get(id).is_none());
        assert!(record.is_empty());

        record.finish(id, StageResult::new("a", StageStatus::Failed));
        assert_eq!(record.get(id).map(|r| r.status()), Some(StageStatus::Failed));
        assert_eq!(record.len(), 1);
    }
}

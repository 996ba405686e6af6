//! Wall-clock timing of stage runs.

use crate::collaborators::Metrics;
use std::time::Instant;
use tracing::debug;

/// Measures how long one stage or workflow takes.
#[derive(Debug)]
pub struct StageTimer {
    start: Instant,
    stage: String,
}

impl StageTimer {
    /// Starts timing `stage`.
    #[must_use]
    pub fn start(stage: impl Into<String>) -> Self {
        Self {
            start: Instant::now(),
            stage: stage.into(),
        }
    }

    /// Returns the elapsed time in milliseconds.
    #[must_use]
    pub fn elapsed_ms(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1000.0
    }

    /// Returns the stage name.
    #[must_use]
    pub fn stage(&self) -> &str {
        &self.stage
    }

    /// Stops the timer, logs the duration and returns it.
    pub fn finish(self) -> f64 {
        let duration_ms = self.elapsed_ms();
        debug!(stage = %self.stage, duration_ms, "Stage timing");
        duration_ms
    }

    /// Stops the timer and records the duration as latency of `stage`.
    pub fn finish_into(self, metrics: &dyn Metrics) -> f64 {
        let stage = self.stage.clone();
        let duration_ms = self.finish();
        metrics.record_latency(duration_ms, &stage);
        duration_ms
    }
}

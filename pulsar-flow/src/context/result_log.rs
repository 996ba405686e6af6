//! Result sinks that receive human-readable progress lines.

use parking_lot::Mutex;
use tracing::info;

/// A sink exposing `log(message)`, typically a test report.
pub trait ResultLog: Send + Sync {
    /// Appends one line.
    fn log(&self, message: &str);
}

/// Writes result lines through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingResultLog;

impl ResultLog for TracingResultLog {
    fn log(&self, message: &str) {
        info!(target: "pulsar_flow::result", "{}", message);
    }
}

/// Keeps result lines in memory.
#[derive(Debug, Default)]
pub struct MemoryResultLog {
    lines: Mutex<Vec<String>>,
}

impl MemoryResultLog {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns every line logged so far.
    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().clone()
    }

    /// Returns true if any line contains `needle`.
    #[must_use]
    pub fn contains(&self, needle: &str) -> bool {
        self.lines.lock().iter().any(|line| line.contains(needle))
    }
}

impl ResultLog for MemoryResultLog {
    fn log(&self, message: &str) {
        self.lines.lock().push(message.to_string());
    }
}

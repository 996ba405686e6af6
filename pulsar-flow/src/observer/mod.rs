//! Observers notified on every stage status transition.
//!
//! Observers are polymorphic over a single capability, accepting a
//! [`StageResult`], so arbitrary sinks can be attached without touching stage
//! code.

use crate::collaborators::{Logger, Metrics};
use crate::core::StageResult;
use parking_lot::RwLock;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tracing::error;

/// A listener for stage status changes.
pub trait StageObserver: Send + Sync {
    /// Handles one status update.
    fn update(&self, result: &StageResult);
}

/// Ordered list of observers attached to one stage.
///
/// Delivery order is registration order. A panicking observer is logged and
/// the remaining observers still receive the update.
#[derive(Default)]
pub struct ObserverList {
    observers: RwLock<Vec<Arc<dyn StageObserver>>>,
}

impl fmt::Debug for ObserverList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObserverList")
            .field("count", &self.len())
            .finish()
    }
}

impl ObserverList {
    /// Creates an empty list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an observer.
    pub fn add(&self, observer: Arc<dyn StageObserver>) {
        self.observers.write().push(observer);
    }

    /// Returns the number of observers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.observers.read().len()
    }

    /// Returns true if no observers are attached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.observers.read().is_empty()
    }

    /// Delivers `result` to every observer.
    pub fn notify(&self, result: &StageResult) {
        // Clone the list so observers may register further observers.
        let observers: Vec<Arc<dyn StageObserver>> = self.observers.read().clone();
        for observer in observers {
            let delivered = catch_unwind(AssertUnwindSafe(|| observer.update(result)));
            if let Err(panic) = delivered {
                error!(
                    stage = %result.stage_name(),
                    status = %result.status(),
                    panic = %panic_message(panic.as_ref()),
                    "Observer panicked while handling stage update"
                );
            }
        }
    }
}

/// Renders a panic payload as text.
pub(crate) fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = panic.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Writes each status change to a [`Logger`].
pub struct LoggingObserver {
    logger: Arc<dyn Logger>,
}

impl LoggingObserver {
    /// Creates an observer writing to `logger`.
    #[must_use]
    pub fn new(logger: Arc<dyn Logger>) -> Self {
        Self { logger }
    }
}

impl fmt::Debug for LoggingObserver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoggingObserver").finish_non_exhaustive()
    }
}

impl StageObserver for LoggingObserver {
    fn update(&self, result: &StageResult) {
        self.logger.info(&format!(
            "Stage {} status changed to {}",
            result.stage_name(),
            result.status()
        ));
        if let Some(err) = result.error() {
            self.logger
                .error(&format!("Stage {} failed: {}", result.stage_name(), err));
        }
    }
}

/// Forwards each status change to a [`Metrics`] sink.
pub struct MetricsObserver {
    metrics: Arc<dyn Metrics>,
}

impl MetricsObserver {
    /// Creates an observer recording into `metrics`.
    #[must_use]
    pub fn new(metrics: Arc<dyn Metrics>) -> Self {
        Self { metrics }
    }
}

impl fmt::Debug for MetricsObserver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetricsObserver").finish_non_exhaustive()
    }
}

impl StageObserver for MetricsObserver {
    fn update(&self, result: &StageResult) {
        self.metrics
            .record_stage_status(result.stage_name(), result.status());
    }
}

/// Adapts a closure into an observer.
pub struct FnObserver<F>
where
    F: Fn(&StageResult) + Send + Sync,
{
    func: F,
}

impl<F> FnObserver<F>
where
    F: Fn(&StageResult) + Send + Sync,
{
    /// Wraps `func`.
    pub const fn new(func: F) -> Self {
        Self { func }
    }
}

impl<F> StageObserver for FnObserver<F>
where
    F: Fn(&StageResult) + Send + Sync,
{
    fn update(&self, result: &StageResult) {
        (self.func)(result);
    }
}

//! In-process collaborator implementations.

use super::{Collaborator, CollaboratorKind, Logger, Metrics, Producer};
use crate::core::StageStatus;
use crate::errors::CollaboratorError;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, error, info, warn};

/// A logger that forwards to the `tracing` framework.
#[derive(Debug, Clone, Default)]
pub struct TracingLogger;

impl TracingLogger {
    /// Creates a new tracing logger.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Collaborator for TracingLogger {
    fn is_available(&self) -> bool {
        true
    }
}

impl Logger for TracingLogger {
    fn info(&self, msg: &str) {
        info!("{}", msg);
    }

    fn error(&self, msg: &str) {
        error!("{}", msg);
    }

    fn debug(&self, msg: &str) {
        debug!("{}", msg);
    }

    fn warning(&self, msg: &str) {
        warn!("{}", msg);
    }
}

/// A producer that keeps sent messages in memory.
///
/// Starts disconnected; sending before [`Producer::connect`] fails.
#[derive(Debug, Default)]
pub struct InMemoryProducer {
    connected: AtomicBool,
    sent: Mutex<Vec<String>>,
}

impl InMemoryProducer {
    /// Creates a disconnected producer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true while connected.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Returns every message sent so far.
    #[must_use]
    pub fn sent_messages(&self) -> Vec<String> {
        self.sent.lock().clone()
    }
}

impl Collaborator for InMemoryProducer {
    fn is_available(&self) -> bool {
        true
    }
}

impl Producer for InMemoryProducer {
    fn connect(&self) {
        self.connected.store(true, Ordering::SeqCst);
    }

    fn disconnect(&self) {
        self.connected.store(false, Ordering::SeqCst);
    }

    fn send_message(&self, msg: &str) -> Result<(), CollaboratorError> {
        if !self.is_connected() {
            return Err(CollaboratorError::new(
                CollaboratorKind::Producer,
                "Producer not connected",
            ));
        }
        debug!(message = %msg, "Sending message");
        self.sent.lock().push(msg.to_string());
        Ok(())
    }
}

/// A metrics sink with namespaced in-memory counters.
#[derive(Debug)]
pub struct InMemoryMetrics {
    namespace: String,
    values: Mutex<HashMap<String, f64>>,
}

impl Default for InMemoryMetrics {
    fn default() -> Self {
        Self::new("pulsar")
    }
}

impl InMemoryMetrics {
    /// Creates a sink whose metric names start with `namespace`.
    #[must_use]
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            values: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the namespace.
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Returns a copy of every recorded metric.
    #[must_use]
    pub fn snapshot(&self) -> HashMap<String, f64> {
        self.values.lock().clone()
    }
}

impl Collaborator for InMemoryMetrics {
    fn is_available(&self) -> bool {
        true
    }
}

impl Metrics for InMemoryMetrics {
    fn record_send(&self, value: f64) {
        let name = format!("{}.messages.sent", self.namespace);
        let mut values = self.values.lock();
        let total = values.entry(name.clone()).or_insert(0.0);
        *total += value;
        debug!(metric = %name, value = *total, "Recording metric");
    }

    fn record_latency(&self, value: f64, operation: &str) {
        let name = format!("{}.latency.{}", self.namespace, operation);
        debug!(metric = %name, value_ms = value, "Recording latency");
        self.values.lock().insert(name, value);
    }

    fn record_stage_status(&self, stage: &str, status: StageStatus) {
        let name = format!("{}.stages.{}.{}", self.namespace, stage, status);
        *self.values.lock().entry(name).or_insert(0.0) += 1.0;
    }

    fn metric(&self, name: &str) -> f64 {
        self.values.lock().get(name).copied().unwrap_or(0.0)
    }
}

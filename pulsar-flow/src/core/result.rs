//! Immutable stage result snapshots.

use super::StageStatus;
use crate::errors::StageError;
use chrono::{DateTime, Utc};
use std::collections::HashMap;

/// The output carried by a [`StageResult`].
#[derive(Debug, Clone, PartialEq)]
pub enum StagePayload {
    /// The value produced by a leaf stage's run.
    Value(serde_json::Value),
    /// The ordered results of a composite's children.
    Children(Vec<StageResult>),
}

impl StagePayload {
    /// Returns the leaf value, if this is one.
    #[must_use]
    pub const fn as_value(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Value(value) => Some(value),
            Self::Children(_) => None,
        }
    }

    /// Returns the child results, if this is a composite payload.
    #[must_use]
    pub fn as_children(&self) -> Option<&[StageResult]> {
        match self {
            Self::Children(children) => Some(children),
            Self::Value(_) => None,
        }
    }

    fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Value(value) => value.clone(),
            Self::Children(children) => {
                serde_json::Value::Array(children.iter().map(StageResult::to_json).collect())
            }
        }
    }
}

/// A snapshot of one stage status observation.
///
/// Produced every time a stage changes status and handed to observers.
/// There are no setters: the `with_*` methods consume the value while it is
/// being assembled, after which it is only read.
#[derive(Debug, Clone, PartialEq)]
pub struct StageResult {
    stage_name: String,
    status: StageStatus,
    payload: Option<StagePayload>,
    error: Option<StageError>,
    metadata: HashMap<String, serde_json::Value>,
    observed_at: DateTime<Utc>,
}

impl StageResult {
    /// Creates a result with no payload, error or metadata.
    #[must_use]
    pub fn new(stage_name: impl Into<String>, status: StageStatus) -> Self {
        Self {
            stage_name: stage_name.into(),
            status,
            payload: None,
            error: None,
            metadata: HashMap::new(),
            observed_at: Utc::now(),
        }
    }

    /// Creates a completed result carrying a value.
    #[must_use]
    pub fn completed(stage_name: impl Into<String>, value: serde_json::Value) -> Self {
        Self::new(stage_name, StageStatus::Completed).with_payload(StagePayload::Value(value))
    }

    /// Creates a failed result carrying an error.
    #[must_use]
    pub fn failed(stage_name: impl Into<String>, error: StageError) -> Self {
        Self::new(stage_name, StageStatus::Failed).with_error(error)
    }

    /// Attaches a payload.
    #[must_use]
    pub fn with_payload(mut self, payload: StagePayload) -> Self {
        self.payload = Some(payload);
        self
    }

    /// Attaches an error.
    #[must_use]
    pub fn with_error(mut self, error: StageError) -> Self {
        self.error = Some(error);
        self
    }

    /// Replaces the metadata map.
    #[must_use]
    pub fn with_metadata(mut self, metadata: HashMap<String, serde_json::Value>) -> Self {
        self.metadata = metadata;
        self
    }

    /// Adds a single metadata entry.
    #[must_use]
    pub fn with_metadata_entry(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Returns the stage name.
    #[must_use]
    pub fn stage_name(&self) -> &str {
        &self.stage_name
    }

    /// Returns the observed status.
    #[must_use]
    pub const fn status(&self) -> StageStatus {
        self.status
    }

    /// Returns the payload, if any.
    #[must_use]
    pub const fn payload(&self) -> Option<&StagePayload> {
        self.payload.as_ref()
    }

    /// Returns the error, if any.
    #[must_use]
    pub const fn error(&self) -> Option<&StageError> {
        self.error.as_ref()
    }

    /// Returns the metadata map.
    #[must_use]
    pub const fn metadata(&self) -> &HashMap<String, serde_json::Value> {
        &self.metadata
    }

    /// Returns when the observation was made.
    #[must_use]
    pub const fn observed_at(&self) -> DateTime<Utc> {
        self.observed_at
    }

    /// Returns true if the stage completed.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Returns true if the stage failed.
    #[must_use]
    pub const fn is_failed(&self) -> bool {
        self.status.is_failure()
    }

    /// Renders the result as JSON for logs and reports.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        let mut map = serde_json::Map::new();
        map.insert("stage".to_string(), serde_json::json!(self.stage_name));
        map.insert("status".to_string(), serde_json::json!(self.status));
        map.insert(
            "observed_at".to_string(),
            serde_json::json!(self.observed_at.to_rfc3339()),
        );
        if let Some(ref payload) = self.payload {
            map.insert("result".to_string(), payload.to_json());
        }
        if let Some(ref error) = self.error {
            map.insert("error".to_string(), serde_json::json!(error.to_string()));
        }
        if !self.metadata.is_empty() {
            let metadata: serde_json::Map<String, serde_json::Value> = self
                .metadata
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect();
            map.insert("metadata".to_string(), serde_json::Value::Object(metadata));
        }
        serde_json::Value::Object(map)
    }
}

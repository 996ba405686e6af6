//! Core value types shared by every part of the engine:
//! - Stage status enum
//! - Immutable stage result snapshots
//! - Descriptive stage metadata

mod metadata;
mod result;
mod status;

pub use metadata::{describe_stages, StageMetadata};
pub use result::{StagePayload, StageResult};
pub use status::StageStatus;

//! Wire contract shared by every stage of the classification pipeline.
//!
//! The orchestrator threads each stage's JSON result into the next stage's
//! input. Those boundaries are not wrapped consistently, so every stage after
//! the first goes through [`normalize`] before touching the payload.

mod envelope;
mod outcome;
mod payload;

use strum_macros::{AsRefStr, Display, EnumIter, EnumString};

pub use envelope::{normalize, Envelope, PayloadError, StageInput};
pub use outcome::{max_confidence, FilterOutcome, RejectReason, Rejection};
pub use payload::{ImagePayload, StorageLocator};

/// Stable names the orchestrator uses to address a stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, AsRefStr, EnumIter)]
#[strum(serialize_all = "kebab-case")]
pub enum StageName {
    FetchEncode,
    Classify,
    ThresholdFilter,
}

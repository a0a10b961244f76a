use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::envelope::Envelope;
use crate::payload::ImagePayload;

/// Business-rule rejections. The display text is what the orchestrator sees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum RejectReason {
    #[error("THRESHOLD_CONFIDENCE_NOT_MET")]
    ThresholdConfidenceNotMet,
}

/// `{error}` object returned (not raised) on the reject path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rejection {
    pub error: String,
}

impl From<RejectReason> for Rejection {
    fn from(reason: RejectReason) -> Self {
        Self {
            error: reason.to_string(),
        }
    }
}

/// Result of the confidence gate. Hard failures are carried by the caller's
/// `Result`, not here.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterOutcome {
    Accepted(ImagePayload),
    Rejected(RejectReason),
}

impl FilterOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, FilterOutcome::Accepted(_))
    }

    /// Flattens into the shape the orchestrator understands: an envelope
    /// with the payload as JSON text, or a bare `{error}` with no status code.
    pub fn into_response(self) -> Result<Value, serde_json::Error> {
        match self {
            FilterOutcome::Accepted(payload) => {
                serde_json::to_value(Envelope::ok(serde_json::to_string(&payload)?))
            }
            FilterOutcome::Rejected(reason) => serde_json::to_value(Rejection::from(reason)),
        }
    }
}

/// Highest score in the vector, or `None` when it is empty. NaN entries
/// never beat a real number.
pub fn max_confidence(scores: &[f64]) -> Option<f64> {
    scores.iter().copied().reduce(f64::max)
}

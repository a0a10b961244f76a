use async_trait::async_trait;
use pipeline_types::{
    max_confidence, normalize, FilterOutcome, ImagePayload, RejectReason, StageName,
};
use serde_json::Value;

use super::{InvocationContext, Stage, StageError};

/// Lets a classification through only when its best score reaches the
/// threshold.
pub struct ThresholdFilter {
    threshold: f64,
}

impl ThresholdFilter {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    pub fn evaluate(&self, payload: ImagePayload) -> Result<FilterOutcome, StageError> {
        let scores = payload.confidence_vector()?;
        let top = max_confidence(&scores).ok_or(StageError::EmptyConfidenceVector)?;

        if top >= self.threshold {
            log::info!(
                "Accepted {}: confidence {} >= {}",
                payload.locator(),
                top,
                self.threshold
            );
            Ok(FilterOutcome::Accepted(payload))
        } else {
            log::info!(
                "Rejected {}: confidence {} < {}",
                payload.locator(),
                top,
                self.threshold
            );
            Ok(FilterOutcome::Rejected(RejectReason::ThresholdConfidenceNotMet))
        }
    }
}

#[async_trait]
impl Stage for ThresholdFilter {
    fn name(&self) -> StageName {
        StageName::ThresholdFilter
    }

    async fn invoke(&self, event: Value, ctx: &InvocationContext) -> Result<Value, StageError> {
        let payload = normalize(event)?;
        log::info!("[{}] {} received {}", ctx.request_id, ctx.stage, payload.locator());

        self.evaluate(payload)?
            .into_response()
            .map_err(StageError::Encode)
    }
}

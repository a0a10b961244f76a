use std::sync::Arc;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use pipeline_types::{normalize, Envelope, ImagePayload, StageName};
use serde_json::Value;

use super::{InvocationContext, Stage, StageError};
use crate::inference::{parse_confidence_vector, ContentTypePolicy, InferenceEndpoint};

/// Sends the decoded image to the inference endpoint and records the
/// confidence vector it returns.
pub struct Classify {
    endpoint: Arc<dyn InferenceEndpoint>,
    content_type: ContentTypePolicy,
}

impl Classify {
    pub fn new(endpoint: Arc<dyn InferenceEndpoint>, content_type: ContentTypePolicy) -> Self {
        Self {
            endpoint,
            content_type,
        }
    }

    pub async fn run(&self, payload: ImagePayload) -> Result<ImagePayload, StageError> {
        let image = STANDARD.decode(payload.image_data.as_bytes())?;
        let content_type = self.content_type.resolve(&image);

        let body = self.endpoint.invoke(&image, content_type).await?;
        let scores = parse_confidence_vector(&body)?;
        log::info!(
            "Endpoint '{}' scored {} ({} classes)",
            self.endpoint.name(),
            payload.locator(),
            scores.len()
        );
        log::debug!("Confidence vector: {:?}", scores);

        Ok(payload.with_inferences(scores))
    }
}

#[async_trait]
impl Stage for Classify {
    fn name(&self) -> StageName {
        StageName::Classify
    }

    async fn invoke(&self, event: Value, ctx: &InvocationContext) -> Result<Value, StageError> {
        let payload = normalize(event)?;
        log::info!("[{}] {} received {}", ctx.request_id, ctx.stage, payload.locator());

        let payload = self.run(payload).await?;
        let body = serde_json::to_string(&payload).map_err(StageError::Encode)?;
        serde_json::to_value(Envelope::ok(body)).map_err(StageError::Encode)
    }
}

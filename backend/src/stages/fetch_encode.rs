use std::sync::Arc;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use pipeline_types::{Envelope, ImagePayload, PayloadError, StageName, StorageLocator};
use serde_json::Value;
use sha2::{Digest, Sha256};

use super::{InvocationContext, Stage, StageError};
use crate::storage::ObjectStore;

/// Resolves a storage locator to bytes and hands them on as base64 text.
pub struct FetchEncode {
    store: Arc<dyn ObjectStore>,
}

impl FetchEncode {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }

    pub async fn run(&self, locator: StorageLocator) -> Result<Envelope<ImagePayload>, StageError> {
        let bytes = self.store.fetch(&locator).await?;
        log::info!(
            "Fetched {} ({} bytes, sha256 {})",
            locator,
            bytes.len(),
            image_digest(&bytes)
        );

        let image_data = STANDARD.encode(&bytes);
        Ok(Envelope::ok(ImagePayload::new(locator, image_data)))
    }
}

fn image_digest(image_data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(image_data);
    hex::encode(hasher.finalize())
}

#[async_trait]
impl Stage for FetchEncode {
    fn name(&self) -> StageName {
        StageName::FetchEncode
    }

    async fn invoke(&self, event: Value, ctx: &InvocationContext) -> Result<Value, StageError> {
        let locator: StorageLocator = serde_json::from_value(event).map_err(PayloadError::from)?;
        log::info!("[{}] {} requested {}", ctx.request_id, ctx.stage, locator);

        let envelope = self.run(locator).await?;
        serde_json::to_value(envelope).map_err(StageError::Encode)
    }
}

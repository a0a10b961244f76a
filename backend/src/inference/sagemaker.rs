use async_trait::async_trait;
use aws_sdk_sagemakerruntime::error::DisplayErrorContext;
use aws_sdk_sagemakerruntime::primitives::Blob;
use aws_sdk_sagemakerruntime::Client;

use super::{InferenceEndpoint, InferenceError};

#[derive(Clone)]
pub struct SageMakerEndpoint {
    client: Client,
    endpoint_name: String,
}

impl SageMakerEndpoint {
    pub fn new(client: Client, endpoint_name: String) -> Self {
        Self {
            client,
            endpoint_name,
        }
    }
}

#[async_trait]
impl InferenceEndpoint for SageMakerEndpoint {
    fn name(&self) -> &str {
        &self.endpoint_name
    }

    async fn invoke(&self, image: &[u8], content_type: &str) -> Result<Vec<u8>, InferenceError> {
        log::debug!(
            "Invoking endpoint '{}' with {} bytes ({})",
            self.endpoint_name,
            image.len(),
            content_type
        );

        let response = self
            .client
            .invoke_endpoint()
            .endpoint_name(&self.endpoint_name)
            .content_type(content_type)
            .accept("application/json")
            .body(Blob::new(image.to_vec()))
            .send()
            .await
            .map_err(|e| {
                log::error!(
                    "Endpoint '{}' invocation failed: {:?}",
                    self.endpoint_name,
                    e
                );
                InferenceError::Endpoint(DisplayErrorContext(&e).to_string())
            })?;

        let body = response.body().ok_or(InferenceError::EmptyResponse)?;
        Ok(body.as_ref().to_vec())
    }
}

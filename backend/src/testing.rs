//! In-process stand-ins for object storage and the inference endpoint.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use pipeline_types::StorageLocator;

use crate::inference::{InferenceEndpoint, InferenceError};
use crate::storage::{ObjectStore, StorageError};

#[derive(Default)]
pub struct InMemoryObjectStore {
    objects: HashMap<(String, String), Vec<u8>>,
}

impl InMemoryObjectStore {
    pub fn with_object(mut self, bucket: &str, key: &str, bytes: &[u8]) -> Self {
        self.objects
            .insert((bucket.to_string(), key.to_string()), bytes.to_vec());
        self
    }
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    async fn fetch(&self, locator: &StorageLocator) -> Result<Vec<u8>, StorageError> {
        self.objects
            .get(&(locator.s3_bucket.clone(), locator.s3_key.clone()))
            .cloned()
            .ok_or_else(|| StorageError::NotFound {
                bucket: locator.s3_bucket.clone(),
                key: locator.s3_key.clone(),
            })
    }
}

/// Answers every call with the same body (or failure) and remembers what it
/// was sent.
pub struct ScriptedEndpoint {
    response: Result<Vec<u8>, String>,
    calls: Mutex<Vec<(Vec<u8>, String)>>,
}

impl ScriptedEndpoint {
    pub fn responding(body: &str) -> Self {
        Self {
            response: Ok(body.as_bytes().to_vec()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            response: Err(message.to_string()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// `(image bytes, content type)` for every invocation so far.
    pub fn calls(&self) -> Vec<(Vec<u8>, String)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl InferenceEndpoint for ScriptedEndpoint {
    fn name(&self) -> &str {
        "scripted-endpoint"
    }

    async fn invoke(&self, image: &[u8], content_type: &str) -> Result<Vec<u8>, InferenceError> {
        self.calls
            .lock()
            .unwrap()
            .push((image.to_vec(), content_type.to_string()));
        self.response.clone().map_err(InferenceError::Endpoint)
    }
}

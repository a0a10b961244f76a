//! The three pipeline stages and the registry the invocation boundary
//! dispatches through.
//!
//! Each stage is stateless: it takes the orchestrator's JSON event plus an
//! [`InvocationContext`] and returns the JSON the orchestrator threads into
//! the next stage.

pub mod classify;
pub mod fetch_encode;
pub mod threshold_filter;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use pipeline_types::{PayloadError, StageName};
use serde_json::Value;
use strum::IntoEnumIterator;

use crate::config::PipelineConfig;
use crate::inference::{InferenceEndpoint, InferenceError};
use crate::storage::{ObjectStore, StorageError};

pub use classify::Classify;
pub use fetch_encode::FetchEncode;
pub use threshold_filter::ThresholdFilter;

#[derive(Debug, thiserror::Error)]
pub enum StageError {
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Inference(#[from] InferenceError),
    #[error(transparent)]
    Payload(#[from] PayloadError),
    #[error("image_data is not valid base64: {0}")]
    InvalidImageData(#[from] base64::DecodeError),
    #[error("inferences is empty, nothing to compare against the threshold")]
    EmptyConfidenceVector,
    #[error("failed to encode stage result: {0}")]
    Encode(#[source] serde_json::Error),
}

impl StageError {
    /// Stable name reported to the orchestrator alongside the message.
    pub fn error_type(&self) -> &'static str {
        match self {
            StageError::Storage(StorageError::NotFound { .. }) => "ObjectNotFound",
            StageError::Storage(_) => "StorageError",
            StageError::Inference(_) => "InferenceError",
            StageError::Payload(_) => "PayloadError",
            StageError::InvalidImageData(_) => "InvalidImageData",
            StageError::EmptyConfidenceVector => "EmptyConfidenceVector",
            StageError::Encode(_) => "EncodeError",
        }
    }
}

/// Per-invocation metadata from the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationContext {
    pub request_id: String,
    pub stage: StageName,
}

impl InvocationContext {
    pub fn new(request_id: impl Into<String>, stage: StageName) -> Self {
        Self {
            request_id: request_id.into(),
            stage,
        }
    }
}

#[async_trait]
pub trait Stage: Send + Sync {
    fn name(&self) -> StageName;

    async fn invoke(&self, event: Value, ctx: &InvocationContext) -> Result<Value, StageError>;
}

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("stage '{0}' is already registered")]
    AlreadyRegistered(StageName),
}

/// Stage name -> stage. Built once at startup, read-only afterwards.
#[derive(Clone, Default)]
pub struct StageRegistry {
    stages: HashMap<StageName, Arc<dyn Stage>>,
}

impl StageRegistry {
    pub fn new() -> Self {
        Self {
            stages: HashMap::new(),
        }
    }

    /// All three stages wired to the given collaborators.
    pub fn standard(
        store: Arc<dyn ObjectStore>,
        endpoint: Arc<dyn InferenceEndpoint>,
        config: &PipelineConfig,
    ) -> Result<Self, RegistryError> {
        let mut registry = Self::new();
        registry.register(Arc::new(FetchEncode::new(store)))?;
        registry.register(Arc::new(Classify::new(
            endpoint,
            config.content_type_policy(),
        )))?;
        registry.register(Arc::new(ThresholdFilter::new(config.threshold)))?;
        Ok(registry)
    }

    pub fn register(&mut self, stage: Arc<dyn Stage>) -> Result<(), RegistryError> {
        let name = stage.name();
        if self.stages.contains_key(&name) {
            return Err(RegistryError::AlreadyRegistered(name));
        }
        self.stages.insert(name, stage);
        Ok(())
    }

    pub fn get(&self, name: StageName) -> Option<Arc<dyn Stage>> {
        self.stages.get(&name).cloned()
    }

    /// Registered names in pipeline order.
    pub fn names(&self) -> Vec<StageName> {
        StageName::iter()
            .filter(|name| self.stages.contains_key(name))
            .collect()
    }
}

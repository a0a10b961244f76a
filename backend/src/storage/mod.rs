pub mod s3_service;

use async_trait::async_trait;
use pipeline_types::StorageLocator;

pub use s3_service::{S3ObjectStore, StorageError};

/// Read side of object storage: the only thing fetch-encode needs.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn fetch(&self, locator: &StorageLocator) -> Result<Vec<u8>, StorageError>;
}

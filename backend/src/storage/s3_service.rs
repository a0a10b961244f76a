use std::path::{Path, PathBuf};

use async_trait::async_trait;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use pipeline_types::StorageLocator;
use tokio::io::AsyncWriteExt;

use super::ObjectStore;

#[derive(Clone)]
pub struct S3ObjectStore {
    client: Client,
    scratch_dir: PathBuf,
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("object not found: s3://{bucket}/{key}")]
    NotFound { bucket: String, key: String },
    #[error("S3 error: {0}")]
    S3(String),
    #[error("scratch buffer error: {0}")]
    Scratch(#[from] std::io::Error),
}

impl S3ObjectStore {
    pub fn new(client: Client, scratch_dir: PathBuf) -> Self {
        Self {
            client,
            scratch_dir,
        }
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn fetch(&self, locator: &StorageLocator) -> Result<Vec<u8>, StorageError> {
        log::debug!("Downloading {}", locator);
        let result = self
            .client
            .get_object()
            .bucket(&locator.s3_bucket)
            .key(&locator.s3_key)
            .send()
            .await
            .map_err(|e| match e.as_service_error() {
                Some(err) if err.is_no_such_key() => StorageError::NotFound {
                    bucket: locator.s3_bucket.clone(),
                    key: locator.s3_key.clone(),
                },
                _ => StorageError::S3(DisplayErrorContext(&e).to_string()),
            })?;

        spool_to_scratch(result.body, &self.scratch_dir).await
    }
}

/// Streams an object body through a uniquely named file in `scratch_dir` and
/// returns its contents. The file is gone by the time this returns, whether
/// or not the download succeeded.
pub async fn spool_to_scratch(
    mut body: ByteStream,
    scratch_dir: &Path,
) -> Result<Vec<u8>, StorageError> {
    let scratch = tempfile::Builder::new()
        .prefix("fetch-")
        .suffix(".img")
        .tempfile_in(scratch_dir)?;
    let mut file = tokio::fs::File::from_std(scratch.reopen()?);

    while let Some(chunk) = body
        .try_next()
        .await
        .map_err(|e| StorageError::S3(e.to_string()))?
    {
        file.write_all(&chunk).await?;
    }
    file.flush().await?;
    drop(file);

    let bytes = tokio::fs::read(scratch.path()).await?;
    log::debug!(
        "Spooled {} bytes through {}",
        bytes.len(),
        scratch.path().display()
    );
    Ok(bytes)
}

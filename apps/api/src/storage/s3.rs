use std::time::Duration;

use async_trait::async_trait;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client as S3Client;
use bytes::Bytes;
use tracing::info;

use super::{ArtifactStore, StorageError};

/// Artifact store backed by one S3 (or MinIO) bucket.
#[derive(Clone)]
pub struct S3ArtifactStore {
    client: S3Client,
    bucket: String,
}

impl S3ArtifactStore {
    pub fn new(client: S3Client, bucket: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
        }
    }
}

#[async_trait]
impl ArtifactStore for S3ArtifactStore {
    async fn put(&self, key: &str, bytes: Bytes, content_type: &str) -> Result<(), StorageError> {
        let size = bytes.len();
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(bytes))
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| StorageError::S3(format!("upload failed: {}", DisplayErrorContext(&e))))?;

        info!("Uploaded {size} bytes to s3://{}/{}", self.bucket, key);
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Bytes, StorageError> {
        let output = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                let no_such_key = e
                    .as_service_error()
                    .map(|se| se.is_no_such_key())
                    .unwrap_or(false);
                if no_such_key {
                    StorageError::NotFound(key.to_string())
                } else {
                    StorageError::S3(format!("download failed: {}", DisplayErrorContext(&e)))
                }
            })?;

        let data = output
            .body
            .collect()
            .await
            .map_err(|e| StorageError::S3(format!("reading {key} failed: {e}")))?;
        Ok(data.into_bytes())
    }

    async fn presign(
        &self,
        key: &str,
        filename: &str,
        ttl: Duration,
    ) -> Result<String, StorageError> {
        let config =
            PresigningConfig::expires_in(ttl).map_err(|e| StorageError::Presign(e.to_string()))?;

        let request = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .response_content_disposition(format!("attachment; filename=\"{filename}\""))
            .presigned(config)
            .await
            .map_err(|e| StorageError::Presign(format!("{}", DisplayErrorContext(&e))))?;

        Ok(request.uri().to_string())
    }
}

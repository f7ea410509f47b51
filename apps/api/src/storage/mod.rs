//! Artifact and upload storage.

#[cfg(test)]
pub mod memory;
pub mod s3;

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;
use uuid::Uuid;

use crate::models::job::OutputFormat;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("object not found: {0}")]
    NotFound(String),

    #[error("S3 error: {0}")]
    S3(String),

    #[error("presign error: {0}")]
    Presign(String),
}

#[async_trait]
pub trait ArtifactStore: Send + Sync {
    async fn put(&self, key: &str, bytes: Bytes, content_type: &str) -> Result<(), StorageError>;

    async fn get(&self, key: &str) -> Result<Bytes, StorageError>;

    /// Time-limited download URL that serves the object as an attachment named `filename`.
    async fn presign(
        &self,
        key: &str,
        filename: &str,
        ttl: Duration,
    ) -> Result<String, StorageError>;
}

/// `{userId}/{jobId}/original`
pub fn upload_key(user_id: &str, job_id: Uuid) -> String {
    format!("{user_id}/{job_id}/original")
}

/// `{userId}/{jobId}/{format}`
pub fn artifact_key(user_id: &str, job_id: Uuid, format: OutputFormat) -> String {
    format!("{user_id}/{job_id}/{format}")
}

/// `{userId}/{jobId}/cover-letter/{format}`
pub fn cover_letter_key(user_id: &str, job_id: Uuid, format: OutputFormat) -> String {
    format!("{user_id}/{job_id}/cover-letter/{format}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_are_deterministic() {
        let job_id = Uuid::parse_str("6f1c2a9e-0000-4000-8000-000000000001").unwrap();
        assert_eq!(
            artifact_key("u1", job_id, OutputFormat::Pdf),
            "u1/6f1c2a9e-0000-4000-8000-000000000001/pdf"
        );
        assert_eq!(
            cover_letter_key("u1", job_id, OutputFormat::Word),
            "u1/6f1c2a9e-0000-4000-8000-000000000001/cover-letter/word"
        );
        assert_eq!(
            upload_key("u1", job_id),
            "u1/6f1c2a9e-0000-4000-8000-000000000001/original"
        );
    }
}

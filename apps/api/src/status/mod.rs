//! Durable, externally pollable job status.
//!
//! All writes for one job go through a single [`JobStatusWriter`] owned by the
//! orchestrator running that job. Stores refuse to overwrite a terminal record.

#[cfg(test)]
pub mod memory;
pub mod postgres;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use crate::models::job::{JobStatus, ResultPayload, StatusRecord};

#[derive(Debug, Error)]
pub enum StatusError {
    #[error("job {0} is unknown or already terminal")]
    NotWritable(Uuid),

    #[error("illegal status transition {from} -> {to} for job {job_id}")]
    IllegalTransition {
        job_id: Uuid,
        from: &'static str,
        to: &'static str,
    },

    #[error("corrupt status record: {0}")]
    Corrupt(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[async_trait]
pub trait StatusStore: Send + Sync {
    /// Inserts the initial record. Re-creating an existing job is a no-op.
    async fn create(&self, record: &StatusRecord) -> Result<(), StatusError>;

    /// Replaces a non-terminal record; fails with [`StatusError::NotWritable`]
    /// when the stored record is missing or terminal.
    async fn update(&self, record: &StatusRecord) -> Result<(), StatusError>;

    async fn get(&self, job_id: Uuid) -> Result<Option<StatusRecord>, StatusError>;
}

/// Writes the SUBMITTED record for a freshly accepted job.
pub async fn submit(
    store: &dyn StatusStore,
    job_id: Uuid,
    user_id: &str,
    message: &str,
) -> Result<StatusRecord, StatusError> {
    let record = StatusRecord::new(job_id, user_id, JobStatus::Submitted, message);
    store.create(&record).await?;
    info!(job_id = %job_id, status = "SUBMITTED", "Job status written");
    Ok(record)
}

/// Single writer for one job's status record.
pub struct JobStatusWriter {
    store: Arc<dyn StatusStore>,
    job_id: Uuid,
    user_id: String,
    current: JobStatus,
}

impl JobStatusWriter {
    /// Writer for a job whose SUBMITTED record already exists.
    pub fn new(store: Arc<dyn StatusStore>, job_id: Uuid, user_id: impl Into<String>) -> Self {
        Self {
            store,
            job_id,
            user_id: user_id.into(),
            current: JobStatus::Submitted,
        }
    }

    pub fn current(&self) -> JobStatus {
        self.current
    }

    pub async fn progress(&mut self, message: impl Into<String>) -> Result<(), StatusError> {
        let record = StatusRecord::new(self.job_id, &self.user_id, JobStatus::Processing, message);
        self.write(record).await
    }

    pub async fn complete(
        &mut self,
        message: impl Into<String>,
        payload: ResultPayload,
    ) -> Result<(), StatusError> {
        let mut record =
            StatusRecord::new(self.job_id, &self.user_id, JobStatus::Completed, message);
        record.result_payload = Some(payload);
        self.write(record).await
    }

    pub async fn fail(
        &mut self,
        code: &str,
        message: impl Into<String>,
    ) -> Result<(), StatusError> {
        let mut record = StatusRecord::new(self.job_id, &self.user_id, JobStatus::Failed, message);
        record.error_code = Some(code.to_string());
        self.write(record).await
    }

    async fn write(&mut self, record: StatusRecord) -> Result<(), StatusError> {
        if !self.current.can_transition_to(record.status) {
            return Err(StatusError::IllegalTransition {
                job_id: self.job_id,
                from: self.current.as_str(),
                to: record.status.as_str(),
            });
        }

        self.store.update(&record).await?;
        self.current = record.status;
        info!(
            job_id = %self.job_id,
            status = record.status.as_str(),
            message = %record.message,
            "Job status written"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::memory::MemoryStatusStore;
    use super::*;

    fn payload() -> ResultPayload {
        ResultPayload {
            artifacts: Vec::new(),
            artifact_url: "memory://a".to_string(),
            content_type: "application/pdf".to_string(),
            filename: "optimized_resume_12345678.pdf".to_string(),
            model_used: "Claude 3 Haiku".to_string(),
            cost_estimate_usd: 0.001,
            extraction_strategy: "pdf-extract".to_string(),
            recovery_strategy: "whole_text".to_string(),
            degraded: false,
            cover_letter: None,
            skills_processing_summary: None,
            ats_score: None,
            preview: String::new(),
        }
    }

    async fn submitted() -> (Arc<MemoryStatusStore>, JobStatusWriter, Uuid) {
        let store = Arc::new(MemoryStatusStore::default());
        let job_id = Uuid::new_v4();
        submit(store.as_ref(), job_id, "u1", "Job submitted").await.unwrap();
        let writer = JobStatusWriter::new(store.clone(), job_id, "u1");
        (store, writer, job_id)
    }

    #[tokio::test]
    async fn test_lifecycle_to_completed() {
        let (store, mut writer, job_id) = submitted().await;

        writer.progress("Extracting text").await.unwrap();
        writer.progress("Invoking model").await.unwrap();
        writer.complete("done", payload()).await.unwrap();

        let record = store.get(job_id).await.unwrap().unwrap();
        assert_eq!(record.status, JobStatus::Completed);
        assert!(record.result_payload.is_some());
        assert_eq!(writer.current(), JobStatus::Completed);
    }

    #[tokio::test]
    async fn test_terminal_record_is_immutable() {
        let (store, mut writer, job_id) = submitted().await;
        writer.fail("CORRUPTED", "unreadable").await.unwrap();

        let err = writer.progress("late").await.unwrap_err();
        assert!(matches!(err, StatusError::IllegalTransition { .. }));

        // A second writer cannot overwrite it either.
        let mut rogue = JobStatusWriter::new(store.clone(), job_id, "u1");
        let err = rogue.progress("late").await.unwrap_err();
        assert!(matches!(err, StatusError::NotWritable(_)));

        let record = store.get(job_id).await.unwrap().unwrap();
        assert_eq!(record.status, JobStatus::Failed);
        assert_eq!(record.error_code.as_deref(), Some("CORRUPTED"));
    }

    #[tokio::test]
    async fn test_cannot_complete_without_processing() {
        let (_store, mut writer, _) = submitted().await;
        let err = writer.complete("done", payload()).await.unwrap_err();
        assert!(matches!(err, StatusError::IllegalTransition { from: "SUBMITTED", .. }));
    }

    #[tokio::test]
    async fn test_repeated_reads_are_identical() {
        let (store, mut writer, job_id) = submitted().await;
        writer.progress("working").await.unwrap();
        writer.complete("done", payload()).await.unwrap();

        let first = store.get(job_id).await.unwrap();
        for _ in 0..3 {
            assert_eq!(store.get(job_id).await.unwrap(), first);
        }
    }
}

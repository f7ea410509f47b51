use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::{StatusError, StatusStore};
use crate::models::job::{JobStatusRow, StatusRecord};

/// Status store over the `job_status` table.
#[derive(Clone)]
pub struct PgStatusStore {
    pool: PgPool,
}

impl PgStatusStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn payload_json(record: &StatusRecord) -> Result<Option<serde_json::Value>, StatusError> {
    Ok(record
        .result_payload
        .as_ref()
        .map(serde_json::to_value)
        .transpose()?)
}

#[async_trait]
impl StatusStore for PgStatusStore {
    async fn create(&self, record: &StatusRecord) -> Result<(), StatusError> {
        sqlx::query(
            r#"
            INSERT INTO job_status
                (job_id, user_id, status, message, error_code, result_payload, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (job_id) DO NOTHING
            "#,
        )
        .bind(record.job_id)
        .bind(&record.user_id)
        .bind(record.status.as_str())
        .bind(&record.message)
        .bind(&record.error_code)
        .bind(payload_json(record)?)
        .bind(record.timestamp)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update(&self, record: &StatusRecord) -> Result<(), StatusError> {
        let result = sqlx::query(
            r#"
            UPDATE job_status
            SET status = $2, message = $3, error_code = $4, result_payload = $5, updated_at = $6
            WHERE job_id = $1 AND status NOT IN ('COMPLETED', 'FAILED')
            "#,
        )
        .bind(record.job_id)
        .bind(record.status.as_str())
        .bind(&record.message)
        .bind(&record.error_code)
        .bind(payload_json(record)?)
        .bind(record.timestamp)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StatusError::NotWritable(record.job_id));
        }
        Ok(())
    }

    async fn get(&self, job_id: Uuid) -> Result<Option<StatusRecord>, StatusError> {
        let row = sqlx::query_as::<_, JobStatusRow>(
            r#"
            SELECT job_id, user_id, status, message, error_code, result_payload, updated_at
            FROM job_status
            WHERE job_id = $1
            "#,
        )
        .bind(job_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(StatusRecord::try_from)
            .transpose()
            .map_err(StatusError::Corrupt)
    }
}

use anyhow::Result;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;

/// Creates and returns a PostgreSQL connection pool.
pub async fn create_pool(database_url: &str) -> Result<PgPool> {
    info!("Connecting to PostgreSQL...");

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await?;

    info!("PostgreSQL connection pool established");
    Ok(pool)
}

/// Creates the `job_status` table when it does not exist yet.
pub async fn ensure_schema(pool: &PgPool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS job_status (
            job_id         UUID PRIMARY KEY,
            user_id        TEXT NOT NULL,
            status         TEXT NOT NULL
                CHECK (status IN ('SUBMITTED', 'PROCESSING', 'COMPLETED', 'FAILED')),
            message        TEXT NOT NULL,
            error_code     TEXT,
            result_payload JSONB,
            updated_at     TIMESTAMPTZ NOT NULL DEFAULT now()
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS job_status_user_id_idx ON job_status (user_id)")
        .execute(pool)
        .await?;

    info!("job_status schema ready");
    Ok(())
}

use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::Redirect,
    Json,
};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::intake::validation::{decode_resume, JobFields};
use crate::models::job::{Job, JobStatus, OutputFormat, StatusRecord};
use crate::pipeline::find_artifact;
use crate::state::AppState;
use crate::status::submit;

/// JSON intake body: the base64 resume plus the shared text fields.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobRequest {
    #[serde(default)]
    pub resume: Option<String>,
    #[serde(flatten)]
    pub fields: JobFields,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobAccepted {
    pub job_id: Uuid,
    pub status: JobStatus,
    pub message: String,
}

#[derive(Deserialize)]
pub struct DownloadQuery {
    pub format: Option<String>,
    pub kind: Option<String>,
}

/// POST /api/v1/jobs
pub async fn handle_create_job(
    State(state): State<AppState>,
    Json(req): Json<JobRequest>,
) -> Result<(StatusCode, Json<JobAccepted>), AppError> {
    let resume = decode_resume(req.resume.as_deref().unwrap_or_default())?;
    let job = req.fields.into_job(&resume)?;
    accept(&state, job, Bytes::from(resume)).await
}

/// POST /api/v1/jobs/upload
pub async fn handle_upload_job(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<JobAccepted>), AppError> {
    let mut fields = JobFields::default();
    let mut resume = Bytes::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(e.body_text()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        if name == "resume" {
            if fields.resume_file_name.is_none() {
                fields.resume_file_name = field.file_name().map(str::to_string);
            }
            resume = field
                .bytes()
                .await
                .map_err(|e| AppError::Validation(e.body_text()))?;
        } else {
            let value = field
                .text()
                .await
                .map_err(|e| AppError::Validation(e.body_text()))?;
            fields.set(&name, value);
        }
    }

    let job = fields.into_job(&resume)?;
    accept(&state, job, resume).await
}

/// Stores the upload, writes SUBMITTED and hands the job to a background task.
async fn accept(
    state: &AppState,
    job: Job,
    resume: Bytes,
) -> Result<(StatusCode, Json<JobAccepted>), AppError> {
    state
        .artifacts
        .put(&job.resume_key, resume, "application/octet-stream")
        .await?;
    let record = submit(
        state.status.as_ref(),
        job.job_id,
        &job.user_id,
        "Job submitted for processing",
    )
    .await?;

    info!(
        job_id = %job.job_id,
        user_id = %job.user_id,
        formats = ?job.output_formats,
        cover_letter = job.generate_cover_letter,
        "Job accepted"
    );

    let orchestrator = state.orchestrator.clone();
    tokio::spawn(async move {
        orchestrator.run(job).await;
    });

    Ok((
        StatusCode::ACCEPTED,
        Json(JobAccepted {
            job_id: record.job_id,
            status: record.status,
            message: record.message,
        }),
    ))
}

async fn load_record(state: &AppState, job_id: Uuid) -> Result<StatusRecord, AppError> {
    state
        .status
        .get(job_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Job not found".to_string()))
}

/// GET /api/v1/jobs/:job_id/status
pub async fn handle_job_status(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> Result<Json<StatusRecord>, AppError> {
    Ok(Json(load_record(&state, job_id).await?))
}

/// GET /api/v1/jobs/:job_id/download
pub async fn handle_download(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
    Query(params): Query<DownloadQuery>,
) -> Result<Redirect, AppError> {
    let record = load_record(&state, job_id).await?;
    if record.status != JobStatus::Completed {
        return Err(AppError::Conflict(format!(
            "Job is {}; downloads are available once it completes",
            record.status.as_str()
        )));
    }
    let payload = record
        .result_payload
        .ok_or_else(|| AppError::Conflict("Job has no stored result".to_string()))?;

    let format = match params.format.as_deref() {
        Some(value) => Some(
            OutputFormat::parse(value)
                .ok_or_else(|| AppError::Validation(format!("Unsupported format '{value}'")))?,
        ),
        None => None,
    };

    let artifact = match params.kind.as_deref().unwrap_or("resume") {
        "resume" => find_artifact(&payload, format),
        "cover-letter" => payload
            .cover_letter
            .as_ref()
            .filter(|a| format.map_or(true, |f| a.format == f)),
        other => return Err(AppError::Validation(format!("Unknown artifact kind '{other}'"))),
    }
    .ok_or_else(|| AppError::Conflict("Requested artifact was not produced for this job".to_string()))?;

    let url = state
        .artifacts
        .presign(
            &artifact.storage_key,
            &artifact.filename,
            state.orchestrator.artifact_url_ttl(),
        )
        .await?;
    Ok(Redirect::temporary(&url))
}

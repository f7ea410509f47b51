use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

// ────────────────────────────────────────────────────────────────────────────
// Job
// ────────────────────────────────────────────────────────────────────────────

/// A renderable output format. `dual` on the wire expands to `[Pdf, Word]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Pdf,
    Word,
    Text,
}

impl OutputFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Pdf => "pdf",
            OutputFormat::Word => "word",
            OutputFormat::Text => "text",
        }
    }

    /// Parses a single format name as sent by clients (`docx` and `txt` are aliases).
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pdf" => Some(OutputFormat::Pdf),
            "word" | "docx" | "doc" => Some(OutputFormat::Word),
            "text" | "txt" => Some(OutputFormat::Text),
            _ => None,
        }
    }

    /// Parses a requested format list. `dual` means PDF + Word.
    pub fn parse_request(value: &str) -> Option<Vec<Self>> {
        if value.trim().eq_ignore_ascii_case("dual") {
            return Some(vec![OutputFormat::Pdf, OutputFormat::Word]);
        }
        Self::parse(value).map(|format| vec![format])
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An accepted optimization request. Created at intake and never mutated afterwards;
/// the pipeline only reads from it.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub job_id: Uuid,
    pub user_id: String,
    /// Storage key of the uploaded resume.
    pub resume_key: String,
    pub resume_file_name: Option<String>,
    pub job_title: String,
    pub job_description: Option<String>,
    pub job_url: Option<String>,
    pub company_name: Option<String>,
    pub output_formats: Vec<OutputFormat>,
    pub cover_letter_format: OutputFormat,
    pub generate_cover_letter: bool,
    pub created_at: DateTime<Utc>,
}

impl Job {
    /// First eight characters of the job id, used in download filenames.
    pub fn short_id(&self) -> String {
        self.job_id.simple().to_string()[..8].to_string()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Status
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Submitted,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Submitted => "SUBMITTED",
            JobStatus::Processing => "PROCESSING",
            JobStatus::Completed => "COMPLETED",
            JobStatus::Failed => "FAILED",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "SUBMITTED" => Some(JobStatus::Submitted),
            "PROCESSING" => Some(JobStatus::Processing),
            "COMPLETED" => Some(JobStatus::Completed),
            "FAILED" => Some(JobStatus::Failed),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    /// Forward-only transitions. PROCESSING -> PROCESSING carries progress messages.
    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        match (self, next) {
            (JobStatus::Submitted, JobStatus::Processing | JobStatus::Failed) => true,
            (
                JobStatus::Processing,
                JobStatus::Processing | JobStatus::Completed | JobStatus::Failed,
            ) => true,
            _ => false,
        }
    }
}

/// The externally pollable record for one job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusRecord {
    pub job_id: Uuid,
    pub user_id: String,
    pub status: JobStatus,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_payload: Option<ResultPayload>,
}

impl StatusRecord {
    pub fn new(job_id: Uuid, user_id: &str, status: JobStatus, message: impl Into<String>) -> Self {
        Self {
            job_id,
            user_id: user_id.to_string(),
            status,
            message: message.into(),
            timestamp: Utc::now(),
            error_code: None,
            result_payload: None,
        }
    }
}

/// A persisted, downloadable artifact as reported to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactSummary {
    pub format: OutputFormat,
    pub storage_key: String,
    pub url: String,
    pub content_type: String,
    pub filename: String,
    /// Renderer that produced the bytes (primary or fallback).
    pub renderer: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AtsScore {
    pub overall: u8,
    pub keywords: u8,
    pub skills: u8,
    pub experience: u8,
    pub format: u8,
}

/// Payload attached to a COMPLETED status record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultPayload {
    pub artifacts: Vec<ArtifactSummary>,
    /// URL of the first artifact, kept for single-format clients.
    pub artifact_url: String,
    pub content_type: String,
    pub filename: String,
    pub model_used: String,
    pub cost_estimate_usd: f64,
    pub extraction_strategy: String,
    /// Which recovery strategy turned the model answer into a resume.
    pub recovery_strategy: String,
    /// Set when at least one requested format failed to render.
    pub degraded: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_letter: Option<ArtifactSummary>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skills_processing_summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ats_score: Option<AtsScore>,
    pub preview: String,
}

// ────────────────────────────────────────────────────────────────────────────
// Database rows
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, FromRow)]
pub struct JobStatusRow {
    pub job_id: Uuid,
    pub user_id: String,
    pub status: String,
    pub message: String,
    pub error_code: Option<String>,
    pub result_payload: Option<Value>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<JobStatusRow> for StatusRecord {
    type Error = String;

    fn try_from(row: JobStatusRow) -> Result<Self, Self::Error> {
        let status = JobStatus::parse(&row.status)
            .ok_or_else(|| format!("unknown status '{}' for job {}", row.status, row.job_id))?;
        let result_payload = row
            .result_payload
            .map(serde_json::from_value::<ResultPayload>)
            .transpose()
            .map_err(|e| format!("malformed result payload for job {}: {e}", row.job_id))?;

        Ok(StatusRecord {
            job_id: row.job_id,
            user_id: row.user_id,
            status,
            message: row.message,
            timestamp: row.updated_at,
            error_code: row.error_code,
            result_payload,
        })
    }
}

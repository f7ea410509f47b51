use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use crate::models::job::{Job, OutputFormat};
use crate::pipeline::PipelineError;
use crate::storage::upload_key;

/// Largest accepted resume upload.
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;
/// Limit for `jobTitle` and `companyName`.
pub const MAX_FIELD_CHARS: usize = 100;
/// Owner recorded when a request carries no `userId`.
pub const DEFAULT_USER_ID: &str = "anonymous";

/// Text fields shared by the JSON and multipart intake endpoints.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobFields {
    pub user_id: Option<String>,
    pub resume_file_name: Option<String>,
    pub job_title: Option<String>,
    pub job_description: Option<String>,
    pub job_url: Option<String>,
    pub company_name: Option<String>,
    pub output_format: Option<String>,
    pub cover_letter_format: Option<String>,
    #[serde(default)]
    pub generate_cover_letter: bool,
}

impl JobFields {
    /// Assigns a multipart text field by its form name. Unknown names are ignored.
    pub fn set(&mut self, name: &str, value: String) {
        match name {
            "userId" => self.user_id = Some(value),
            "resumeFileName" => self.resume_file_name = Some(value),
            "jobTitle" => self.job_title = Some(value),
            "jobDescription" => self.job_description = Some(value),
            "jobUrl" => self.job_url = Some(value),
            "companyName" => self.company_name = Some(value),
            "outputFormat" => self.output_format = Some(value),
            "coverLetterFormat" => self.cover_letter_format = Some(value),
            "generateCoverLetter" => {
                self.generate_cover_letter =
                    matches!(value.trim().to_ascii_lowercase().as_str(), "true" | "1" | "on" | "yes")
            }
            _ => {}
        }
    }

    /// Validates the request and builds the immutable job. `resume` is the
    /// decoded upload.
    pub fn into_job(self, resume: &[u8]) -> Result<Job, PipelineError> {
        if resume.is_empty() {
            return Err(invalid("Resume file is required"));
        }
        if resume.len() > MAX_UPLOAD_BYTES {
            return Err(invalid(format!(
                "Resume file exceeds the {} MB limit",
                MAX_UPLOAD_BYTES / (1024 * 1024)
            )));
        }

        let job_title = present(self.job_title).ok_or_else(|| invalid("Job title is required"))?;
        if job_title.chars().count() > MAX_FIELD_CHARS {
            return Err(invalid(format!(
                "Job title must be at most {MAX_FIELD_CHARS} characters"
            )));
        }

        let company_name = present(self.company_name);
        if let Some(company) = &company_name {
            if company.chars().count() > MAX_FIELD_CHARS {
                return Err(invalid(format!(
                    "Company name must be at most {MAX_FIELD_CHARS} characters"
                )));
            }
        }
        if self.generate_cover_letter && company_name.is_none() {
            return Err(invalid("Company name is required when generating a cover letter"));
        }

        let output_formats = match present(self.output_format) {
            Some(value) => OutputFormat::parse_request(&value).ok_or_else(|| {
                invalid(format!(
                    "Unsupported output format '{value}'. Use pdf, docx, txt or dual"
                ))
            })?,
            None => vec![OutputFormat::Pdf],
        };
        let cover_letter_format = match present(self.cover_letter_format) {
            Some(value) => OutputFormat::parse(&value).ok_or_else(|| {
                invalid(format!(
                    "Unsupported cover letter format '{value}'. Use pdf, docx or txt"
                ))
            })?,
            None => OutputFormat::Pdf,
        };

        let job_url = present(self.job_url);
        if let Some(url) = &job_url {
            check_url(url)?;
        }

        let job_id = Uuid::new_v4();
        let user_id = present(self.user_id).unwrap_or_else(|| DEFAULT_USER_ID.to_string());
        Ok(Job {
            job_id,
            resume_key: upload_key(&user_id, job_id),
            user_id,
            resume_file_name: present(self.resume_file_name),
            job_title,
            job_description: present(self.job_description),
            job_url,
            company_name,
            output_formats,
            cover_letter_format,
            generate_cover_letter: self.generate_cover_letter,
            created_at: Utc::now(),
        })
    }
}

/// Decodes a base64 resume, accepting a `data:<mime>;base64,` prefix and
/// embedded whitespace.
pub fn decode_resume(encoded: &str) -> Result<Vec<u8>, PipelineError> {
    let payload = match encoded.trim().strip_prefix("data:") {
        Some(rest) => rest
            .split_once(',')
            .map(|(_, data)| data)
            .ok_or_else(|| invalid("Malformed data URL for resume"))?,
        None => encoded,
    };
    let compact: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
    if compact.is_empty() {
        return Err(invalid("Resume file is required"));
    }
    STANDARD
        .decode(compact.as_bytes())
        .map_err(|e| invalid(format!("Resume is not valid base64: {e}")))
}

fn check_url(value: &str) -> Result<(), PipelineError> {
    let url = reqwest::Url::parse(value).map_err(|_| invalid(format!("Invalid job URL '{value}'")))?;
    match url.scheme() {
        "http" | "https" if url.host_str().is_some() => Ok(()),
        _ => Err(invalid("Job URL must use http or https")),
    }
}

fn present(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn invalid(message: impl Into<String>) -> PipelineError {
    PipelineError::Validation(message.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields() -> JobFields {
        JobFields {
            job_title: Some("Data Engineer".to_string()),
            ..JobFields::default()
        }
    }

    fn message(err: PipelineError) -> String {
        match err {
            PipelineError::Validation(msg) => msg,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_minimal_request_defaults() {
        let job = fields().into_job(b"resume").unwrap();
        assert_eq!(job.user_id, DEFAULT_USER_ID);
        assert_eq!(job.output_formats, vec![OutputFormat::Pdf]);
        assert_eq!(job.cover_letter_format, OutputFormat::Pdf);
        assert_eq!(job.resume_key, format!("anonymous/{}/original", job.job_id));
        assert!(!job.generate_cover_letter);
    }

    #[test]
    fn test_dual_format() {
        let mut f = fields();
        f.output_format = Some("Dual".to_string());
        let job = f.into_job(b"resume").unwrap();
        assert_eq!(job.output_formats, vec![OutputFormat::Pdf, OutputFormat::Word]);
    }

    #[test]
    fn test_rejects_missing_title_and_empty_upload() {
        let err = JobFields::default().into_job(b"resume").unwrap_err();
        assert_eq!(message(err), "Job title is required");

        let err = fields().into_job(b"").unwrap_err();
        assert_eq!(message(err), "Resume file is required");
    }

    #[test]
    fn test_rejects_oversized_upload() {
        let big = vec![0u8; MAX_UPLOAD_BYTES + 1];
        assert!(message(fields().into_job(&big).unwrap_err()).contains("10 MB"));
    }

    #[test]
    fn test_field_length_limits() {
        let mut f = fields();
        f.job_title = Some("x".repeat(101));
        assert!(message(f.into_job(b"r").unwrap_err()).contains("at most 100"));

        let mut f = fields();
        f.job_title = Some("é".repeat(100));
        assert!(f.into_job(b"r").is_ok());
    }

    #[test]
    fn test_company_required_for_cover_letter() {
        let mut f = fields();
        f.generate_cover_letter = true;
        assert!(message(f.into_job(b"r").unwrap_err()).contains("Company name is required"));

        let mut f = fields();
        f.generate_cover_letter = true;
        f.company_name = Some("Acme".to_string());
        assert!(f.into_job(b"r").is_ok());
    }

    #[test]
    fn test_rejects_unknown_format_and_bad_url() {
        let mut f = fields();
        f.output_format = Some("odt".to_string());
        assert!(message(f.into_job(b"r").unwrap_err()).contains("'odt'"));

        let mut f = fields();
        f.job_url = Some("ftp://jobs.example.com/1".to_string());
        assert!(message(f.into_job(b"r").unwrap_err()).contains("http or https"));

        let mut f = fields();
        f.job_url = Some("https://jobs.example.com/1".to_string());
        assert!(f.into_job(b"r").is_ok());
    }

    #[test]
    fn test_multipart_field_names() {
        let mut f = JobFields::default();
        f.set("jobTitle", "Engineer".to_string());
        f.set("generateCoverLetter", "on".to_string());
        f.set("unknown", "ignored".to_string());
        assert_eq!(f.job_title.as_deref(), Some("Engineer"));
        assert!(f.generate_cover_letter);
    }

    #[test]
    fn test_decode_resume() {
        assert_eq!(decode_resume("aGVsbG8=").unwrap(), b"hello");
        assert_eq!(
            decode_resume("data:application/pdf;base64,aGVs\nbG8=").unwrap(),
            b"hello"
        );
        assert!(decode_resume("data:application/pdf;base64").is_err());
        assert!(decode_resume("not base64!").is_err());
        assert!(decode_resume("   ").is_err());
    }
}

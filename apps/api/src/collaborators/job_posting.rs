use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::CollaboratorError;

/// Fields scraped from a job posting. Any of them may be missing.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct JobPosting {
    #[serde(default, alias = "title")]
    pub job_title: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[async_trait]
pub trait JobPostingExtractor: Send + Sync {
    async fn extract(&self, job_url: &str) -> Result<JobPosting, CollaboratorError>;
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ExtractRequest<'a> {
    job_url: &'a str,
}

#[derive(Deserialize)]
struct ExtractResponse {
    #[serde(default)]
    success: bool,
    data: Option<JobPosting>,
    error: Option<String>,
}

/// Calls the job-posting extraction service: `POST {endpoint}` with `{"jobUrl"}`,
/// answered by `{"success", "data": {"job_title", "company", "description"}, "error"}`.
#[derive(Clone)]
pub struct HttpJobPostingExtractor {
    client: Client,
    endpoint: String,
}

impl HttpJobPostingExtractor {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            endpoint: endpoint.into(),
        })
    }
}

#[async_trait]
impl JobPostingExtractor for HttpJobPostingExtractor {
    async fn extract(&self, job_url: &str) -> Result<JobPosting, CollaboratorError> {
        debug!(job_url, "Requesting job posting extraction");
        let response = self
            .client
            .post(&self.endpoint)
            .json(&ExtractRequest { job_url })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(CollaboratorError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let body: ExtractResponse = response.json().await?;
        match (body.success, body.data) {
            (true, Some(posting)) => Ok(posting),
            _ => Err(CollaboratorError::Rejected(
                body.error.unwrap_or_else(|| "Unknown error".to_string()),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_accepts_either_title_key() {
        let body: ExtractResponse = serde_json::from_str(
            r#"{"success": true, "data": {"title": "Data Engineer", "company": "Acme", "location": "Remote"}}"#,
        )
        .unwrap();
        let posting = body.data.unwrap();
        assert_eq!(posting.job_title.as_deref(), Some("Data Engineer"));
        assert_eq!(posting.company.as_deref(), Some("Acme"));
        assert_eq!(posting.description, None);
    }

    #[test]
    fn test_failure_response_parses() {
        let body: ExtractResponse =
            serde_json::from_str(r#"{"success": false, "error": "blocked"}"#).unwrap();
        assert!(!body.success);
        assert_eq!(body.error.as_deref(), Some("blocked"));
    }
}

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::CollaboratorError;

/// Categorized keywords from the skills service, plus what it changed.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillsOutcome {
    /// Category name (technical, tools, frameworks, ...) to keywords.
    #[serde(default)]
    pub categories: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub new_skills_added: u32,
    #[serde(default)]
    pub existing_skills_updated: u32,
}

impl SkillsOutcome {
    /// `"+N new, M updated"`, or `None` when nothing changed.
    pub fn summary(&self) -> Option<String> {
        if self.new_skills_added == 0 && self.existing_skills_updated == 0 {
            return None;
        }
        Some(format!(
            "+{} new, {} updated",
            self.new_skills_added, self.existing_skills_updated
        ))
    }

    /// Prompt fragment listing non-empty categories, one per line.
    pub fn prompt_text(&self) -> Option<String> {
        let lines: Vec<String> = self
            .categories
            .iter()
            .filter(|(_, skills)| !skills.is_empty())
            .map(|(category, skills)| format!("{category}: {}", skills.join(", ")))
            .collect();
        if lines.is_empty() {
            None
        } else {
            Some(lines.join("\n"))
        }
    }
}

#[async_trait]
pub trait SkillsNormalizer: Send + Sync {
    /// Extracts skills from `job_description`, records them and returns the
    /// categorized keyword lists to prioritise.
    async fn process(&self, job_description: &str) -> Result<SkillsOutcome, CollaboratorError>;
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ProcessRequest<'a> {
    job_description: &'a str,
}

#[derive(Clone)]
pub struct HttpSkillsNormalizer {
    client: Client,
    endpoint: String,
}

impl HttpSkillsNormalizer {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            endpoint: endpoint.into(),
        })
    }
}

#[async_trait]
impl SkillsNormalizer for HttpSkillsNormalizer {
    async fn process(&self, job_description: &str) -> Result<SkillsOutcome, CollaboratorError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&ProcessRequest { job_description })
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
        Ok(response.json().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_only_when_something_changed() {
        let mut outcome = SkillsOutcome::default();
        assert_eq!(outcome.summary(), None);
        outcome.new_skills_added = 3;
        outcome.existing_skills_updated = 7;
        assert_eq!(outcome.summary().as_deref(), Some("+3 new, 7 updated"));
    }

    #[test]
    fn test_prompt_text_skips_empty_categories() {
        let outcome: SkillsOutcome = serde_json::from_str(
            r#"{"categories": {"technical": ["Spark", "Kafka"], "soft": []}, "newSkillsAdded": 2}"#,
        )
        .unwrap();
        assert_eq!(outcome.prompt_text().as_deref(), Some("technical: Spark, Kafka"));
        assert_eq!(outcome.new_skills_added, 2);
    }
}

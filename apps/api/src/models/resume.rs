use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Markers emitted by upstream error handlers in place of a real name. A resume carrying
/// one of these is never accepted as a model result.
const PLACEHOLDER_NAMES: &[&str] = &["Resume Processing Error", "Resume Generation Error"];

/// The schema-validated resume produced by response recovery.
///
/// Every field except `additional_sections` is required; `serde` rejects objects that
/// miss one, and [`StructuredResume::validate`] checks the content rules serde cannot.
/// Rendering code assumes a value of this type is well formed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuredResume {
    pub full_name: String,
    pub contact_info: String,
    pub professional_summary: String,
    pub skills: Vec<String>,
    pub experience: Vec<ExperienceEntry>,
    pub education: Vec<EducationEntry>,
    /// Any other top-level section the model returned (certifications, projects, ...).
    #[serde(flatten)]
    pub additional_sections: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperienceEntry {
    pub title: String,
    pub company: String,
    pub dates: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    pub achievements: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EducationEntry {
    pub degree: String,
    pub institution: String,
    pub dates: String,
    #[serde(default)]
    pub details: Option<String>,
}

impl StructuredResume {
    /// Content checks applied after deserialization.
    pub fn validate(&self) -> Result<(), String> {
        let name = self.full_name.trim();
        if name.is_empty() {
            return Err("full_name is blank".to_string());
        }
        if PLACEHOLDER_NAMES.iter().any(|p| name.eq_ignore_ascii_case(p)) {
            return Err(format!("full_name is an error placeholder: '{name}'"));
        }
        for (i, entry) in self.experience.iter().enumerate() {
            if entry.title.trim().is_empty() || entry.company.trim().is_empty() {
                return Err(format!("experience[{i}] is missing title or company"));
            }
        }
        Ok(())
    }

    /// Extra sections rendered after education, with a display heading and text lines.
    pub fn extra_sections(&self) -> Vec<(String, Vec<String>)> {
        self.additional_sections
            .iter()
            .filter_map(|(key, value)| {
                let lines = section_lines(value);
                if lines.is_empty() {
                    None
                } else {
                    Some((key.replace('_', " ").to_uppercase(), lines))
                }
            })
            .collect()
    }
}

fn section_lines(value: &Value) -> Vec<String> {
    match value {
        Value::Null => Vec::new(),
        Value::String(s) if s.trim().is_empty() => Vec::new(),
        Value::String(s) => vec![s.trim().to_string()],
        Value::Array(items) => items.iter().flat_map(section_lines).collect(),
        Value::Object(map) => {
            let parts: Vec<String> = map
                .values()
                .filter_map(|v| match v {
                    Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
                    Value::Number(n) => Some(n.to_string()),
                    _ => None,
                })
                .collect();
            if parts.is_empty() {
                Vec::new()
            } else {
                vec![parts.join(" | ")]
            }
        }
        other => vec![other.to_string()],
    }
}

#[cfg(test)]
pub(crate) fn sample_resume() -> StructuredResume {
    StructuredResume {
        full_name: "Ada Lovelace".to_string(),
        contact_info: "ada@example.com | London".to_string(),
        professional_summary: "Data engineer building reliable batch and streaming pipelines."
            .to_string(),
        skills: vec!["Rust".to_string(), "SQL".to_string(), "Airflow".to_string()],
        experience: vec![ExperienceEntry {
            title: "Data Engineer".to_string(),
            company: "Analytical Engines Ltd".to_string(),
            dates: "2019 - Present".to_string(),
            location: Some("London".to_string()),
            achievements: vec![
                "Cut nightly ETL runtime by 40% by partitioning fact tables".to_string(),
                "Migrated 120 cron jobs to Airflow DAGs".to_string(),
            ],
        }],
        education: vec![EducationEntry {
            degree: "BSc Mathematics".to_string(),
            institution: "University of London".to_string(),
            dates: "2015".to_string(),
            details: None,
        }],
        additional_sections: BTreeMap::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_missing_required_field_is_rejected() {
        let value = json!({
            "full_name": "Ada",
            "contact_info": "ada@example.com",
            "skills": [],
            "experience": [],
            "education": []
        });
        assert!(serde_json::from_value::<StructuredResume>(value).is_err());
    }

    #[test]
    fn test_extra_sections_are_kept() {
        let mut value = serde_json::to_value(sample_resume()).unwrap();
        value["certifications"] = json!(["AWS Certified Data Engineer"]);
        let resume: StructuredResume = serde_json::from_value(value).unwrap();
        assert_eq!(
            resume.extra_sections(),
            vec![(
                "CERTIFICATIONS".to_string(),
                vec!["AWS Certified Data Engineer".to_string()]
            )]
        );
    }

    #[test]
    fn test_validate_rejects_placeholder_name() {
        let mut resume = sample_resume();
        resume.full_name = "Resume Processing Error".to_string();
        assert!(resume.validate().is_err());
        assert!(sample_resume().validate().is_ok());
    }
}

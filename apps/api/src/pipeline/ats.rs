use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};

use crate::models::job::AtsScore;

static RE_SCORE_OBJECT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\{[^{}]+\}").unwrap());

/// A score in 0..=100, or 0 for anything else.
fn score(scores: &Map<String, Value>, key: &str) -> u8 {
    match scores.get(key).and_then(Value::as_f64) {
        Some(value) if (0.0..=100.0).contains(&value) => value.round() as u8,
        _ => 0,
    }
}

/// Reads the first flat JSON object in a scoring answer. `None` when the
/// answer has no parsable object at all.
pub fn parse_scores(text: &str) -> Option<AtsScore> {
    let span = RE_SCORE_OBJECT.find(text)?;
    let scores: Map<String, Value> = serde_json::from_str(span.as_str()).ok()?;
    Some(AtsScore {
        overall: score(&scores, "overall"),
        keywords: score(&scores, "keywords"),
        skills: score(&scores, "skills"),
        experience: score(&scores, "experience"),
        format: score(&scores, "format"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_scores_inside_prose() {
        let text = "Here are the scores:\n{\"overall\": 85, \"keywords\": 90.4, \"skills\": 80, \"experience\": 85, \"format\": 95}\nThanks";
        assert_eq!(
            parse_scores(text),
            Some(AtsScore {
                overall: 85,
                keywords: 90,
                skills: 80,
                experience: 85,
                format: 95
            })
        );
    }

    #[test]
    fn test_invalid_values_become_zero() {
        let text = r#"{"overall": 140, "keywords": -3, "skills": "high", "experience": 70}"#;
        let scores = parse_scores(text).unwrap();
        assert_eq!(scores.overall, 0);
        assert_eq!(scores.keywords, 0);
        assert_eq!(scores.skills, 0);
        assert_eq!(scores.experience, 70);
        assert_eq!(scores.format, 0);
    }

    #[test]
    fn test_no_object() {
        assert_eq!(parse_scores("I cannot score this resume."), None);
    }
}

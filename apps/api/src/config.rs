use std::time::Duration;

use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing or malformed.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub s3_bucket: String,
    /// MinIO or another S3-compatible endpoint. Unset means AWS S3.
    pub s3_endpoint: Option<String>,
    pub aws_region: String,
    pub aws_access_key_id: Option<String>,
    pub aws_secret_access_key: Option<String>,
    pub anthropic_api_key: Option<String>,
    /// Backend ids restricting and ordering the default model catalog.
    pub model_chain: Option<Vec<String>>,
    pub model_timeout: Duration,
    pub extraction_timeout: Duration,
    pub render_timeout: Duration,
    pub artifact_url_ttl: Duration,
    pub job_extractor_url: Option<String>,
    pub skills_service_url: Option<String>,
    pub enable_textract: bool,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            s3_bucket: require_env("S3_BUCKET")?,
            s3_endpoint: optional_env("S3_ENDPOINT"),
            aws_region: optional_env("AWS_REGION").unwrap_or_else(|| "us-east-1".to_string()),
            aws_access_key_id: optional_env("AWS_ACCESS_KEY_ID"),
            aws_secret_access_key: optional_env("AWS_SECRET_ACCESS_KEY"),
            anthropic_api_key: optional_env("ANTHROPIC_API_KEY"),
            model_chain: optional_env("MODEL_CHAIN").map(|v| parse_list(&v)),
            model_timeout: secs_env("MODEL_TIMEOUT_SECS", 90)?,
            extraction_timeout: secs_env("EXTRACTION_TIMEOUT_SECS", 60)?,
            render_timeout: secs_env("RENDER_TIMEOUT_SECS", 30)?,
            artifact_url_ttl: secs_env("ARTIFACT_URL_TTL_SECS", 3600)?,
            job_extractor_url: optional_env("JOB_EXTRACTOR_URL"),
            skills_service_url: optional_env("SKILLS_SERVICE_URL"),
            enable_textract: optional_env("ENABLE_TEXTRACT")
                .map(|v| parse_flag(&v))
                .transpose()?
                .unwrap_or(true),
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

/// Unset and blank values are both treated as absent.
fn optional_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn secs_env(key: &str, default: u64) -> Result<Duration> {
    let secs = match optional_env(key) {
        Some(v) => v
            .parse::<u64>()
            .with_context(|| format!("{key} must be a whole number of seconds"))?,
        None => default,
    };
    Ok(Duration::from_secs(secs))
}

fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_flag(value: &str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => anyhow::bail!("ENABLE_TEXTRACT must be true or false, got '{other}'"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_list() {
        assert_eq!(
            parse_list(" us.deepseek.r1-v1:0, ,anthropic.claude-3-haiku-20240307-v1:0 "),
            vec!["us.deepseek.r1-v1:0", "anthropic.claude-3-haiku-20240307-v1:0"]
        );
        assert!(parse_list(",,").is_empty());
    }

    #[test]
    fn test_parse_flag() {
        assert!(parse_flag("TRUE").unwrap());
        assert!(!parse_flag("off").unwrap());
        assert!(parse_flag("maybe").is_err());
    }
}

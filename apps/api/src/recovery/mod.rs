//! Response recovery: turns free-form model output into a validated [`StructuredResume`].
//!
//! Strategies run in a fixed order and stop at the first candidate that both parses and
//! passes schema validation:
//!
//! 1. fenced code block content
//! 2. outermost `{ ... }` span (only when text surrounds it)
//! 3. the whole text
//! 4. line scan with brace balancing and repairs
//!
//! There is no fallback value. If every strategy fails the caller gets
//! [`RecoveryError`] and the job fails.

pub mod repair;

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::extraction::normalize::fix_ligatures;
use crate::models::resume::StructuredResume;

static RE_FENCED_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```[a-zA-Z]*[ \t]*\r?\n?(.*?)```").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecoveryStrategy {
    FencedBlock,
    OuterBraces,
    WholeText,
    LineScanRepair,
}

impl RecoveryStrategy {
    pub const ORDER: [RecoveryStrategy; 4] = [
        RecoveryStrategy::FencedBlock,
        RecoveryStrategy::OuterBraces,
        RecoveryStrategy::WholeText,
        RecoveryStrategy::LineScanRepair,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RecoveryStrategy::FencedBlock => "fenced_block",
            RecoveryStrategy::OuterBraces => "outer_braces",
            RecoveryStrategy::WholeText => "whole_text",
            RecoveryStrategy::LineScanRepair => "line_scan_repair",
        }
    }

    /// Candidate JSON texts this strategy proposes, in preference order.
    fn candidates(&self, text: &str) -> Vec<String> {
        match self {
            RecoveryStrategy::FencedBlock => RE_FENCED_BLOCK
                .captures_iter(text)
                .filter_map(|c| c.get(1))
                .map(|m| m.as_str().trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            RecoveryStrategy::OuterBraces => {
                let trimmed = text.trim();
                match (trimmed.find('{'), trimmed.rfind('}')) {
                    (Some(start), Some(end)) if start < end => {
                        let span = &trimmed[start..=end];
                        if span.len() == trimmed.len() {
                            Vec::new()
                        } else {
                            vec![span.to_string()]
                        }
                    }
                    _ => Vec::new(),
                }
            }
            RecoveryStrategy::WholeText => vec![text.trim().to_string()],
            RecoveryStrategy::LineScanRepair => repair::candidates(text),
        }
    }
}

impl fmt::Display for RecoveryStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Recovered {
    pub resume: StructuredResume,
    pub strategy: RecoveryStrategy,
}

#[derive(Debug, Clone, PartialEq, Error)]
#[error("model response could not be parsed into a resume ({})", describe(.attempts))]
pub struct RecoveryError {
    pub attempts: Vec<(RecoveryStrategy, String)>,
}

fn describe(attempts: &[(RecoveryStrategy, String)]) -> String {
    attempts
        .iter()
        .map(|(strategy, reason)| format!("{strategy}: {reason}"))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Runs the strategies over `raw` model text.
pub fn recover(raw: &str) -> Result<Recovered, RecoveryError> {
    let text = fix_ligatures(raw);
    let mut attempts = Vec::new();

    for strategy in RecoveryStrategy::ORDER {
        let candidates = strategy.candidates(&text);
        if candidates.is_empty() {
            attempts.push((strategy, "no candidate".to_string()));
            continue;
        }
        let mut last_error = String::new();
        for candidate in candidates {
            match parse_candidate(&candidate) {
                Ok(resume) => {
                    info!(strategy = %strategy, "Structured resume recovered");
                    return Ok(Recovered { resume, strategy });
                }
                Err(e) => {
                    debug!(strategy = %strategy, error = %e, "Recovery candidate rejected");
                    last_error = e;
                }
            }
        }
        attempts.push((strategy, last_error));
    }

    Err(RecoveryError { attempts })
}

fn parse_candidate(candidate: &str) -> Result<StructuredResume, String> {
    let resume: StructuredResume =
        serde_json::from_str(candidate).map_err(|e| format!("invalid JSON: {e}"))?;
    resume.validate()?;
    Ok(resume)
}

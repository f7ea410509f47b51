use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;

use super::detect::looks_like_text;
use super::{DocumentKind, ExtractionStrategy, SourceDocument};
use crate::chain::{blocking_attempt, AttemptError, ChainMember, FailureClass};

static RE_RTF_CONTROL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\\[a-zA-Z]+-?\d* ?|\\'[0-9a-fA-F]{2}|\\[^a-zA-Z]").unwrap());
static RE_RTF_GROUP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\\\*[^{}]*\}|\{\\(fonttbl|colortbl|stylesheet|info)[^}]*\}+").unwrap());

/// Shortest run of printable bytes kept when scraping a binary Word file.
const MIN_BINARY_RUN: usize = 4;

/// Generic reader for plain text, RTF and legacy binary Word files.
pub struct PlainTextStrategy;

impl ChainMember for PlainTextStrategy {
    fn id(&self) -> &str {
        "plain-text"
    }
}

#[async_trait]
impl ExtractionStrategy for PlainTextStrategy {
    fn confidence(&self) -> f32 {
        0.8
    }

    fn supports(&self, kind: DocumentKind) -> bool {
        matches!(
            kind,
            DocumentKind::Text | DocumentKind::Rtf | DocumentKind::LegacyDoc
        )
    }

    async fn extract(&self, document: &SourceDocument) -> Result<String, AttemptError> {
        let bytes = document.bytes.clone();
        let kind = document.kind;
        blocking_attempt(FailureClass::Corrupt, move || match kind {
            DocumentKind::Rtf => Ok(strip_rtf(&String::from_utf8_lossy(&bytes))),
            DocumentKind::LegacyDoc => Ok(printable_runs(&bytes)),
            _ if looks_like_text(&bytes) => Ok(String::from_utf8_lossy(&bytes).into_owned()),
            _ => Err(AttemptError::corrupt("content is not valid UTF-8 text")),
        })
        .await
    }
}

/// Drops RTF destinations and control words, keeping paragraph breaks.
fn strip_rtf(rtf: &str) -> String {
    let without_groups = RE_RTF_GROUP.replace_all(rtf, "");
    let with_breaks = without_groups.replace("\\par", "\n").replace("\\line", "\n");
    RE_RTF_CONTROL
        .replace_all(&with_breaks, "")
        .replace(['{', '}'], "")
}

/// Pulls readable ASCII runs out of a binary document.
fn printable_runs(bytes: &[u8]) -> String {
    let mut out = String::new();
    let mut run = String::new();
    for &b in bytes {
        if b.is_ascii_graphic() || b == b' ' {
            run.push(b as char);
        } else {
            if run.trim().len() >= MIN_BINARY_RUN {
                out.push_str(run.trim());
                out.push('\n');
            }
            run.clear();
        }
    }
    if run.trim().len() >= MIN_BINARY_RUN {
        out.push_str(run.trim());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    #[test]
    fn test_strip_rtf() {
        let rtf = r"{\rtf1\ansi{\fonttbl{\f0 Arial;}}\f0\fs24 Jane Doe\par Senior Engineer\par}";
        let text = strip_rtf(rtf);
        assert!(text.contains("Jane Doe"));
        assert!(text.contains("Senior Engineer"));
        assert!(!text.contains("\\fs24"));
        assert!(!text.contains("Arial"));
    }

    #[test]
    fn test_printable_runs_skip_short_noise() {
        let bytes = b"\x00\x01ab\x00Jane Doe Resume\x00\x02Engineer\x00";
        assert_eq!(printable_runs(bytes), "Jane Doe Resume\nEngineer\n");
    }

    #[tokio::test]
    async fn test_reads_utf8_text() {
        let text = PlainTextStrategy
            .extract(&SourceDocument {
                bytes: Bytes::from_static("Jürgen Müller\nData Engineer".as_bytes()),
                kind: DocumentKind::Text,
                file_name: Some("cv.txt".to_string()),
            })
            .await
            .unwrap();
        assert_eq!(text, "Jürgen Müller\nData Engineer");
    }
}

//! Text extraction chain.
//!
//! Strategies are tried in order (`pdf-extract`, `lopdf`, OOXML, plain reader, OCR).
//! A strategy that does not handle the detected document kind reports `Unsupported`
//! and costs nothing. The first strategy returning at least [`MIN_TEXT_CHARS`] wins;
//! only its text is normalized.

pub mod detect;
pub mod docx;
pub mod normalize;
pub mod ocr;
pub mod pdf;
pub mod plain;

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use serde::Serialize;
use thiserror::Error;
use tracing::info;

use crate::chain::{run_chain, AttemptError, ChainExhausted, ChainMember, FailureClass};
pub use detect::DocumentKind;

/// Shortest trimmed text accepted from a strategy.
pub const MIN_TEXT_CHARS: usize = 50;

/// The uploaded document as seen by strategies.
#[derive(Debug, Clone)]
pub struct SourceDocument {
    pub bytes: Bytes,
    pub kind: DocumentKind,
    pub file_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtractionResult {
    pub text: String,
    pub strategy_used: String,
    pub confidence: f32,
    pub document_kind: DocumentKind,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExtractionError {
    #[error("unsupported document format ({0})")]
    UnsupportedFormat(String),

    #[error("no readable text found: {0}")]
    EmptyContent(String),

    #[error("document is corrupted or unreadable: {0}")]
    Corrupted(String),
}

impl ExtractionError {
    pub fn cause(&self) -> &'static str {
        match self {
            ExtractionError::UnsupportedFormat(_) => "UnsupportedFormat",
            ExtractionError::EmptyContent(_) => "EmptyContent",
            ExtractionError::Corrupted(_) => "Corrupted",
        }
    }

    /// Unsupported everywhere -> `UnsupportedFormat`; a strategy that parsed the file but
    /// found too little text -> `EmptyContent`; parse failures only -> `Corrupted`.
    fn classify(kind: DocumentKind, exhausted: ChainExhausted) -> Self {
        let applied = exhausted
            .failures
            .iter()
            .any(|f| f.class != FailureClass::Unsupported);

        if !applied {
            ExtractionError::UnsupportedFormat(kind.to_string())
        } else if exhausted.any(FailureClass::Empty) {
            ExtractionError::EmptyContent(exhausted.summary())
        } else if exhausted.any(FailureClass::Corrupt) {
            ExtractionError::Corrupted(exhausted.summary())
        } else {
            ExtractionError::EmptyContent(exhausted.summary())
        }
    }
}

#[async_trait]
pub trait ExtractionStrategy: ChainMember {
    /// Confidence reported with text produced by this strategy.
    fn confidence(&self) -> f32;

    fn supports(&self, kind: DocumentKind) -> bool;

    /// One attempt, no internal retry.
    async fn extract(&self, document: &SourceDocument) -> Result<String, AttemptError>;
}

/// Applies a uniform per-attempt timeout to a strategy.
struct Timed {
    inner: Box<dyn ExtractionStrategy>,
    timeout: Duration,
}

impl ChainMember for Timed {
    fn id(&self) -> &str {
        self.inner.id()
    }

    fn timeout(&self) -> Option<Duration> {
        Some(self.timeout)
    }
}

pub struct ExtractionChain {
    strategies: Vec<Timed>,
    min_chars: usize,
}

impl ExtractionChain {
    pub fn new(strategies: Vec<Box<dyn ExtractionStrategy>>, timeout: Duration) -> Self {
        Self {
            strategies: strategies
                .into_iter()
                .map(|inner| Timed { inner, timeout })
                .collect(),
            min_chars: MIN_TEXT_CHARS,
        }
    }

    /// The production strategy order. OCR is appended when a Textract client is given.
    pub fn standard(textract: Option<aws_sdk_textract::Client>, timeout: Duration) -> Self {
        let mut strategies: Vec<Box<dyn ExtractionStrategy>> = vec![
            Box::new(pdf::PdfExtractStrategy),
            Box::new(pdf::LopdfStrategy),
            Box::new(docx::OoxmlStrategy),
            Box::new(plain::PlainTextStrategy),
        ];
        if let Some(client) = textract {
            strategies.push(Box::new(ocr::TextractStrategy::new(client)));
        }
        Self::new(strategies, timeout)
    }

    pub fn strategy_ids(&self) -> Vec<&str> {
        self.strategies.iter().map(|s| s.id()).collect()
    }

    /// Runs the chain once over `bytes`. `declared` is the uploaded file name, used only
    /// when magic bytes are inconclusive.
    pub async fn extract(
        &self,
        bytes: Bytes,
        declared: Option<&str>,
    ) -> Result<ExtractionResult, ExtractionError> {
        let kind = detect::detect(&bytes, declared);
        let document = SourceDocument {
            bytes,
            kind,
            file_name: declared.map(str::to_string),
        };
        let document = &document;
        let min_chars = self.min_chars;

        let success = run_chain("extraction", &self.strategies, move |timed| async move {
            let strategy = &timed.inner;
            if !strategy.supports(document.kind) {
                return Err(AttemptError::unsupported(format!(
                    "{} documents not handled",
                    document.kind
                )));
            }
            let raw = strategy.extract(document).await?;
            let length = raw.trim().chars().count();
            if length < min_chars {
                return Err(AttemptError::empty(format!(
                    "{length} characters extracted, need {min_chars}"
                )));
            }
            Ok((raw, strategy.confidence()))
        })
        .await
        .map_err(|e| ExtractionError::classify(kind, e))?;

        let (raw, confidence) = success.value;
        let text = normalize::normalize(&raw);
        info!(
            strategy = %success.member,
            kind = %kind,
            chars = text.chars().count(),
            "Text extracted"
        );

        Ok(ExtractionResult {
            text,
            strategy_used: success.member,
            confidence,
            document_kind: kind,
        })
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Scripted strategy recording each call.
    pub struct FakeStrategy {
        pub id: &'static str,
        pub kinds: Vec<DocumentKind>,
        pub outcome: Result<String, AttemptError>,
        pub calls: Arc<Mutex<Vec<&'static str>>>,
    }

    impl FakeStrategy {
        pub fn boxed(
            id: &'static str,
            kinds: Vec<DocumentKind>,
            outcome: Result<String, AttemptError>,
            calls: &Arc<Mutex<Vec<&'static str>>>,
        ) -> Box<dyn ExtractionStrategy> {
            Box::new(Self {
                id,
                kinds,
                outcome,
                calls: Arc::clone(calls),
            })
        }
    }

    impl ChainMember for FakeStrategy {
        fn id(&self) -> &str {
            self.id
        }
    }

    #[async_trait]
    impl ExtractionStrategy for FakeStrategy {
        fn confidence(&self) -> f32 {
            0.75
        }

        fn supports(&self, kind: DocumentKind) -> bool {
            self.kinds.contains(&kind)
        }

        async fn extract(&self, _document: &SourceDocument) -> Result<String, AttemptError> {
            self.calls.lock().unwrap().push(self.id);
            self.outcome.clone()
        }
    }
}

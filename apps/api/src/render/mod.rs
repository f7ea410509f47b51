//! Output renderer multiplexer.
//!
//! Every requested format owns an ordered renderer chain (primary, then fallback).
//! Formats render one after another; a job is still deliverable when at least one
//! format survives, in which case the outcome is flagged as degraded.

pub mod document;
pub mod docx;
pub mod pdf;
pub mod rtf;
pub mod text;

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::{info, warn};

use crate::chain::{blocking_attempt, run_chain, AttemptError, ChainExhausted, ChainMember, FailureClass};
use crate::models::job::OutputFormat;
pub use document::{Block, RenderDocument};

/// Turns a [`RenderDocument`] into the bytes of one file format.
///
/// Rendering is synchronous and CPU-bound; the multiplexer runs it on the
/// blocking pool.
pub trait Renderer: ChainMember {
    fn content_type(&self) -> &'static str;
    fn extension(&self) -> &'static str;
    fn render(&self, document: &RenderDocument) -> Result<Vec<u8>, AttemptError>;
}

/// A renderer with its per-call time limit.
struct Slot {
    renderer: Arc<dyn Renderer>,
    timeout: Duration,
}

impl ChainMember for Slot {
    fn id(&self) -> &str {
        self.renderer.id()
    }

    fn timeout(&self) -> Option<Duration> {
        Some(self.timeout)
    }
}

#[derive(Debug, Clone)]
pub struct RenderedArtifact {
    pub format: OutputFormat,
    pub bytes: Vec<u8>,
    pub content_type: &'static str,
    pub extension: &'static str,
    /// Id of the renderer that produced the bytes.
    pub renderer: String,
    pub used_fallback: bool,
}

#[derive(Debug)]
pub struct RenderOutcome {
    /// Successful artifacts, in request order.
    pub artifacts: Vec<RenderedArtifact>,
    pub failures: Vec<(OutputFormat, ChainExhausted)>,
}

impl RenderOutcome {
    /// At least one requested format is missing from the result.
    pub fn degraded(&self) -> bool {
        !self.failures.is_empty()
    }
}

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("no output format requested")]
    NothingRequested,
    #[error("all requested formats failed: {}", describe(.0))]
    Exhausted(Vec<(OutputFormat, ChainExhausted)>),
}

fn describe(failures: &[(OutputFormat, ChainExhausted)]) -> String {
    failures
        .iter()
        .map(|(format, e)| format!("{format} [{}]", e.summary()))
        .collect::<Vec<_>>()
        .join("; ")
}

pub struct RendererMultiplexer {
    chains: BTreeMap<OutputFormat, Vec<Slot>>,
    timeout: Duration,
}

impl RendererMultiplexer {
    pub fn new(timeout: Duration) -> Self {
        Self {
            chains: BTreeMap::new(),
            timeout,
        }
    }

    /// PDF: layout then plain. Word: DOCX then RTF. Text: aligned then compact.
    pub fn standard(timeout: Duration) -> Self {
        Self::new(timeout)
            .with_chain(
                OutputFormat::Pdf,
                vec![Arc::new(pdf::LayoutPdfRenderer), Arc::new(pdf::PlainPdfRenderer)],
            )
            .with_chain(
                OutputFormat::Word,
                vec![Arc::new(docx::DocxRenderer), Arc::new(rtf::RtfRenderer)],
            )
            .with_chain(
                OutputFormat::Text,
                vec![Arc::new(text::TextRenderer), Arc::new(text::CompactTextRenderer)],
            )
    }

    /// Replaces the renderer chain for `format`.
    pub fn with_chain(mut self, format: OutputFormat, renderers: Vec<Arc<dyn Renderer>>) -> Self {
        let timeout = self.timeout;
        self.chains.insert(
            format,
            renderers
                .into_iter()
                .map(|renderer| Slot { renderer, timeout })
                .collect(),
        );
        self
    }

    pub fn renderer_ids(&self, format: OutputFormat) -> Vec<&str> {
        self.chains
            .get(&format)
            .map(|slots| slots.iter().map(|s| s.id()).collect())
            .unwrap_or_default()
    }

    /// Renders `document` in every requested format, sequentially.
    pub async fn render(
        &self,
        document: Arc<RenderDocument>,
        formats: &[OutputFormat],
    ) -> Result<RenderOutcome, RenderError> {
        if formats.is_empty() {
            return Err(RenderError::NothingRequested);
        }

        let mut artifacts = Vec::new();
        let mut failures = Vec::new();

        for &format in formats {
            let slots = self.chains.get(&format).map(Vec::as_slice).unwrap_or(&[]);
            let doc = Arc::clone(&document);
            let result = run_chain("render", slots, move |slot| {
                let renderer = Arc::clone(&slot.renderer);
                let doc = Arc::clone(&doc);
                async move {
                    let content_type = renderer.content_type();
                    let extension = renderer.extension();
                    let bytes =
                        blocking_attempt(FailureClass::Unexpected, move || renderer.render(&doc))
                            .await?;
                    if bytes.is_empty() {
                        return Err(AttemptError::empty("renderer produced no bytes"));
                    }
                    Ok((bytes, content_type, extension))
                }
            })
            .await;

            match result {
                Ok(success) => {
                    let (bytes, content_type, extension) = success.value;
                    info!(
                        format = %format,
                        renderer = %success.member,
                        size = bytes.len(),
                        "Rendered artifact"
                    );
                    artifacts.push(RenderedArtifact {
                        format,
                        bytes,
                        content_type,
                        extension,
                        renderer: success.member,
                        used_fallback: !success.skipped.is_empty(),
                    });
                }
                Err(exhausted) => {
                    warn!(format = %format, error = %exhausted, "Format could not be rendered");
                    failures.push((format, exhausted));
                }
            }
        }

        if artifacts.is_empty() {
            return Err(RenderError::Exhausted(failures));
        }
        Ok(RenderOutcome { artifacts, failures })
    }
}


#[cfg(test)]
mod tests {
    use super::testing::BrokenRenderer;
    use super::*;
    use crate::models::resume::sample_resume;

    fn document() -> Arc<RenderDocument> {
        Arc::new(RenderDocument::from_resume(&sample_resume()))
    }

    #[tokio::test]
    async fn test_word_failure_leaves_pdf_only() {
        let mux = RendererMultiplexer::standard(Duration::from_secs(5)).with_chain(
            OutputFormat::Word,
            vec![BrokenRenderer::arc("docx"), BrokenRenderer::arc("rtf")],
        );

        let outcome = mux
            .render(document(), &[OutputFormat::Pdf, OutputFormat::Word])
            .await
            .unwrap();

        assert_eq!(outcome.artifacts.len(), 1);
        assert_eq!(outcome.artifacts[0].format, OutputFormat::Pdf);
        assert_eq!(outcome.artifacts[0].renderer, "pdf-layout");
        assert!(outcome.degraded());
        assert_eq!(outcome.failures[0].0, OutputFormat::Word);
        assert_eq!(outcome.failures[0].1.failures.len(), 2);
    }

    #[tokio::test]
    async fn test_all_formats_failing_is_an_error() {
        let mux = RendererMultiplexer::new(Duration::from_secs(5))
            .with_chain(OutputFormat::Pdf, vec![BrokenRenderer::arc("pdf-a"), BrokenRenderer::arc("pdf-b")])
            .with_chain(OutputFormat::Word, vec![BrokenRenderer::arc("docx"), BrokenRenderer::arc("rtf")]);

        let err = mux
            .render(document(), &[OutputFormat::Pdf, OutputFormat::Word])
            .await
            .unwrap_err();

        match err {
            RenderError::Exhausted(failures) => assert_eq!(failures.len(), 2),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_fallback_renderer_used_after_panic() {
        let mux = RendererMultiplexer::standard(Duration::from_secs(5)).with_chain(
            OutputFormat::Word,
            vec![
                Arc::new(BrokenRenderer { id: "docx", panic: true }),
                Arc::new(rtf::RtfRenderer),
            ],
        );

        let outcome = mux.render(document(), &[OutputFormat::Word]).await.unwrap();
        let artifact = &outcome.artifacts[0];
        assert_eq!(artifact.renderer, "rtf");
        assert_eq!(artifact.extension, "rtf");
        assert!(artifact.used_fallback);
        assert!(!outcome.degraded());
    }

    #[tokio::test]
    async fn test_standard_chains() {
        let mux = RendererMultiplexer::standard(Duration::from_secs(5));
        assert_eq!(mux.renderer_ids(OutputFormat::Pdf), vec!["pdf-layout", "pdf-plain"]);
        assert_eq!(mux.renderer_ids(OutputFormat::Word), vec!["docx", "rtf"]);

        let outcome = mux
            .render(document(), &[OutputFormat::Pdf, OutputFormat::Word, OutputFormat::Text])
            .await
            .unwrap();
        let renderers: Vec<&str> = outcome.artifacts.iter().map(|a| a.renderer.as_str()).collect();
        assert_eq!(renderers, vec!["pdf-layout", "docx", "text-aligned"]);
    }

    #[tokio::test]
    async fn test_empty_request_rejected() {
        let mux = RendererMultiplexer::standard(Duration::from_secs(5));
        assert!(matches!(
            mux.render(document(), &[]).await,
            Err(RenderError::NothingRequested)
        ));
    }
}

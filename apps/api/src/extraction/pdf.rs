use async_trait::async_trait;
use lopdf::Document;

use super::{DocumentKind, ExtractionStrategy, SourceDocument};
use crate::chain::{blocking_attempt, AttemptError, ChainMember, FailureClass};

/// Marker pdf-extract emits for CID fonts it cannot decode.
const IDENTITY_H_PATTERN: &str = "?Identity-H Unimplemented?";
/// Texts shorter than this are never judged garbled.
const MIN_GARBLE_CHARS: usize = 50;
/// Below this share of alphanumeric characters the text is font-encoding noise.
const MIN_ALPHANUMERIC_PERCENT: usize = 10;

/// Primary PDF parser backed by `pdf-extract`.
pub struct PdfExtractStrategy;

impl ChainMember for PdfExtractStrategy {
    fn id(&self) -> &str {
        "pdf-extract"
    }
}

#[async_trait]
impl ExtractionStrategy for PdfExtractStrategy {
    fn confidence(&self) -> f32 {
        1.0
    }

    fn supports(&self, kind: DocumentKind) -> bool {
        kind == DocumentKind::Pdf
    }

    async fn extract(&self, document: &SourceDocument) -> Result<String, AttemptError> {
        let bytes = document.bytes.clone();
        let text = blocking_attempt(FailureClass::Corrupt, move || {
            pdf_extract::extract_text_from_mem(&bytes)
                .map_err(|e| AttemptError::corrupt(format!("pdf-extract: {e}")))
        })
        .await?;
        reject_garbled(text)
    }
}

/// Secondary PDF parser: walks the page tree with `lopdf` and decodes content streams.
pub struct LopdfStrategy;

impl ChainMember for LopdfStrategy {
    fn id(&self) -> &str {
        "lopdf"
    }
}

#[async_trait]
impl ExtractionStrategy for LopdfStrategy {
    fn confidence(&self) -> f32 {
        1.0
    }

    fn supports(&self, kind: DocumentKind) -> bool {
        kind == DocumentKind::Pdf
    }

    async fn extract(&self, document: &SourceDocument) -> Result<String, AttemptError> {
        let bytes = document.bytes.clone();
        let text = blocking_attempt(FailureClass::Corrupt, move || {
            let pdf = Document::load_mem(&bytes)
                .map_err(|e| AttemptError::corrupt(format!("lopdf load: {e}")))?;
            let pages: Vec<u32> = pdf.get_pages().keys().copied().collect();
            if pages.is_empty() {
                return Err(AttemptError::empty("document has no pages"));
            }
            pdf.extract_text(&pages)
                .map_err(|e| AttemptError::corrupt(format!("lopdf text: {e}")))
        })
        .await?;
        reject_garbled(text)
    }
}

/// Scanned or CID-encoded PDFs parse "successfully" into noise. Reporting them as empty
/// lets the chain move on to OCR.
fn reject_garbled(text: String) -> Result<String, AttemptError> {
    if is_garbled(&text) {
        Err(AttemptError::empty("text layer is missing or unreadable"))
    } else {
        Ok(text)
    }
}

fn is_garbled(text: &str) -> bool {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return true;
    }

    let cleaned = trimmed
        .replace(IDENTITY_H_PATTERN, "")
        .replace(['\n', ' '], "");
    if cleaned.is_empty() {
        return true;
    }

    let total_chars = trimmed.chars().count();
    let alphanumeric_chars = trimmed.chars().filter(|c| c.is_alphanumeric()).count();
    total_chars > MIN_GARBLE_CHARS
        && alphanumeric_chars * 100 < total_chars * MIN_ALPHANUMERIC_PERCENT
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn pdf_document(bytes: &'static [u8]) -> SourceDocument {
        SourceDocument {
            bytes: Bytes::from_static(bytes),
            kind: DocumentKind::Pdf,
            file_name: Some("resume.pdf".to_string()),
        }
    }

    #[test]
    fn test_is_garbled() {
        assert!(is_garbled("   \n "));
        assert!(is_garbled("?Identity-H Unimplemented??Identity-H Unimplemented?"));
        assert!(is_garbled(&"#$%^&*()_+{}|:<>?~".repeat(5)));
        assert!(!is_garbled("Jane Doe, Senior Data Engineer"));
    }

    #[tokio::test]
    async fn test_lopdf_reports_corrupt_input() {
        let err = LopdfStrategy
            .extract(&pdf_document(b"%PDF-1.4\nthis is not a pdf body"))
            .await
            .unwrap_err();
        assert_eq!(err.class, FailureClass::Corrupt);
    }

    #[tokio::test]
    async fn test_pdf_extract_reports_corrupt_input() {
        let err = PdfExtractStrategy
            .extract(&pdf_document(b"%PDF-1.4\n%%EOF garbage"))
            .await
            .unwrap_err();
        assert_eq!(err.class, FailureClass::Corrupt);
    }

    #[tokio::test]
    async fn test_lopdf_text_layer_has_full_confidence() {
        use crate::render::{RenderDocument, Renderer};
        use std::time::Duration;

        let doc = RenderDocument::from_resume(&crate::models::resume::sample_resume());
        let bytes = crate::render::pdf::PlainPdfRenderer.render(&doc).unwrap();
        let chain = crate::extraction::ExtractionChain::new(
            vec![Box::new(LopdfStrategy)],
            Duration::from_secs(10),
        );

        let result = chain.extract(Bytes::from(bytes), Some("cv.pdf")).await.unwrap();
        assert_eq!(result.strategy_used, "lopdf");
        assert_eq!(result.confidence, 1.0);
        assert!(result.text.contains("Lovelace"));
    }
}

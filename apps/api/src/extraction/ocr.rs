use async_trait::async_trait;
use aws_sdk_textract::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_textract::operation::detect_document_text::DetectDocumentTextError;
use aws_sdk_textract::primitives::Blob;
use aws_sdk_textract::types::{BlockType, Document};
use tracing::info_span;
use tracing::Instrument;

use super::{DocumentKind, ExtractionStrategy, SourceDocument};
use crate::chain::{AttemptError, ChainMember, FailureClass};

/// Synchronous Textract calls reject payloads above this size.
const MAX_OCR_BYTES: usize = 10 * 1024 * 1024;

/// Last-resort cloud OCR through AWS Textract `DetectDocumentText`.
pub struct TextractStrategy {
    client: aws_sdk_textract::Client,
}

impl TextractStrategy {
    pub fn new(client: aws_sdk_textract::Client) -> Self {
        Self { client }
    }
}

impl ChainMember for TextractStrategy {
    fn id(&self) -> &str {
        "textract"
    }
}

#[async_trait]
impl ExtractionStrategy for TextractStrategy {
    fn confidence(&self) -> f32 {
        0.6
    }

    fn supports(&self, kind: DocumentKind) -> bool {
        matches!(kind, DocumentKind::Pdf | DocumentKind::Image)
    }

    async fn extract(&self, document: &SourceDocument) -> Result<String, AttemptError> {
        if document.bytes.len() > MAX_OCR_BYTES {
            return Err(AttemptError::unsupported(format!(
                "{} bytes exceeds the OCR size limit",
                document.bytes.len()
            )));
        }

        let span = info_span!("ocr", bytes = document.bytes.len());
        let output = self
            .client
            .detect_document_text()
            .document(
                Document::builder()
                    .bytes(Blob::new(document.bytes.to_vec()))
                    .build(),
            )
            .send()
            .instrument(span)
            .await
            .map_err(classify_textract_error)?;

        let lines: Vec<&str> = output
            .blocks()
            .iter()
            .filter(|block| block.block_type() == Some(&BlockType::Line))
            .filter_map(|block| block.text())
            .collect();

        Ok(lines.join("\n"))
    }
}

fn classify_textract_error<R: std::fmt::Debug>(
    err: SdkError<DetectDocumentTextError, R>,
) -> AttemptError {
    let class = match &err {
        SdkError::TimeoutError(_) => FailureClass::Timeout,
        SdkError::DispatchFailure(_) => FailureClass::Network,
        SdkError::ServiceError(_) => err
            .as_service_error()
            .and_then(|e| e.code())
            .map(class_for_textract_code)
            .unwrap_or(FailureClass::Unexpected),
        _ => FailureClass::Unexpected,
    };
    AttemptError::new(class, format!("Textract: {}", DisplayErrorContext(&err)))
}

fn class_for_textract_code(code: &str) -> FailureClass {
    match code {
        "ProvisionedThroughputExceededException"
        | "ThrottlingException"
        | "LimitExceededException" => FailureClass::Throttled,
        "BadDocumentException" => FailureClass::Corrupt,
        "UnsupportedDocumentException" | "DocumentTooLargeException" => FailureClass::Unsupported,
        "InvalidParameterException" => FailureClass::Validation,
        "InternalServerError" => FailureClass::Network,
        _ => FailureClass::Unexpected,
    }
}

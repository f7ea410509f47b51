use thiserror::Error;

use crate::chain::ChainExhausted;
use crate::extraction::ExtractionError;
use crate::recovery::RecoveryError;
use crate::render::RenderError;
use crate::status::StatusError;
use crate::storage::StorageError;

/// Why a job did not complete. Every variant ends the job with FAILED except
/// `Validation`, which stops it before it starts.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("text extraction failed: {0}")]
    ExtractionExhausted(#[from] ExtractionError),

    #[error("{0}")]
    ModelChainExhausted(ChainExhausted),

    #[error("{0}")]
    InvalidResponseFormat(#[from] RecoveryError),

    #[error("{0}")]
    RenderExhausted(#[from] RenderError),

    #[error("persistence failure: {0}")]
    Persistence(String),
}

impl From<StatusError> for PipelineError {
    fn from(e: StatusError) -> Self {
        PipelineError::Persistence(e.to_string())
    }
}

impl From<StorageError> for PipelineError {
    fn from(e: StorageError) -> Self {
        PipelineError::Persistence(e.to_string())
    }
}

impl PipelineError {
    /// Stable machine-readable code stored with the FAILED record.
    pub fn code(&self) -> &'static str {
        match self {
            PipelineError::Validation(_) => "VALIDATION_ERROR",
            PipelineError::ExtractionExhausted(ExtractionError::UnsupportedFormat(_)) => {
                "UNSUPPORTED_FORMAT"
            }
            PipelineError::ExtractionExhausted(ExtractionError::EmptyContent(_)) => "EMPTY_CONTENT",
            PipelineError::ExtractionExhausted(ExtractionError::Corrupted(_)) => "CORRUPTED",
            PipelineError::ModelChainExhausted(_) => "MODEL_CHAIN_EXHAUSTED",
            PipelineError::InvalidResponseFormat(_) => "INVALID_RESPONSE_FORMAT",
            PipelineError::RenderExhausted(_) => "RENDER_EXHAUSTED",
            PipelineError::Persistence(_) => "PERSISTENCE_FAILURE",
        }
    }

    /// Message written to the status record; says what the user can do next.
    pub fn user_message(&self) -> String {
        match self {
            PipelineError::Validation(msg) => msg.clone(),
            PipelineError::ExtractionExhausted(e) => {
                let advice = match e {
                    ExtractionError::UnsupportedFormat(_) => {
                        "Please upload a PDF, Word (.docx) or plain text resume."
                    }
                    ExtractionError::EmptyContent(_) => {
                        "No readable text was found. If the file is a scan, upload a text-based PDF or Word document."
                    }
                    ExtractionError::Corrupted(_) => {
                        "The file appears to be damaged. Re-export it from your editor and upload it again."
                    }
                };
                format!("Could not read the resume ({}). {advice}", e.cause())
            }
            PipelineError::ModelChainExhausted(_) => {
                "All AI models are currently unavailable. Please resubmit in a few minutes.".to_string()
            }
            PipelineError::InvalidResponseFormat(_) => {
                "The AI response could not be turned into a resume. Please resubmit the job."
                    .to_string()
            }
            PipelineError::RenderExhausted(_) => {
                "None of the requested output formats could be generated. Try a different format."
                    .to_string()
            }
            PipelineError::Persistence(_) => {
                "An internal storage error occurred. Please resubmit the job.".to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extraction_messages_name_the_cause() {
        let err = PipelineError::from(ExtractionError::Corrupted("bad xref".to_string()));
        assert_eq!(err.code(), "CORRUPTED");
        assert!(err.user_message().contains("(Corrupted)"));

        let err = PipelineError::from(ExtractionError::EmptyContent("3 chars".to_string()));
        assert_eq!(err.code(), "EMPTY_CONTENT");
        assert!(err.user_message().contains("(EmptyContent)"));
    }

    #[test]
    fn test_storage_errors_are_persistence_failures() {
        let err = PipelineError::from(StorageError::S3("timeout".to_string()));
        assert_eq!(err.code(), "PERSISTENCE_FAILURE");
        assert!(!err.user_message().contains("timeout"));
    }
}

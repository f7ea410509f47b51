//! Narrow interfaces to the services the pipeline consumes but does not own:
//! prompt assembly, job-posting extraction and skills normalization.

pub mod job_posting;
pub mod prompts;
pub mod skills;

use thiserror::Error;

pub use job_posting::{HttpJobPostingExtractor, JobPosting, JobPostingExtractor};
pub use prompts::{PromptAssembler, PromptInputs, TemplatePromptAssembler};
pub use skills::{HttpSkillsNormalizer, SkillsNormalizer, SkillsOutcome};

#[derive(Debug, Error)]
pub enum CollaboratorError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("service returned status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("service reported failure: {0}")]
    Rejected(String),
}

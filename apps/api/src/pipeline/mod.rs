//! Job orchestration: sequences extraction, model invocation, recovery and
//! rendering, and drives the job's status record.

pub mod ats;
pub mod cover_letter;
pub mod error;
pub mod orchestrator;

pub use error::PipelineError;
pub use orchestrator::{find_artifact, Orchestrator, PipelineDeps};

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tracing::{error, info, info_span, warn, Instrument};

use super::ats::parse_scores;
use super::cover_letter::{candidate_name, clean_spacing};
use super::PipelineError;
use crate::collaborators::{
    JobPosting, JobPostingExtractor, PromptAssembler, PromptInputs, SkillsNormalizer, SkillsOutcome,
};
use crate::extraction::ExtractionChain;
use crate::inference::ModelChain;
use crate::models::job::{ArtifactSummary, AtsScore, Job, JobStatus, OutputFormat, ResultPayload};
use crate::recovery::recover;
use crate::render::text::render_text;
use crate::render::{RenderDocument, RenderedArtifact, RendererMultiplexer};
use crate::status::{JobStatusWriter, StatusStore};
use crate::storage::{artifact_key, cover_letter_key, ArtifactStore};

/// Characters of the text rendering returned as `preview`.
const PREVIEW_CHARS: usize = 500;

/// Everything a job needs, constructed once at startup and injected.
pub struct PipelineDeps {
    pub status: Arc<dyn StatusStore>,
    pub artifacts: Arc<dyn ArtifactStore>,
    pub extraction: ExtractionChain,
    /// Resume and cover letter generation.
    pub models: ModelChain,
    /// ATS scoring.
    pub scoring: ModelChain,
    pub renderers: RendererMultiplexer,
    pub prompts: Arc<dyn PromptAssembler>,
    pub job_postings: Option<Arc<dyn JobPostingExtractor>>,
    pub skills: Option<Arc<dyn SkillsNormalizer>>,
    pub artifact_url_ttl: Duration,
}

/// Job inputs after optional job-posting enrichment.
#[derive(Debug, Clone, PartialEq)]
struct JobContext {
    job_title: String,
    job_description: Option<String>,
    company_name: Option<String>,
}

impl JobContext {
    fn from_job(job: &Job) -> Self {
        Self {
            job_title: job.job_title.clone(),
            job_description: non_blank(job.job_description.as_deref()),
            company_name: non_blank(job.company_name.as_deref()),
        }
    }

    /// Submitted values win; scraped values only fill gaps.
    fn merge(mut self, posting: JobPosting) -> Self {
        if self.job_description.is_none() {
            self.job_description = non_blank(posting.description.as_deref());
        }
        if self.company_name.is_none() {
            self.company_name = non_blank(posting.company.as_deref());
        }
        self
    }

    fn prompt_inputs<'a>(
        &'a self,
        resume_text: &'a str,
        skills: Option<&'a SkillsOutcome>,
    ) -> PromptInputs<'a> {
        PromptInputs {
            resume_text,
            job_title: &self.job_title,
            job_description: self.job_description.as_deref(),
            company_name: self.company_name.as_deref(),
            skills,
        }
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn preview(text: &str) -> String {
    text.chars().take(PREVIEW_CHARS).collect()
}

/// Runs jobs end to end and owns every status write for them.
pub struct Orchestrator {
    deps: PipelineDeps,
}

impl Orchestrator {
    pub fn new(deps: PipelineDeps) -> Self {
        Self { deps }
    }

    pub fn artifact_url_ttl(&self) -> Duration {
        self.deps.artifact_url_ttl
    }

    /// Runs `job` to a terminal status and returns it. The SUBMITTED record must
    /// already exist.
    pub async fn run(&self, job: Job) -> JobStatus {
        let span = info_span!("job", job_id = %job.job_id, user_id = %job.user_id);
        async move {
            let mut writer =
                JobStatusWriter::new(Arc::clone(&self.deps.status), job.job_id, &job.user_id);

            let failure = match self.execute(&job, &mut writer).await {
                Ok((message, payload)) => match writer.complete(message, payload).await {
                    Ok(()) => {
                        info!("Job completed");
                        return JobStatus::Completed;
                    }
                    Err(e) => PipelineError::from(e),
                },
                Err(e) => e,
            };

            error!(code = failure.code(), error = %failure, "Job failed");
            if let Err(e) = writer.fail(failure.code(), failure.user_message()).await {
                error!(error = %e, "Could not record job failure");
            }
            writer.current()
        }
        .instrument(span)
        .await
    }

    async fn execute(
        &self,
        job: &Job,
        writer: &mut JobStatusWriter,
    ) -> Result<(String, ResultPayload), PipelineError> {
        if job.job_title.trim().is_empty() {
            return Err(PipelineError::Validation("Job title is required".to_string()));
        }
        if job.output_formats.is_empty() {
            return Err(PipelineError::Validation("No output format requested".to_string()));
        }

        writer.progress("Retrieving uploaded resume").await?;
        let upload = self.deps.artifacts.get(&job.resume_key).await?;

        let mut context = JobContext::from_job(job);
        if let (Some(url), Some(extractor)) = (job.job_url.as_deref(), &self.deps.job_postings) {
            writer.progress("Extracting job details from URL").await?;
            match extractor.extract(url).await {
                Ok(posting) => {
                    info!(
                        job_url = url,
                        scraped_title = ?posting.job_title,
                        "Job posting extracted"
                    );
                    context = context.merge(posting);
                }
                Err(e) => warn!(job_url = url, error = %e, "Job posting extraction failed, continuing"),
            }
        }

        writer.progress("Extracting text from resume").await?;
        let extracted = self
            .deps
            .extraction
            .extract(upload, job.resume_file_name.as_deref())
            .await?;
        info!(
            strategy = %extracted.strategy_used,
            kind = ?extracted.document_kind,
            confidence = extracted.confidence,
            chars = extracted.text.len(),
            "Resume text extracted"
        );

        let skills = self.process_skills(&context, writer).await?;

        writer.progress("Generating optimized resume with AI").await?;
        let prompt = self
            .deps
            .prompts
            .resume_prompt(&context.prompt_inputs(&extracted.text, skills.as_ref()));
        let model_result = self
            .deps
            .models
            .invoke(&prompt)
            .await
            .map_err(PipelineError::ModelChainExhausted)?;

        writer.progress("Validating AI response").await?;
        let recovered = recover(&model_result.content)?;

        writer.progress("Rendering documents").await?;
        let document = Arc::new(RenderDocument::from_resume(&recovered.resume));
        let outcome = self
            .deps
            .renderers
            .render(Arc::clone(&document), &job.output_formats)
            .await?;
        let degraded = outcome.degraded();
        if degraded {
            warn!(
                failed = outcome.failures.len(),
                delivered = outcome.artifacts.len(),
                "Delivering a subset of the requested formats"
            );
        }

        writer.progress("Saving documents").await?;
        let mut artifacts = Vec::with_capacity(outcome.artifacts.len());
        for artifact in outcome.artifacts {
            let key = artifact_key(&job.user_id, job.job_id, artifact.format);
            let filename = format!("optimized_resume_{}.{}", job.short_id(), artifact.extension);
            artifacts.push(self.persist(key, filename, artifact).await?);
        }

        let resume_text = render_text(&document);
        let inputs = context.prompt_inputs(&resume_text, skills.as_ref());

        let cover_letter = if job.generate_cover_letter {
            writer.progress("Generating cover letter").await?;
            match self.cover_letter(job, &inputs, &recovered.resume.full_name).await {
                Ok(summary) => Some(summary),
                Err(e) => {
                    warn!(error = %e, "Cover letter generation failed, continuing without it");
                    None
                }
            }
        } else {
            None
        };

        let ats_score = match context.job_description.as_deref() {
            Some(description) => {
                writer.progress("Calculating ATS score").await?;
                self.ats_score(&resume_text, &context.job_title, description).await
            }
            None => None,
        };

        let skills_summary = skills.as_ref().and_then(SkillsOutcome::summary);
        let message = format!(
            "Resume optimization complete using {}{}",
            model_result.backend_name,
            skills_summary
                .as_deref()
                .map(|s| format!(" | Skills: {s}"))
                .unwrap_or_default()
        );

        let primary = artifacts.first().ok_or_else(|| {
            PipelineError::Persistence("no artifact was stored".to_string())
        })?;
        let payload = ResultPayload {
            artifact_url: primary.url.clone(),
            content_type: primary.content_type.clone(),
            filename: primary.filename.clone(),
            artifacts: artifacts.clone(),
            model_used: model_result.backend_name.clone(),
            cost_estimate_usd: model_result.cost_estimate_usd,
            extraction_strategy: extracted.strategy_used.clone(),
            recovery_strategy: recovered.strategy.to_string(),
            degraded,
            cover_letter,
            skills_processing_summary: skills_summary,
            ats_score,
            preview: preview(&resume_text),
        };
        Ok((message, payload))
    }

    async fn process_skills(
        &self,
        context: &JobContext,
        writer: &mut JobStatusWriter,
    ) -> Result<Option<SkillsOutcome>, PipelineError> {
        let (Some(normalizer), Some(description)) =
            (&self.deps.skills, context.job_description.as_deref())
        else {
            return Ok(None);
        };

        writer.progress("Extracting and updating skills database").await?;
        match normalizer.process(description).await {
            Ok(outcome) => {
                info!(
                    new = outcome.new_skills_added,
                    updated = outcome.existing_skills_updated,
                    "Skills processed"
                );
                Ok(Some(outcome))
            }
            Err(e) => {
                warn!(error = %e, "Skills processing failed, continuing without skills");
                Ok(None)
            }
        }
    }

    /// Stores one rendered artifact and presigns its download URL.
    async fn persist(
        &self,
        key: String,
        filename: String,
        artifact: RenderedArtifact,
    ) -> Result<ArtifactSummary, PipelineError> {
        self.deps
            .artifacts
            .put(&key, Bytes::from(artifact.bytes), artifact.content_type)
            .await?;
        let url = self
            .deps
            .artifacts
            .presign(&key, &filename, self.deps.artifact_url_ttl)
            .await?;
        info!(
            key = %key,
            renderer = %artifact.renderer,
            fallback = artifact.used_fallback,
            "Artifact stored"
        );

        Ok(ArtifactSummary {
            format: artifact.format,
            storage_key: key,
            url,
            content_type: artifact.content_type.to_string(),
            filename,
            renderer: artifact.renderer,
        })
    }

    async fn cover_letter(
        &self,
        job: &Job,
        inputs: &PromptInputs<'_>,
        full_name: &str,
    ) -> Result<ArtifactSummary, PipelineError> {
        let prompt = self.deps.prompts.cover_letter_prompt(inputs, inputs.resume_text);
        let result = self
            .deps
            .models
            .invoke(&prompt)
            .await
            .map_err(PipelineError::ModelChainExhausted)?;

        let letter = clean_spacing(&result.content);
        let document = RenderDocument::cover_letter(&candidate_name(&letter, full_name), &letter);
        let format = job.cover_letter_format;
        let outcome = self
            .deps
            .renderers
            .render(Arc::new(document), &[format])
            .await?;

        let artifact = outcome.artifacts.into_iter().next().ok_or_else(|| {
            PipelineError::Persistence("cover letter render produced no artifact".to_string())
        })?;
        let key = cover_letter_key(&job.user_id, job.job_id, format);
        let filename = format!("cover_letter_{}.{}", job.short_id(), artifact.extension);
        let summary = self.persist(key, filename, artifact).await?;
        info!(backend = %result.backend_used, "Cover letter generated");
        Ok(summary)
    }

    async fn ats_score(&self, resume_text: &str, job_title: &str, description: &str) -> Option<AtsScore> {
        let prompt = self.deps.prompts.ats_prompt(resume_text, job_title, description);
        match self.deps.scoring.invoke(&prompt).await {
            Ok(result) => {
                let scores = parse_scores(&result.content);
                if scores.is_none() {
                    warn!(backend = %result.backend_used, "ATS answer contained no score object");
                }
                scores
            }
            Err(e) => {
                warn!(error = %e, "ATS scoring failed, continuing without a score");
                None
            }
        }
    }
}

/// Picks the format a client should get when it asks for `requested`, given the
/// stored payload. Used by the download endpoint.
pub fn find_artifact(payload: &ResultPayload, requested: Option<OutputFormat>) -> Option<&ArtifactSummary> {
    match requested {
        Some(format) => payload.artifacts.iter().find(|a| a.format == format),
        None => payload.artifacts.first(),
    }
}

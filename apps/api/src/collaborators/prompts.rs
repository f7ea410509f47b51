// Prompt wording for the three model invocations a job makes.

use chrono::Utc;

use super::SkillsOutcome;
use crate::inference::Prompt;

/// System prompt for resume optimization; the answer must be a single JSON object.
pub const RESUME_SYSTEM: &str =
    "You are an expert ATS resume optimizer that preserves document formatting. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT include explanations or reasoning.";

/// Replace `{resume_text}`, `{job_title}`, `{company_name}`, `{job_description}`
/// and `{skills_text}` before sending.
pub const RESUME_PROMPT_TEMPLATE: &str = r#"Rewrite the resume below so it targets the role of {job_title}.

Rules:
- Keep every employer, date, degree and institution exactly as in the original.
- Keep the same number of bullets per role; rewrite them with strong action verbs and measurable outcomes.
- Work ATS keywords from the job requirements in naturally. Never invent experience.
- Write the summary as an established {job_title}, without transition language.

<resume_data>
Original Resume: {resume_text}

Target Job: {job_title}
Target Company: {company_name}
Job Requirements: {job_description}
Prioritized Skills:
{skills_text}
</resume_data>

Return ONLY a JSON object with this EXACT structure:
{
  "full_name": "Exact name from resume",
  "contact_info": "Email | Phone | Location",
  "professional_summary": "ATS-optimized summary",
  "skills": ["Skill"],
  "experience": [
    {
      "title": "Job title",
      "company": "Exact company name from original",
      "location": "City, State or empty",
      "dates": "Exact dates from original or empty",
      "achievements": ["Optimized bullet"]
    }
  ],
  "education": [
    {
      "degree": "Exact degree from original",
      "institution": "Exact institution from original",
      "dates": "Exact dates or empty",
      "details": "GPA, honors, etc. or empty"
    }
  ]
}

CRITICAL: Return ONLY the JSON object. No markdown, no code fences, no commentary."#;

pub const COVER_LETTER_SYSTEM: &str =
    "You are a professional career writer. Return only the finished cover letter text.";

/// Replace `{date}`, `{job_title}`, `{company_name}`, `{job_description}` and `{resume_text}`.
pub const COVER_LETTER_PROMPT_TEMPLATE: &str = r#"Write a professional cover letter for the {job_title} position at {company_name}.

Requirements:
1. Date the letter {date}.
2. Take the candidate's name, email, phone and location from the resume.
3. No placeholders such as [Company Address] or [X years].
4. Be accurate about years of experience: total career years versus years in a specific title.
5. Three to four paragraphs, separated by one blank line, closing with "Regards," and the candidate's name.

Job Description: {job_description}

Resume Content:
{resume_text}

Return ONLY the cover letter text, starting with the candidate's name. No JSON, no markdown, no reasoning."#;

pub const ATS_SYSTEM: &str =
    "You are an ATS scoring expert. Respond only with valid JSON containing numeric scores 0-100.";

/// Replace `{job_title}`, `{job_description}` and `{resume_text}`.
pub const ATS_PROMPT_TEMPLATE: &str = r#"Analyze the following resume against the job requirements and provide ATS compatibility scores.

JOB TITLE: {job_title}

JOB REQUIREMENTS:
{job_description}

RESUME TO ANALYZE:
{resume_text}

Provide scores (0-100) for each category and respond in this EXACT JSON format:
{"overall": 85, "keywords": 90, "skills": 80, "experience": 85, "format": 95}"#;

const NO_DESCRIPTION: &str =
    "No specific job description provided - focus on general qualifications for the role";
/// Resume characters quoted in the cover letter prompt.
const COVER_LETTER_RESUME_CHARS: usize = 2000;

pub struct PromptInputs<'a> {
    pub resume_text: &'a str,
    pub job_title: &'a str,
    pub job_description: Option<&'a str>,
    pub company_name: Option<&'a str>,
    pub skills: Option<&'a SkillsOutcome>,
}

/// Builds the prompts for one job. Wording lives here, not in the pipeline.
pub trait PromptAssembler: Send + Sync {
    fn resume_prompt(&self, inputs: &PromptInputs<'_>) -> Prompt;

    /// `resume_text` is the optimized resume rendered as plain text.
    fn cover_letter_prompt(&self, inputs: &PromptInputs<'_>, resume_text: &str) -> Prompt;

    fn ats_prompt(&self, resume_text: &str, job_title: &str, job_description: &str) -> Prompt;
}

pub struct TemplatePromptAssembler;

fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((index, _)) => &text[..index],
        None => text,
    }
}

impl PromptAssembler for TemplatePromptAssembler {
    fn resume_prompt(&self, inputs: &PromptInputs<'_>) -> Prompt {
        let skills_text = inputs
            .skills
            .and_then(SkillsOutcome::prompt_text)
            .unwrap_or_else(|| "Not specified".to_string());

        let user = RESUME_PROMPT_TEMPLATE
            .replace("{job_title}", inputs.job_title)
            .replace("{company_name}", inputs.company_name.unwrap_or("Not specified"))
            .replace("{job_description}", inputs.job_description.unwrap_or(NO_DESCRIPTION))
            .replace("{skills_text}", &skills_text)
            .replace("{resume_text}", inputs.resume_text);

        Prompt::new(user)
            .with_system(RESUME_SYSTEM)
            .with_temperature(0.3)
    }

    fn cover_letter_prompt(&self, inputs: &PromptInputs<'_>, resume_text: &str) -> Prompt {
        let date = Utc::now().format("%B %d, %Y").to_string();
        let user = COVER_LETTER_PROMPT_TEMPLATE
            .replace("{date}", &date)
            .replace("{job_title}", inputs.job_title)
            .replace("{company_name}", inputs.company_name.unwrap_or("the company"))
            .replace("{job_description}", inputs.job_description.unwrap_or(NO_DESCRIPTION))
            .replace("{resume_text}", truncate_chars(resume_text, COVER_LETTER_RESUME_CHARS));

        Prompt::new(user)
            .with_system(COVER_LETTER_SYSTEM)
            .with_temperature(0.7)
    }

    fn ats_prompt(&self, resume_text: &str, job_title: &str, job_description: &str) -> Prompt {
        let user = ATS_PROMPT_TEMPLATE
            .replace("{job_title}", job_title)
            .replace("{job_description}", job_description)
            .replace("{resume_text}", resume_text);

        Prompt::new(user)
            .with_system(ATS_SYSTEM)
            .with_temperature(0.1)
            .with_max_tokens(200)
            .with_min_response_chars(20)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inputs<'a>(description: Option<&'a str>) -> PromptInputs<'a> {
        PromptInputs {
            resume_text: "Ada Lovelace\nData Engineer",
            job_title: "Senior Data Engineer",
            job_description: description,
            company_name: None,
            skills: None,
        }
    }

    #[test]
    fn test_resume_prompt_fills_every_placeholder() {
        let prompt = TemplatePromptAssembler.resume_prompt(&inputs(None));
        assert!(prompt.user.contains("Target Job: Senior Data Engineer"));
        assert!(prompt.user.contains(NO_DESCRIPTION));
        for placeholder in ["{job_title}", "{resume_text}", "{skills_text}", "{company_name}"] {
            assert!(!prompt.user.contains(placeholder), "{placeholder} left in prompt");
        }
        assert_eq!(prompt.system.as_deref(), Some(RESUME_SYSTEM));
    }

    #[test]
    fn test_cover_letter_prompt_truncates_resume() {
        let long = "é".repeat(3000);
        let prompt = TemplatePromptAssembler.cover_letter_prompt(&inputs(Some("Build pipelines")), &long);
        assert!(prompt.user.contains(&"é".repeat(2000)));
        assert!(!prompt.user.contains(&"é".repeat(2001)));
    }

    #[test]
    fn test_ats_prompt_is_small() {
        let prompt = TemplatePromptAssembler.ats_prompt("resume", "Engineer", "Rust");
        assert_eq!(prompt.max_tokens, Some(200));
        assert_eq!(prompt.min_response_chars, 20);
    }
}

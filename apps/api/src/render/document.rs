use crate::models::resume::StructuredResume;

/// Format-neutral layout element. Every renderer understands exactly these.
#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    Title(String),
    /// Contact line under the title.
    Subtitle(String),
    Heading(String),
    Paragraph(String),
    Bullet(String),
    /// Left text with right-aligned companion (title / dates).
    Row { left: String, right: String },
    Spacer,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderDocument {
    /// Document title metadata.
    pub title: String,
    pub blocks: Vec<Block>,
}

impl RenderDocument {
    pub fn new(title: impl Into<String>, blocks: Vec<Block>) -> Self {
        Self {
            title: title.into(),
            blocks,
        }
    }

    pub fn from_resume(resume: &StructuredResume) -> Self {
        let mut blocks = vec![
            Block::Title(resume.full_name.trim().to_string()),
            Block::Subtitle(resume.contact_info.trim().to_string()),
            Block::Heading("PROFESSIONAL SUMMARY".to_string()),
            Block::Paragraph(resume.professional_summary.trim().to_string()),
            Block::Spacer,
        ];

        if !resume.skills.is_empty() {
            blocks.push(Block::Heading("SKILLS".to_string()));
            blocks.extend(resume.skills.iter().map(|s| Block::Bullet(s.trim().to_string())));
            blocks.push(Block::Spacer);
        }

        if !resume.experience.is_empty() {
            blocks.push(Block::Heading("EXPERIENCE".to_string()));
            for job in &resume.experience {
                blocks.push(Block::Row {
                    left: job.title.clone(),
                    right: job.dates.clone(),
                });
                blocks.push(Block::Row {
                    left: job.company.clone(),
                    right: job.location.clone().unwrap_or_default(),
                });
                blocks.extend(job.achievements.iter().map(|a| Block::Bullet(a.clone())));
                blocks.push(Block::Spacer);
            }
        }

        if !resume.education.is_empty() {
            blocks.push(Block::Heading("EDUCATION".to_string()));
            for edu in &resume.education {
                blocks.push(Block::Row {
                    left: format!("{} | {}", edu.degree, edu.institution),
                    right: edu.dates.clone(),
                });
                if let Some(details) = edu.details.as_deref().filter(|d| !d.trim().is_empty()) {
                    blocks.push(Block::Paragraph(details.trim().to_string()));
                }
                blocks.push(Block::Spacer);
            }
        }

        for (heading, lines) in resume.extra_sections() {
            blocks.push(Block::Heading(heading));
            blocks.extend(lines.into_iter().map(Block::Bullet));
            blocks.push(Block::Spacer);
        }

        while blocks.last() == Some(&Block::Spacer) {
            blocks.pop();
        }

        Self::new(format!("{} - Resume", resume.full_name.trim()), blocks)
    }

    /// Cover letter body split into paragraphs on blank lines.
    pub fn cover_letter(candidate: &str, body: &str) -> Self {
        let blocks = body
            .split("\n\n")
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(|p| Block::Paragraph(p.to_string()))
            .collect();
        Self::new(format!("{candidate} - Cover Letter"), blocks)
    }
}

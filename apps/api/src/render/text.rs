use super::{Block, RenderDocument, Renderer};
use crate::chain::{AttemptError, ChainMember};

/// Column where right-hand row text starts in the aligned layout.
const ALIGN_COLUMN: usize = 60;
const RULE_WIDTH: usize = 80;

/// Plain-text layout: underlined headings, `•` bullets, dates aligned at column 60.
pub fn render_text(document: &RenderDocument) -> String {
    let mut out = String::new();
    for block in &document.blocks {
        match block {
            Block::Title(text) => {
                out.push_str(text);
                out.push('\n');
            }
            Block::Subtitle(text) => {
                out.push_str(text);
                out.push_str("\n\n");
                out.push_str(&"=".repeat(RULE_WIDTH));
                out.push_str("\n\n");
            }
            Block::Heading(text) => {
                out.push_str(text);
                out.push('\n');
                out.push_str(&"-".repeat(text.chars().count()));
                out.push('\n');
            }
            Block::Paragraph(text) => {
                out.push_str(text);
                out.push('\n');
            }
            Block::Bullet(text) => {
                out.push_str("• ");
                out.push_str(text);
                out.push('\n');
            }
            Block::Row { left, right } if right.is_empty() => {
                out.push_str(left);
                out.push('\n');
            }
            Block::Row { left, right } => {
                let spacing = ALIGN_COLUMN.saturating_sub(left.chars().count()).max(1);
                out.push_str(left);
                out.push_str(&" ".repeat(spacing));
                out.push_str(right);
                out.push('\n');
            }
            Block::Spacer => out.push('\n'),
        }
    }
    out
}

/// One line per block, no alignment.
pub fn render_compact_text(document: &RenderDocument) -> String {
    let lines: Vec<String> = document
        .blocks
        .iter()
        .map(|block| match block {
            Block::Title(text) | Block::Subtitle(text) | Block::Paragraph(text) => text.clone(),
            Block::Heading(text) => format!("\n{}", text.to_uppercase()),
            Block::Bullet(text) => format!("- {text}"),
            Block::Row { left, right } if right.is_empty() => left.clone(),
            Block::Row { left, right } => format!("{left} ({right})"),
            Block::Spacer => String::new(),
        })
        .collect();
    let mut text = lines.join("\n");
    text.push('\n');
    text
}

pub struct TextRenderer;

impl ChainMember for TextRenderer {
    fn id(&self) -> &str {
        "text-aligned"
    }
}

impl Renderer for TextRenderer {
    fn content_type(&self) -> &'static str {
        "text/plain; charset=utf-8"
    }

    fn extension(&self) -> &'static str {
        "txt"
    }

    fn render(&self, document: &RenderDocument) -> Result<Vec<u8>, AttemptError> {
        Ok(render_text(document).into_bytes())
    }
}

pub struct CompactTextRenderer;

impl ChainMember for CompactTextRenderer {
    fn id(&self) -> &str {
        "text-compact"
    }
}

impl Renderer for CompactTextRenderer {
    fn content_type(&self) -> &'static str {
        "text/plain; charset=utf-8"
    }

    fn extension(&self) -> &'static str {
        "txt"
    }

    fn render(&self, document: &RenderDocument) -> Result<Vec<u8>, AttemptError> {
        Ok(render_compact_text(document).into_bytes())
    }
}

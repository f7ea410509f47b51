//! PDF renderers built directly on `lopdf`.

use lopdf::{dictionary, Document, Object, Stream};

use super::text::render_text;
use super::{Block, RenderDocument, Renderer};
use crate::chain::{AttemptError, ChainMember};

const PAGE_WIDTH: f32 = 612.0;
const PAGE_HEIGHT: f32 = 792.0;
const MARGIN: f32 = 54.0;
/// Average Helvetica glyph width as a fraction of the font size.
const HELVETICA_WIDTH: f32 = 0.5;
const COURIER_WIDTH: f32 = 0.6;

#[derive(Debug, Clone, Copy)]
enum Font {
    Regular,
    Bold,
    Mono,
}

impl Font {
    fn resource(&self) -> &'static str {
        match self {
            Font::Regular => "F1",
            Font::Bold => "F2",
            Font::Mono => "F3",
        }
    }

    fn width_factor(&self) -> f32 {
        match self {
            Font::Mono => COURIER_WIDTH,
            _ => HELVETICA_WIDTH,
        }
    }
}

/// Accumulates positioned text into page content streams.
struct PageWriter {
    pages: Vec<String>,
    current: String,
    y: f32,
}

impl PageWriter {
    fn new() -> Self {
        Self {
            pages: Vec::new(),
            current: String::new(),
            y: PAGE_HEIGHT - MARGIN,
        }
    }

    /// Moves down by `height`, starting a new page when the bottom margin is reached.
    fn advance(&mut self, height: f32) {
        if self.y - height < MARGIN {
            self.break_page();
        }
        self.y -= height;
    }

    fn break_page(&mut self) {
        self.pages.push(std::mem::take(&mut self.current));
        self.y = PAGE_HEIGHT - MARGIN;
    }

    fn text(&mut self, font: Font, size: f32, x: f32, text: &str) {
        self.current.push_str(&format!(
            "BT /{} {size} Tf {x:.1} {:.1} Td ({}) Tj ET\n",
            font.resource(),
            self.y,
            escape_pdf_string(text)
        ));
    }

    fn rule(&mut self) {
        let y = self.y - 3.0;
        self.current.push_str(&format!(
            "0.5 w {MARGIN:.1} {y:.1} m {:.1} {y:.1} l S\n",
            PAGE_WIDTH - MARGIN
        ));
    }

    fn finish(mut self) -> Vec<String> {
        if !self.current.is_empty() || self.pages.is_empty() {
            self.pages.push(self.current);
        }
        self.pages
    }
}

fn text_width(text: &str, font: Font, size: f32) -> f32 {
    text.chars().count() as f32 * size * font.width_factor()
}

/// Greedy word wrap to `max_width` points.
fn wrap(text: &str, font: Font, size: f32, max_width: f32) -> Vec<String> {
    let max_chars = ((max_width / (size * font.width_factor())) as usize).max(10);
    let mut lines = Vec::new();
    for source_line in text.lines() {
        let mut line = String::new();
        for word in source_line.split_whitespace() {
            if !line.is_empty() && line.chars().count() + 1 + word.chars().count() > max_chars {
                lines.push(std::mem::take(&mut line));
            }
            if !line.is_empty() {
                line.push(' ');
            }
            line.push_str(word);
        }
        lines.push(line);
    }
    lines
}

/// Escapes a string for a PDF literal, mapping typographic characters into
/// WinAnsiEncoding and everything else outside Latin-1 to `?`.
fn escape_pdf_string(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '(' => out.push_str("\\("),
            ')' => out.push_str("\\)"),
            c if c.is_ascii_graphic() || c == ' ' => out.push(c),
            '•' => out.push_str("\\225"),
            '–' => out.push_str("\\226"),
            '—' => out.push_str("\\227"),
            '‘' => out.push_str("\\221"),
            '’' => out.push_str("\\222"),
            '“' => out.push_str("\\223"),
            '”' => out.push_str("\\224"),
            c if ('\u{A0}'..='\u{FF}').contains(&c) => {
                out.push_str(&format!("\\{:03o}", c as u32));
            }
            c if c.is_whitespace() => out.push(' '),
            _ => out.push('?'),
        }
    }
    out
}

/// Assembles content streams into a PDF file with the three standard fonts.
fn assemble(title: &str, pages: Vec<String>) -> Result<Vec<u8>, AttemptError> {
    let mut doc = Document::with_version("1.5");

    let pages_id = doc.new_object_id();
    let font = |name: &str| {
        dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => Object::Name(name.as_bytes().to_vec()),
            "Encoding" => "WinAnsiEncoding",
        }
    };
    let regular_id = doc.add_object(font("Helvetica"));
    let bold_id = doc.add_object(font("Helvetica-Bold"));
    let mono_id = doc.add_object(font("Courier"));
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => regular_id,
            "F2" => bold_id,
            "F3" => mono_id,
        },
    });

    let mut page_ids = Vec::with_capacity(pages.len());
    for content in pages {
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.into_bytes()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            "Resources" => resources_id,
            "Contents" => content_id,
        });
        page_ids.push(page_id);
    }

    let kids: Vec<Object> = page_ids.iter().map(|id| (*id).into()).collect();
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => page_ids.len() as i64,
        }),
    );

    let info_id = doc.add_object(dictionary! {
        "Title" => Object::string_literal(title.chars().filter(char::is_ascii).collect::<String>()),
        "Producer" => Object::string_literal("tailor"),
    });
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.trailer.set("Info", info_id);

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer)
        .map_err(|e| AttemptError::unexpected(format!("PDF serialization failed: {e}")))?;
    Ok(buffer)
}

// ────────────────────────────────────────────────────────────────────────────
// Layout renderer
// ────────────────────────────────────────────────────────────────────────────

/// Typeset resume: bold centered title, ruled headings, hanging bullets and
/// right-aligned dates.
pub struct LayoutPdfRenderer;

impl LayoutPdfRenderer {
    fn layout(document: &RenderDocument) -> Vec<String> {
        let usable = PAGE_WIDTH - 2.0 * MARGIN;
        let mut page = PageWriter::new();

        for block in &document.blocks {
            match block {
                Block::Title(text) => {
                    page.advance(20.0);
                    let x = ((PAGE_WIDTH - text_width(text, Font::Bold, 18.0)) / 2.0).max(MARGIN);
                    page.text(Font::Bold, 18.0, x, text);
                }
                Block::Subtitle(text) => {
                    for line in wrap(text, Font::Regular, 10.0, usable) {
                        page.advance(14.0);
                        let x = ((PAGE_WIDTH - text_width(&line, Font::Regular, 10.0)) / 2.0)
                            .max(MARGIN);
                        page.text(Font::Regular, 10.0, x, &line);
                    }
                    page.advance(6.0);
                }
                Block::Heading(text) => {
                    page.advance(22.0);
                    page.text(Font::Bold, 12.0, MARGIN, text);
                    page.rule();
                    page.advance(4.0);
                }
                Block::Paragraph(text) => {
                    for line in wrap(text, Font::Regular, 10.0, usable) {
                        page.advance(13.0);
                        page.text(Font::Regular, 10.0, MARGIN, &line);
                    }
                }
                Block::Bullet(text) => {
                    let indent = 14.0;
                    for (i, line) in wrap(text, Font::Regular, 10.0, usable - indent)
                        .iter()
                        .enumerate()
                    {
                        page.advance(13.0);
                        if i == 0 {
                            page.text(Font::Regular, 10.0, MARGIN + 2.0, "•");
                        }
                        page.text(Font::Regular, 10.0, MARGIN + indent, line);
                    }
                }
                Block::Row { left, right } => {
                    page.advance(14.0);
                    page.text(Font::Bold, 10.5, MARGIN, left);
                    if !right.is_empty() {
                        let x = PAGE_WIDTH - MARGIN - text_width(right, Font::Regular, 10.0);
                        page.text(Font::Regular, 10.0, x, right);
                    }
                }
                Block::Spacer => page.advance(6.0),
            }
        }
        page.finish()
    }
}

impl ChainMember for LayoutPdfRenderer {
    fn id(&self) -> &str {
        "pdf-layout"
    }
}

impl Renderer for LayoutPdfRenderer {
    fn content_type(&self) -> &'static str {
        "application/pdf"
    }

    fn extension(&self) -> &'static str {
        "pdf"
    }

    fn render(&self, document: &RenderDocument) -> Result<Vec<u8>, AttemptError> {
        assemble(&document.title, Self::layout(document))
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Plain renderer
// ────────────────────────────────────────────────────────────────────────────

/// Monospaced dump of the text layout, 60 lines per page.
pub struct PlainPdfRenderer;

const PLAIN_LINES_PER_PAGE: usize = 60;
const PLAIN_FONT_SIZE: f32 = 9.0;
const PLAIN_LEADING: f32 = 11.5;

impl ChainMember for PlainPdfRenderer {
    fn id(&self) -> &str {
        "pdf-plain"
    }
}

impl Renderer for PlainPdfRenderer {
    fn content_type(&self) -> &'static str {
        "application/pdf"
    }

    fn extension(&self) -> &'static str {
        "pdf"
    }

    fn render(&self, document: &RenderDocument) -> Result<Vec<u8>, AttemptError> {
        let usable = PAGE_WIDTH - 2.0 * MARGIN;
        let lines: Vec<String> = render_text(document)
            .lines()
            .flat_map(|line| {
                if line.trim().is_empty() {
                    vec![String::new()]
                } else {
                    wrap(line, Font::Mono, PLAIN_FONT_SIZE, usable)
                }
            })
            .collect();

        let pages = lines
            .chunks(PLAIN_LINES_PER_PAGE)
            .map(|chunk| {
                let mut content = format!(
                    "BT /F3 {PLAIN_FONT_SIZE} Tf {PLAIN_LEADING} TL {MARGIN:.1} {:.1} Td\n",
                    PAGE_HEIGHT - MARGIN
                );
                for line in chunk {
                    content.push_str(&format!("({}) Tj T*\n", escape_pdf_string(line)));
                }
                content.push_str("ET\n");
                content
            })
            .collect();

        assemble(&document.title, pages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::resume::sample_resume;

    #[test]
    fn test_escape_pdf_string() {
        assert_eq!(escape_pdf_string("a(b)\\c"), "a\\(b\\)\\\\c");
        assert_eq!(escape_pdf_string("• café – ok"), "\\225 caf\\351 \\226 ok");
        assert_eq!(escape_pdf_string("日本"), "??");
    }

    #[test]
    fn test_wrap_respects_width() {
        let text = "word ".repeat(60);
        let lines = wrap(&text, Font::Regular, 10.0, 200.0);
        assert!(lines.len() > 1);
        assert!(lines.iter().all(|l| l.chars().count() <= 40));
    }

    #[test]
    fn test_layout_renderer_produces_loadable_pdf() {
        let doc = RenderDocument::from_resume(&sample_resume());
        let bytes = LayoutPdfRenderer.render(&doc).unwrap();
        assert!(bytes.starts_with(b"%PDF-1.5"));
        let parsed = Document::load_mem(&bytes).unwrap();
        assert_eq!(parsed.get_pages().len(), 1);
    }

    #[test]
    fn test_long_documents_paginate() {
        let mut blocks = vec![Block::Title("Ada".to_string())];
        blocks.extend((0..200).map(|i| Block::Bullet(format!("Achievement number {i}"))));
        let doc = RenderDocument::new("Long", blocks);

        let layout = Document::load_mem(&LayoutPdfRenderer.render(&doc).unwrap()).unwrap();
        let plain = Document::load_mem(&PlainPdfRenderer.render(&doc).unwrap()).unwrap();
        assert!(layout.get_pages().len() >= 4);
        assert_eq!(plain.get_pages().len(), 4);
    }
}

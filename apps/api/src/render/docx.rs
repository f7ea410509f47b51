//! Minimal WordprocessingML package writer.

use std::io::{Cursor, Write};

use quick_xml::escape::escape;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use super::{Block, RenderDocument, Renderer};
use crate::chain::{AttemptError, ChainMember};

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
<Default Extension="xml" ContentType="application/xml"/>
<Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/>
<Override PartName="/docProps/core.xml" ContentType="application/vnd.openxmlformats-package.core-properties+xml"/>
</Types>"#;

const ROOT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/>
<Relationship Id="rId2" Type="http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties" Target="docProps/core.xml"/>
</Relationships>"#;

/// Right tab stop at the text margin of a letter page with 0.75" margins, in twips.
const RIGHT_TAB_TWIPS: u32 = 10_080;

fn run(text: &str, bold: bool, size_half_points: u32) -> String {
    let mut props = String::new();
    if bold {
        props.push_str("<w:b/>");
    }
    props.push_str(&format!("<w:sz w:val=\"{size_half_points}\"/>"));
    // XML 1.0 forbids most control characters in text content.
    let text: String = text
        .chars()
        .filter(|c| !c.is_control() || matches!(c, '\t' | '\n'))
        .collect();
    format!(
        "<w:r><w:rPr>{props}</w:rPr><w:t xml:space=\"preserve\">{}</w:t></w:r>",
        escape(text.as_str())
    )
}

/// Runs separated by `<w:br/>` for embedded newlines.
fn multiline_runs(text: &str, bold: bool, size: u32) -> String {
    text.split('\n')
        .map(|line| run(line, bold, size))
        .collect::<Vec<_>>()
        .join("<w:r><w:br/></w:r>")
}

fn paragraph(props: &str, runs: &str) -> String {
    format!("<w:p><w:pPr>{props}</w:pPr>{runs}</w:p>")
}

fn body_xml(document: &RenderDocument) -> String {
    let mut body = String::new();
    for block in &document.blocks {
        let xml = match block {
            Block::Title(text) => paragraph(
                "<w:jc w:val=\"center\"/><w:spacing w:after=\"60\"/>",
                &run(text, true, 36),
            ),
            Block::Subtitle(text) => paragraph(
                "<w:jc w:val=\"center\"/><w:spacing w:after=\"200\"/>",
                &run(text, false, 20),
            ),
            Block::Heading(text) => paragraph(
                "<w:pBdr><w:bottom w:val=\"single\" w:sz=\"6\" w:space=\"1\" w:color=\"auto\"/></w:pBdr>\
                 <w:spacing w:before=\"240\" w:after=\"80\"/>",
                &run(text, true, 24),
            ),
            Block::Paragraph(text) => {
                paragraph("<w:spacing w:after=\"80\"/>", &multiline_runs(text, false, 21))
            }
            Block::Bullet(text) => paragraph(
                "<w:ind w:left=\"360\" w:hanging=\"240\"/>",
                &run(&format!("•\u{a0}{text}"), false, 21),
            ),
            Block::Row { left, right } => {
                let mut runs = run(left, true, 21);
                if !right.is_empty() {
                    runs.push_str("<w:r><w:tab/></w:r>");
                    runs.push_str(&run(right, false, 21));
                }
                paragraph(
                    &format!("<w:tabs><w:tab w:val=\"right\" w:pos=\"{RIGHT_TAB_TWIPS}\"/></w:tabs>"),
                    &runs,
                )
            }
            Block::Spacer => "<w:p/>".to_string(),
        };
        body.push_str(&xml);
        body.push('\n');
    }
    body
}

fn document_xml(document: &RenderDocument) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
<w:body>
{}<w:sectPr><w:pgSz w:w="12240" w:h="15840"/><w:pgMar w:top="1080" w:right="1080" w:bottom="1080" w:left="1080" w:header="720" w:footer="720" w:gutter="0"/></w:sectPr>
</w:body>
</w:document>"#,
        body_xml(document)
    )
}

fn core_xml(document: &RenderDocument) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<cp:coreProperties xmlns:cp="http://schemas.openxmlformats.org/package/2006/metadata/core-properties" xmlns:dc="http://purl.org/dc/elements/1.1/">
<dc:title>{}</dc:title>
<dc:creator>tailor</dc:creator>
</cp:coreProperties>"#,
        escape(document.title.as_str())
    )
}

/// Packages `document` as a `.docx` file.
pub fn build_docx(document: &RenderDocument) -> Result<Vec<u8>, AttemptError> {
    let parts = [
        ("[Content_Types].xml", CONTENT_TYPES.to_string()),
        ("_rels/.rels", ROOT_RELS.to_string()),
        ("docProps/core.xml", core_xml(document)),
        ("word/document.xml", document_xml(document)),
    ];

    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, content) in parts {
        writer
            .start_file(name, options)
            .map_err(|e| AttemptError::unexpected(format!("failed to add {name}: {e}")))?;
        writer
            .write_all(content.as_bytes())
            .map_err(|e| AttemptError::unexpected(format!("failed to write {name}: {e}")))?;
    }
    let cursor = writer
        .finish()
        .map_err(|e| AttemptError::unexpected(format!("failed to finish DOCX: {e}")))?;
    Ok(cursor.into_inner())
}

pub struct DocxRenderer;

impl ChainMember for DocxRenderer {
    fn id(&self) -> &str {
        "docx"
    }
}

impl Renderer for DocxRenderer {
    fn content_type(&self) -> &'static str {
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
    }

    fn extension(&self) -> &'static str {
        "docx"
    }

    fn render(&self, document: &RenderDocument) -> Result<Vec<u8>, AttemptError> {
        build_docx(document)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::resume::sample_resume;
    use std::io::Read;

    fn read_part(bytes: &[u8], name: &str) -> String {
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut part = archive.by_name(name).unwrap();
        let mut xml = String::new();
        part.read_to_string(&mut xml).unwrap();
        xml
    }

    #[test]
    fn test_package_has_required_parts() {
        let bytes = build_docx(&RenderDocument::from_resume(&sample_resume())).unwrap();
        assert!(bytes.starts_with(b"PK"));

        let archive = zip::ZipArchive::new(Cursor::new(bytes.as_slice())).unwrap();
        let names: Vec<&str> = archive.file_names().collect();
        for required in ["[Content_Types].xml", "_rels/.rels", "word/document.xml"] {
            assert!(names.contains(&required), "missing {required}");
        }
    }

    #[test]
    fn test_rows_use_right_tab_and_text_is_escaped() {
        let doc = RenderDocument::new(
            "R&D",
            vec![Block::Row {
                left: "Engineer <R&D>".to_string(),
                right: "2020".to_string(),
            }],
        );
        let xml = read_part(&build_docx(&doc).unwrap(), "word/document.xml");
        assert!(xml.contains("w:val=\"right\""));
        assert!(xml.contains("Engineer &lt;R&amp;D&gt;"));
        assert!(xml.contains("<w:r><w:tab/></w:r>"));
    }

    #[test]
    fn test_control_characters_are_dropped_from_runs() {
        let doc = RenderDocument::new(
            "Resume",
            vec![Block::Paragraph("Led\u{7} migration\u{1b} to\tRust".to_string())],
        );
        let xml = read_part(&build_docx(&doc).unwrap(), "word/document.xml");
        assert!(!xml.contains('\u{7}'));
        assert!(!xml.contains('\u{1b}'));
        assert!(xml.contains("Led migration to\tRust"));
    }

    #[test]
    fn test_paragraph_newlines_become_breaks() {
        let doc = RenderDocument::new("Letter", vec![Block::Paragraph("Regards,\nAda".to_string())]);
        let xml = read_part(&build_docx(&doc).unwrap(), "word/document.xml");
        assert!(xml.contains("<w:br/>"));
    }
}

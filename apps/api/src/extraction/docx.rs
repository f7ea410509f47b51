use std::io::{Cursor, Read, Seek};

use async_trait::async_trait;
use quick_xml::events::Event;
use quick_xml::Reader;

use super::{DocumentKind, ExtractionStrategy, SourceDocument};
use crate::chain::{blocking_attempt, AttemptError, ChainMember, FailureClass};

/// Reads the main WordprocessingML part of a DOCX package.
pub struct OoxmlStrategy;

impl ChainMember for OoxmlStrategy {
    fn id(&self) -> &str {
        "ooxml"
    }
}

#[async_trait]
impl ExtractionStrategy for OoxmlStrategy {
    fn confidence(&self) -> f32 {
        1.0
    }

    fn supports(&self, kind: DocumentKind) -> bool {
        kind == DocumentKind::Docx
    }

    async fn extract(&self, document: &SourceDocument) -> Result<String, AttemptError> {
        let bytes = document.bytes.clone();
        blocking_attempt(FailureClass::Corrupt, move || {
            let mut archive = zip::ZipArchive::new(Cursor::new(bytes))
                .map_err(|e| AttemptError::corrupt(format!("failed to open DOCX: {e}")))?;
            extract_docx_text(&mut archive)
        })
        .await
    }
}

fn extract_docx_text<R: Read + Seek>(
    archive: &mut zip::ZipArchive<R>,
) -> Result<String, AttemptError> {
    let mut document_xml = archive
        .by_name("word/document.xml")
        .map_err(|e| AttemptError::corrupt(format!("failed to find document.xml: {e}")))?;

    let mut xml_content = String::new();
    document_xml
        .read_to_string(&mut xml_content)
        .map_err(|e| AttemptError::corrupt(format!("failed to read document.xml: {e}")))?;

    parse_document_xml(&xml_content)
}

/// Collects `<w:t>` text, one line per `<w:p>`, honouring tabs and breaks inside runs.
fn parse_document_xml(xml: &str) -> Result<String, AttemptError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(false);

    let mut text = String::new();
    let mut in_text_element = false;
    let mut in_run = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => match e.local_name().as_ref() {
                b"t" => in_text_element = true,
                b"r" => in_run = true,
                _ => {}
            },
            // Tab stops in paragraph properties are also `<w:tab/>`; only runs carry text.
            Ok(Event::Empty(ref e)) if in_run => match e.local_name().as_ref() {
                b"tab" => text.push('\t'),
                b"br" | b"cr" => text.push('\n'),
                _ => {}
            },
            Ok(Event::End(ref e)) => match e.local_name().as_ref() {
                b"t" => in_text_element = false,
                b"r" => in_run = false,
                b"p" => text.push('\n'),
                _ => {}
            },
            Ok(Event::Text(e)) => {
                if in_text_element {
                    let decoded = e.decode().unwrap_or_default();
                    text.push_str(&decoded);
                }
            }
            // Entity references arrive as their own events.
            Ok(Event::GeneralRef(e)) if in_text_element => match e.as_ref() {
                b"amp" => text.push('&'),
                b"lt" => text.push('<'),
                b"gt" => text.push('>'),
                b"quot" => text.push('"'),
                b"apos" => text.push('\''),
                _ => {
                    if let Ok(Some(c)) = e.resolve_char_ref() {
                        text.push(c);
                    }
                }
            },
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(AttemptError::corrupt(format!("XML parsing error: {e}")));
            }
            _ => {}
        }
    }

    Ok(text)
}

use super::{Block, RenderDocument, Renderer};
use crate::chain::{AttemptError, ChainMember};

/// Rich Text Format rendering; opens in Word when the DOCX package cannot be built.
pub struct RtfRenderer;

/// Escapes RTF control characters; non-ASCII goes out as `\uN?`.
fn escape_rtf(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '{' => out.push_str("\\{"),
            '}' => out.push_str("\\}"),
            '\n' => out.push_str("\\line "),
            '\t' => out.push_str("\\tab "),
            c if c.is_ascii() => out.push(c),
            c => {
                // RTF \u takes a signed 16-bit value; astral characters become surrogate pairs.
                let mut units = [0u16; 2];
                for unit in c.encode_utf16(&mut units) {
                    out.push_str(&format!("\\u{}?", *unit as i16));
                }
            }
        }
    }
    out
}

pub fn build_rtf(document: &RenderDocument) -> String {
    let mut out = String::from(
        "{\\rtf1\\ansi\\deff0{\\fonttbl{\\f0\\fswiss Helvetica;}}\\paperw12240\\paperh15840\\margl1080\\margr1080\\margt1080\\margb1080\n",
    );
    for block in &document.blocks {
        let line = match block {
            Block::Title(text) => format!("\\pard\\qc\\b\\fs36 {}\\b0\\par\n", escape_rtf(text)),
            Block::Subtitle(text) => format!("\\pard\\qc\\fs20 {}\\par\\pard\\par\n", escape_rtf(text)),
            Block::Heading(text) => format!(
                "\\pard\\sb240\\brdrb\\brdrs\\brdrw10\\b\\fs24 {}\\b0\\par\n",
                escape_rtf(text)
            ),
            Block::Paragraph(text) => format!("\\pard\\fs21 {}\\par\n", escape_rtf(text)),
            Block::Bullet(text) => format!(
                "\\pard\\li360\\fi-240\\fs21 \\u8226? {}\\par\n",
                escape_rtf(text)
            ),
            Block::Row { left, right } if right.is_empty() => {
                format!("\\pard\\b\\fs21 {}\\b0\\par\n", escape_rtf(left))
            }
            Block::Row { left, right } => format!(
                "\\pard\\tqr\\tx10080\\b\\fs21 {}\\b0\\tab {}\\par\n",
                escape_rtf(left),
                escape_rtf(right)
            ),
            Block::Spacer => "\\pard\\par\n".to_string(),
        };
        out.push_str(&line);
    }
    out.push('}');
    out
}

impl ChainMember for RtfRenderer {
    fn id(&self) -> &str {
        "rtf"
    }
}

impl Renderer for RtfRenderer {
    fn content_type(&self) -> &'static str {
        "application/rtf"
    }

    fn extension(&self) -> &'static str {
        "rtf"
    }

    fn render(&self, document: &RenderDocument) -> Result<Vec<u8>, AttemptError> {
        Ok(build_rtf(document).into_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::resume::sample_resume;

    #[test]
    fn test_escape_rtf() {
        assert_eq!(escape_rtf("a{b}\\c"), "a\\{b\\}\\\\c");
        assert_eq!(escape_rtf("café"), "caf\\u233?");
        assert_eq!(escape_rtf("line\nbreak"), "line\\line break");
    }

    #[test]
    fn test_rtf_document_is_balanced() {
        let rtf = build_rtf(&RenderDocument::from_resume(&sample_resume()));
        assert!(rtf.starts_with("{\\rtf1"));
        assert!(rtf.ends_with('}'));
        assert!(rtf.contains("Ada Lovelace"));

        let unescaped = rtf.replace("\\{", "").replace("\\}", "");
        assert_eq!(unescaped.matches('{').count(), unescaped.matches('}').count());
    }
}

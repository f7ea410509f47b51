use serde::Serialize;

/// Printable share above which an undeclared blob is treated as plain text.
const TEXT_PRINTABLE_RATIO: f64 = 0.95;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    Pdf,
    Docx,
    /// Pre-2007 binary Word document (OLE compound file).
    LegacyDoc,
    Rtf,
    Text,
    Image,
    Unknown,
}

impl DocumentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentKind::Pdf => "pdf",
            DocumentKind::Docx => "docx",
            DocumentKind::LegacyDoc => "doc",
            DocumentKind::Rtf => "rtf",
            DocumentKind::Text => "text",
            DocumentKind::Image => "image",
            DocumentKind::Unknown => "unknown",
        }
    }

    fn from_declared(declared: &str) -> Option<Self> {
        let extension = declared
            .rsplit('.')
            .next()
            .unwrap_or(declared)
            .trim()
            .to_ascii_lowercase();
        match extension.as_str() {
            "pdf" | "application/pdf" => Some(DocumentKind::Pdf),
            "docx" => Some(DocumentKind::Docx),
            "doc" => Some(DocumentKind::LegacyDoc),
            "rtf" => Some(DocumentKind::Rtf),
            "txt" | "text" | "md" => Some(DocumentKind::Text),
            "png" | "jpg" | "jpeg" | "tif" | "tiff" => Some(DocumentKind::Image),
            _ => None,
        }
    }
}

impl std::fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sniffs the document kind from magic bytes. The declared name (file name or extension)
/// is only consulted when the bytes are inconclusive.
pub fn detect(bytes: &[u8], declared: Option<&str>) -> DocumentKind {
    let sniffed = sniff(bytes);
    if sniffed != DocumentKind::Unknown {
        return sniffed;
    }
    declared
        .and_then(DocumentKind::from_declared)
        .unwrap_or(DocumentKind::Unknown)
}

fn sniff(bytes: &[u8]) -> DocumentKind {
    if bytes.starts_with(b"%PDF") {
        return DocumentKind::Pdf;
    }
    if bytes.starts_with(b"PK\x03\x04") {
        // Zip entry names are stored uncompressed, so the main part name is visible.
        return if contains(bytes, b"word/document.xml") {
            DocumentKind::Docx
        } else {
            DocumentKind::Unknown
        };
    }
    if bytes.starts_with(&[0xD0, 0xCF, 0x11, 0xE0]) {
        return DocumentKind::LegacyDoc;
    }
    if bytes.starts_with(b"{\\rtf") {
        return DocumentKind::Rtf;
    }
    if bytes.starts_with(b"\x89PNG")
        || bytes.starts_with(&[0xFF, 0xD8, 0xFF])
        || bytes.starts_with(b"II*\0")
        || bytes.starts_with(b"MM\0*")
    {
        return DocumentKind::Image;
    }
    if looks_like_text(bytes) {
        return DocumentKind::Text;
    }
    DocumentKind::Unknown
}

/// UTF-8 whose characters are overwhelmingly printable.
pub fn looks_like_text(bytes: &[u8]) -> bool {
    let Ok(text) = std::str::from_utf8(bytes) else {
        return false;
    };
    let total = text.chars().count();
    if total == 0 {
        return false;
    }
    let printable = text
        .chars()
        .filter(|c| !c.is_control() || matches!(c, '\n' | '\r' | '\t'))
        .count();
    printable as f64 / total as f64 > TEXT_PRINTABLE_RATIO
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detects_by_magic_bytes() {
        assert_eq!(detect(b"%PDF-1.7\n...", None), DocumentKind::Pdf);
        assert_eq!(
            detect(b"PK\x03\x04....word/document.xml....", None),
            DocumentKind::Docx
        );
        assert_eq!(
            detect(&[0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1], None),
            DocumentKind::LegacyDoc
        );
        assert_eq!(detect(b"{\\rtf1\\ansi hello}", None), DocumentKind::Rtf);
        assert_eq!(detect(b"\x89PNG\r\n\x1a\n", None), DocumentKind::Image);
        assert_eq!(detect(b"Jane Doe\nEngineer\n", None), DocumentKind::Text);
    }

    #[test]
    fn test_magic_bytes_win_over_declared_name() {
        assert_eq!(detect(b"%PDF-1.4", Some("resume.docx")), DocumentKind::Pdf);
    }

    #[test]
    fn test_declared_name_used_when_inconclusive() {
        let garbage = [0u8, 159, 146, 150, 1, 2, 3];
        assert_eq!(detect(&garbage, None), DocumentKind::Unknown);
        assert_eq!(detect(&garbage, Some("cv.pdf")), DocumentKind::Pdf);
    }

    #[test]
    fn test_binary_noise_is_not_text() {
        assert!(!looks_like_text(&[0x01, 0x02, 0x03, b'a']));
        assert!(looks_like_text("Résumé – naïve café\n".as_bytes()));
    }
}

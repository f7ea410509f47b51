//! Text clean-up applied to the winning extraction, and ligature repair shared with
//! response recovery.

const LIGATURES: &[(char, &str)] = &[
    ('\u{FB00}', "ff"),
    ('\u{FB01}', "fi"),
    ('\u{FB02}', "fl"),
    ('\u{FB03}', "ffi"),
    ('\u{FB04}', "ffl"),
    ('\u{FB05}', "ft"),
    ('\u{FB06}', "st"),
];

/// Full normalization pass: ligatures, OCR confusions, then whitespace.
pub fn normalize(text: &str) -> String {
    collapse_whitespace(&fix_ocr_confusions(&fix_ligatures(text)))
}

pub fn fix_ligatures(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match LIGATURES.iter().find(|(lig, _)| *lig == c) {
            Some((_, replacement)) => out.push_str(replacement),
            None => out.push(c),
        }
    }
    out
}

/// Replaces digits that OCR commonly confuses with letters, but only when the digit sits
/// between two letters. "Eng1neer" becomes "Englneer"; "B2B" and "S3" are unchanged.
pub fn fix_ocr_confusions(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    for (i, &c) in chars.iter().enumerate() {
        let between_letters = i > 0
            && i + 1 < chars.len()
            && chars[i - 1].is_ascii_alphabetic()
            && chars[i + 1].is_ascii_alphabetic();
        let replacement = match c {
            '0' if between_letters => 'o',
            '1' if between_letters => 'l',
            '5' if between_letters => 'S',
            '9' if between_letters => 'g',
            other => other,
        };
        out.push(replacement);
    }
    out
}

/// Collapses runs of spaces inside lines and runs of blank lines to a single blank line.
pub fn collapse_whitespace(text: &str) -> String {
    let mut lines: Vec<String> = Vec::new();
    let mut previous_blank = true;
    for line in text.lines() {
        let collapsed = line.split_whitespace().collect::<Vec<_>>().join(" ");
        if collapsed.is_empty() {
            if !previous_blank {
                lines.push(String::new());
            }
            previous_blank = true;
        } else {
            lines.push(collapsed);
            previous_blank = false;
        }
    }
    while lines.last().is_some_and(|l| l.is_empty()) {
        lines.pop();
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fix_ligatures() {
        assert_eq!(fix_ligatures("e\u{FB03}cient \u{FB01}nance"), "efficient finance");
    }

    #[test]
    fn test_ocr_confusions_only_between_letters() {
        assert_eq!(fix_ocr_confusions("Pr0ject"), "Project");
        assert_eq!(fix_ocr_confusions("a0b0c"), "aoboc");
        assert_eq!(fix_ocr_confusions("2019 - 2021"), "2019 - 2021");
        assert_eq!(fix_ocr_confusions("B2B S3 10x"), "B2B S3 10x");
    }

    #[test]
    fn test_collapse_whitespace() {
        let input = "\n\n  Jane   Doe \n\n\n\nSenior\tEngineer\n\n";
        assert_eq!(collapse_whitespace(input), "Jane Doe\n\nSenior Engineer");
    }

    #[test]
    fn test_normalize_applies_every_pass() {
        assert_eq!(normalize("  Pro\u{FB01}le:  Dat4 eng1neer  "), "Profile: Dat4 englneer");
    }
}

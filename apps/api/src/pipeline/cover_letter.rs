/// Tidies model-written cover letter text: trailing spaces removed, at most one
/// blank line between paragraphs, no leading or trailing blank lines.
pub fn clean_spacing(text: &str) -> String {
    let mut lines: Vec<&str> = Vec::new();
    let mut blank_run = 0;

    for line in text.trim().lines().map(str::trim_end) {
        if line.trim().is_empty() {
            blank_run += 1;
            if blank_run > 1 {
                continue;
            }
            lines.push("");
        } else {
            blank_run = 0;
            lines.push(line);
        }
    }
    lines.join("\n")
}

/// Candidate name for the document title: the first non-empty line.
pub fn candidate_name(letter: &str, fallback: &str) -> String {
    letter
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty() && l.chars().count() <= 60)
        .unwrap_or(fallback)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_runs_collapse_to_one() {
        let raw = "\n\nAda Lovelace   \nada@example.com\n\n\n\nDear Hiring Manager,\n \n\nI am writing.\n\n";
        assert_eq!(
            clean_spacing(raw),
            "Ada Lovelace\nada@example.com\n\nDear Hiring Manager,\n\nI am writing."
        );
    }

    #[test]
    fn test_candidate_name() {
        assert_eq!(candidate_name("\n  Ada Lovelace\nLondon", "Candidate"), "Ada Lovelace");
        assert_eq!(candidate_name("", "Candidate"), "Candidate");
    }
}

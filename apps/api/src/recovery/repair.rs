//! Heuristic repairs for almost-JSON model output.

use std::sync::LazyLock;

use regex::Regex;

static RE_TRAILING_COMMA: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r",(\s*[}\]])").unwrap());

/// Scans lines from the first one containing `{`, tracking brace depth outside string
/// literals, and returns the lines spanning the first top-level object. If the object
/// never closes, every remaining line is returned.
pub fn scan_object_lines(text: &str) -> Option<Vec<String>> {
    let mut lines = text.lines();
    let first = lines.by_ref().find(|line| line.contains('{'))?;
    let start = first.find('{')?;

    let mut collected = vec![first[start..].to_string()];
    let mut depth = brace_delta(&first[start..]);
    if depth <= 0 {
        return Some(collected);
    }
    for line in lines {
        collected.push(line.to_string());
        depth += brace_delta(line);
        if depth <= 0 {
            break;
        }
    }
    Some(collected)
}

fn brace_delta(line: &str) -> i32 {
    let mut delta = 0;
    let mut in_string = false;
    let mut escaped = false;
    for c in line.chars() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' if in_string => escaped = true,
            '"' => in_string = !in_string,
            '{' if !in_string => delta += 1,
            '}' if !in_string => delta -= 1,
            _ => {}
        }
    }
    delta
}

/// Closes a string literal left open at the end of a line, keeping a trailing comma
/// outside the quotes.
pub fn close_unterminated_string(line: &str) -> String {
    let mut quotes = 0;
    let mut escaped = false;
    for c in line.chars() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '"' => quotes += 1,
            _ => {}
        }
    }
    if quotes % 2 == 0 {
        return line.to_string();
    }
    let trimmed = line.trim_end();
    match trimmed.strip_suffix(',') {
        Some(body) => format!("{body}\","),
        None => format!("{trimmed}\""),
    }
}

/// Replaces control characters (including raw newlines inside strings) with spaces.
pub fn strip_control_chars(text: &str) -> String {
    text.chars()
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect()
}

pub fn strip_trailing_commas(text: &str) -> String {
    RE_TRAILING_COMMA.replace_all(text, "$1").into_owned()
}

/// Appends closers for any string, `{` or `[` left open (truncated output).
pub fn close_open_containers(text: &str) -> String {
    let mut stack = Vec::new();
    let mut in_string = false;
    let mut escaped = false;
    for c in text.chars() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' if in_string => escaped = true,
            '"' => in_string = !in_string,
            '{' if !in_string => stack.push('}'),
            '[' if !in_string => stack.push(']'),
            '}' | ']' if !in_string => {
                stack.pop();
            }
            _ => {}
        }
    }
    let mut repaired = text.trim_end().trim_end_matches(',').to_string();
    if in_string {
        repaired.push('"');
    }
    while let Some(closer) = stack.pop() {
        repaired.push(closer);
    }
    repaired
}

/// The span from the first `{` to its matching `}`, tracking string literals across
/// line breaks. Runs to the end of the text when the object never closes.
pub fn object_span(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0;
    let mut in_string = false;
    let mut escaped = false;
    for (offset, c) in text[start..].char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' if in_string => escaped = true,
            '"' => in_string = !in_string,
            '{' if !in_string => depth += 1,
            '}' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..=start + offset]);
                }
            }
            _ => {}
        }
    }
    Some(&text[start..])
}

/// Control characters to spaces, trailing commas removed, open containers closed.
fn plain_repair(text: &str) -> Option<String> {
    let cleaned = strip_trailing_commas(&strip_control_chars(object_span(text)?));
    Some(strip_trailing_commas(&close_open_containers(&cleaned)))
}

/// Per-line repair that also closes string literals left open at a line end.
fn line_repair(text: &str) -> Option<String> {
    let lines = scan_object_lines(text)?;
    let joined = lines
        .iter()
        .map(|line| close_unterminated_string(line))
        .collect::<Vec<_>>()
        .join("\n");
    let cleaned = strip_trailing_commas(&strip_control_chars(&joined));
    Some(strip_trailing_commas(&close_open_containers(&cleaned)))
}

/// Repair candidates in preference order: the plain repair first, then the
/// per-line string-closing repair.
pub fn candidates(text: &str) -> Vec<String> {
    let mut out: Vec<String> = plain_repair(text).into_iter().collect();
    if let Some(aggressive) = line_repair(text) {
        if !out.contains(&aggressive) {
            out.push(aggressive);
        }
    }
    out
}

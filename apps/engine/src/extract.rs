//! JSON Extractor — recovers a structured value from arbitrary model text.
//!
//! LLMs wrap JSON in prose, code fences, or emit almost-JSON (trailing
//! commas, single quotes). Strategies are tried in order; first success wins;
//! total failure yields `None`, never an error. Callers must supply a
//! default.

use serde_json::Value;

/// Extracts the first JSON value recoverable from `text`.
///
/// Strategy ladder:
/// 1. direct parse of the trimmed text
/// 2. every fenced code block (language tag optional)
/// 3. first balanced `{...}` span, then first balanced `[...]` span
/// 4. repair pass: first `{` to last `}`, trailing commas stripped, quote
///    style swapped when the candidate has single quotes but no double quotes
pub fn extract_json(text: &str) -> Option<Value> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(value) = serde_json::from_str(trimmed) {
        return Some(value);
    }

    for block in fenced_blocks(trimmed) {
        if let Ok(value) = serde_json::from_str(block.trim()) {
            return Some(value);
        }
    }

    if let Some(span) = balanced_span(trimmed, '{', '}') {
        if let Ok(value) = serde_json::from_str(span) {
            return Some(value);
        }
    }
    if let Some(span) = balanced_span(trimmed, '[', ']') {
        if let Ok(value) = serde_json::from_str(span) {
            return Some(value);
        }
    }

    repair_and_parse(trimmed)
}

/// Contents of every ```-fenced block, with an optional language tag on the
/// opening fence line dropped.
fn fenced_blocks(text: &str) -> Vec<&str> {
    let mut blocks = Vec::new();
    let mut rest = text;
    while let Some(start) = rest.find("```") {
        let after = &rest[start + 3..];
        let Some(end) = after.find("```") else { break };
        let mut block = &after[..end];
        if let Some(nl) = block.find('\n') {
            let tag = block[..nl].trim();
            if !tag.is_empty() && tag.chars().all(|c| c.is_ascii_alphanumeric()) {
                block = &block[nl + 1..];
            }
        }
        blocks.push(block);
        rest = &after[end + 3..];
    }
    blocks
}

/// Finds the first balanced `open...close` span, counting depth while
/// ignoring brackets inside quoted strings (escape sequences tracked).
fn balanced_span(text: &str, open: char, close: char) -> Option<&str> {
    let mut depth = 0usize;
    let mut start: Option<usize> = None;
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in text.char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        if c == '"' && start.is_some() {
            in_string = true;
        } else if c == open {
            if start.is_none() {
                start = Some(i);
            }
            depth += 1;
        } else if c == close && start.is_some() {
            depth -= 1;
            if depth == 0 {
                let s = start.unwrap();
                return Some(&text[s..i + c.len_utf8()]);
            }
        }
    }
    None
}

/// Last-resort repair: substring from the first `{` to the last `}`, strip
/// trailing commas before closing brackets, swap quote characters when the
/// candidate uses single quotes exclusively, then retry the parse.
fn repair_and_parse(text: &str) -> Option<Value> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end <= start {
        return None;
    }

    let mut candidate = strip_trailing_commas(&text[start..=end]);
    if candidate.contains('\'') && !candidate.contains('"') {
        candidate = candidate.replace('\'', "\"");
    }
    serde_json::from_str(&candidate).ok()
}

/// Removes commas that sit immediately (modulo whitespace) before `}` or `]`.
fn strip_trailing_commas(text: &str) -> String {
    let bytes = text.as_bytes();
    let mut out = String::with_capacity(text.len());
    for (i, c) in text.char_indices() {
        if c == ',' {
            let mut j = i + 1;
            while j < bytes.len() && bytes[j].is_ascii_whitespace() {
                j += 1;
            }
            if j < bytes.len() && (bytes[j] == b'}' || bytes[j] == b']') {
                continue;
            }
        }
        out.push(c);
    }
    out
}

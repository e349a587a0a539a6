//! Document chunking — splits resume/JD text into labeled sections.
//!
//! Header heuristics first (markdown headers, ALL-CAPS lines, a fixed
//! vocabulary of common section names); sections that exceed the size
//! threshold are re-split into fixed-size overlapping windows snapped to
//! sentence boundaries.

/// A section over this many characters is windowed.
pub const MAX_SECTION_CHARS: usize = 1200;
const WINDOW_CHARS: usize = 1000;
const WINDOW_OVERLAP_CHARS: usize = 200;

/// Section names commonly seen in resumes and job descriptions. Lines that
/// equal one of these (case-insensitive, optional trailing colon) are
/// treated as headers even without markdown or ALL-CAPS styling.
const SECTION_VOCABULARY: &[&str] = &[
    "summary",
    "objective",
    "experience",
    "work experience",
    "employment",
    "education",
    "skills",
    "projects",
    "certifications",
    "awards",
    "publications",
    "requirements",
    "qualifications",
    "responsibilities",
    "benefits",
    "about",
    "about us",
    "about the role",
    "who you are",
    "what you'll do",
    "nice to have",
];

/// One chunk ready for embedding: a section label plus its text.
#[derive(Debug, Clone, PartialEq)]
pub struct SectionChunk {
    pub section: String,
    pub content: String,
}

/// Splits `text` into section chunks. Oversized sections become multiple
/// overlapping chunks under the same section label.
pub fn chunk_document(text: &str) -> Vec<SectionChunk> {
    let mut chunks = Vec::new();
    for (section, body) in split_sections(text) {
        if body.len() <= MAX_SECTION_CHARS {
            chunks.push(SectionChunk {
                section,
                content: body,
            });
        } else {
            for window in window_chunks(&body) {
                chunks.push(SectionChunk {
                    section: section.clone(),
                    content: window,
                });
            }
        }
    }
    chunks
}

/// Splits text on header lines. Text before the first header lands in a
/// "General" section.
fn split_sections(text: &str) -> Vec<(String, String)> {
    let mut sections: Vec<(String, String)> = Vec::new();
    let mut title = "General".to_string();
    let mut body = String::new();

    for line in text.lines() {
        if let Some(header) = header_title(line) {
            if !body.trim().is_empty() {
                sections.push((title, body.trim().to_string()));
            }
            title = header;
            body = String::new();
        } else {
            body.push_str(line);
            body.push('\n');
        }
    }
    if !body.trim().is_empty() {
        sections.push((title, body.trim().to_string()));
    }
    sections
}

/// Returns the normalized section title when `line` looks like a header.
fn header_title(line: &str) -> Option<String> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.len() > 60 {
        return None;
    }

    // Markdown header
    if trimmed.starts_with('#') {
        let title = trimmed.trim_start_matches('#').trim();
        if !title.is_empty() {
            return Some(title.to_string());
        }
        return None;
    }

    let bare = trimmed.trim_end_matches(':').trim();

    // Known section name
    if SECTION_VOCABULARY.contains(&bare.to_lowercase().as_str()) {
        return Some(bare.to_string());
    }

    // ALL-CAPS line (at least two letters, none lowercase, not a sentence)
    let letters: Vec<char> = bare.chars().filter(|c| c.is_alphabetic()).collect();
    if letters.len() >= 2
        && letters.iter().all(|c| c.is_uppercase())
        && !bare.ends_with('.')
    {
        return Some(bare.to_string());
    }

    None
}

/// Packs sentences into windows of roughly `WINDOW_CHARS`, starting each
/// subsequent window far enough back to overlap the previous one by about
/// `WINDOW_OVERLAP_CHARS`.
fn window_chunks(body: &str) -> Vec<String> {
    let sentences = split_sentences(body);
    let mut chunks = Vec::new();
    let mut i = 0;

    while i < sentences.len() {
        let mut end = i;
        let mut size = 0;
        while end < sentences.len() && size + sentences[end].len() <= WINDOW_CHARS {
            size += sentences[end].len();
            end += 1;
        }
        if end == i {
            // A single sentence larger than the window: take it whole.
            end = i + 1;
        }

        chunks.push(sentences[i..end].join(" "));

        if end >= sentences.len() {
            break;
        }

        // Back up whole sentences until the overlap budget is covered.
        let mut back = end;
        let mut overlap = 0;
        while back > i + 1 && overlap < WINDOW_OVERLAP_CHARS {
            back -= 1;
            overlap += sentences[back].len();
        }
        i = back;
    }
    chunks
}

fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut current = String::new();
    for c in text.chars() {
        current.push(c);
        if matches!(c, '.' | '!' | '?' | '\n') {
            let trimmed = current.trim();
            if !trimmed.is_empty() {
                sentences.push(trimmed.to_string());
            }
            current.clear();
        }
    }
    let trimmed = current.trim();
    if !trimmed.is_empty() {
        sentences.push(trimmed.to_string());
    }
    sentences
}

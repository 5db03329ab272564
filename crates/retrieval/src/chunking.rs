use once_cell::sync::Lazy;
use regex::Regex;

static ARTICLE_HEADING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^art(?:igo)?\.?\s*\d+").expect("valid article heading regex"));

/// Splits legal text on blank lines, packing paragraphs up to `max_chunk_chars`
/// and always opening a new chunk at an article heading.
pub fn chunk_legal_text(body: &str, max_chunk_chars: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();

    for paragraph in body.split("\n\n") {
        let trimmed = paragraph.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let starts_article = ARTICLE_HEADING.is_match(trimmed);
        let overflows = current.len() + trimmed.len() + 2 > max_chunk_chars;
        if (starts_article || overflows) && !current.is_empty() {
            chunks.push(current.trim().to_string());
            current.clear();
        }

        if !current.is_empty() {
            current.push_str("\n\n");
        }
        current.push_str(trimmed);
    }

    if !current.trim().is_empty() {
        chunks.push(current.trim().to_string());
    }

    chunks
}

//! Plain-text excerpts derived from raw post markup.
//!
//! Images are dropped, links keep their label, remaining markdown symbols
//! and whitespace runs collapse into single spaces.

use once_cell::sync::Lazy;
use regex::Regex;

static MARKDOWN_IMAGE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"!\[[^\]]*]\([^)]*\)").expect("valid image regex"));
static MARKDOWN_LINK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[([^\]]+)\]\([^)]+\)").expect("valid link regex"));
static MARKDOWN_SYMBOL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"[\*_`#>~\-\[\]\(\)!|]+"#).expect("valid markdown symbol regex"));
static LIST_MARKER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^\s*(?:[-+]|\d+\.)\s+").expect("valid list marker regex"));
static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid ws regex"));

/// Returns at most `max_chars` characters of plain text, or `None` when the
/// markup carries no text at all.
pub fn excerpt(content: &str, max_chars: usize) -> Option<String> {
    let without_images = MARKDOWN_IMAGE_RE.replace_all(content, " ");
    let without_links = MARKDOWN_LINK_RE.replace_all(&without_images, "$1");
    let without_markers = LIST_MARKER_RE.replace_all(&without_links, " ");
    let without_symbols = MARKDOWN_SYMBOL_RE.replace_all(&without_markers, " ");
    let normalized = WHITESPACE_RE.replace_all(&without_symbols, " ");
    let trimmed = normalized.trim();

    if trimmed.is_empty() || max_chars == 0 {
        return None;
    }

    let mut text: String = trimmed.chars().take(max_chars).collect();
    if trimmed.chars().count() > max_chars {
        text.truncate(text.trim_end().len());
        text.push_str("...");
    }
    Some(text)
}

//! Lexical helpers shared by the document analyzers
//!
//! Keyword matching is case-insensitive and anchored at a word start, so
//! `api` matches "APIs" but not "rapid".

/// Whether `term` occurs in `text` starting at a word boundary.
///
/// `term` must already be lowercase.
pub fn mentions(text: &str, term: &str) -> bool {
    let lower = text.to_lowercase();
    mentions_lower(&lower, term)
}

/// Like [`mentions`] but `haystack` is already lowercase.
pub fn mentions_lower(haystack: &str, term: &str) -> bool {
    if term.is_empty() {
        return false;
    }
    haystack.match_indices(term).any(|(idx, _)| {
        haystack[..idx]
            .chars()
            .next_back()
            .is_none_or(|c| !c.is_alphanumeric())
    })
}

/// Whether any of `terms` is mentioned in the lowercase `haystack`.
pub fn mentions_any(haystack: &str, terms: &[&str]) -> bool {
    terms.iter().any(|term| mentions_lower(haystack, term))
}

pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Markdown heading level and title, if `line` is a heading.
pub fn heading(line: &str) -> Option<(usize, &str)> {
    let trimmed = line.trim_start();
    let level = trimmed.chars().take_while(|c| *c == '#').count();
    if level == 0 {
        return None;
    }
    let rest = &trimmed[level..];
    if !rest.starts_with(' ') {
        return None;
    }
    let title = rest.trim();
    if title.is_empty() {
        None
    } else {
        Some((level, title))
    }
}

/// Text of a list item (`- `, `* ` or `1. `), if `line` is one.
pub fn list_item(line: &str) -> Option<&str> {
    let trimmed = line.trim_start();
    if let Some(rest) = trimmed
        .strip_prefix("- ")
        .or_else(|| trimmed.strip_prefix("* "))
    {
        return Some(rest.trim());
    }

    let digits = trimmed.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits > 0 {
        if let Some(rest) = trimmed[digits..].strip_prefix(". ") {
            return Some(rest.trim());
        }
    }
    None
}

/// All list items in document order.
pub fn list_items(text: &str) -> Vec<&str> {
    text.lines().filter_map(list_item).collect()
}

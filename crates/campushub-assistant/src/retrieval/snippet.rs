//! Excerpt extraction for retrieved articles

/// Extract the portion of an article most relevant to a query.
///
/// Short articles are returned whole; longer ones are windowed around the
/// first query-term occurrence and trimmed to word boundaries.
pub fn extract_excerpt(content: &str, query: &str, max_length: usize) -> String {
    if content.len() <= max_length {
        return content.to_string();
    }

    let center = find_query_position(content, query);

    let half_len = max_length / 2;
    let start = center.saturating_sub(half_len);
    let end = (start + max_length).min(content.len());
    let start = if end == content.len() {
        end.saturating_sub(max_length)
    } else {
        start
    };

    let (start, end) = adjust_to_word_boundaries(content, start, end);

    let mut excerpt = content[start..end].to_string();
    if start > 0 {
        excerpt = format!("...{}", excerpt.trim_start());
    }
    if end < content.len() {
        excerpt = format!("{}...", excerpt.trim_end());
    }

    excerpt
}

/// Find the position of query terms in content
fn find_query_position(content: &str, query: &str) -> usize {
    let content_lower = content.to_lowercase();
    let query_lower = query.to_lowercase();

    if let Some(pos) = content_lower.find(&query_lower) {
        return pos;
    }

    let terms: Vec<&str> = query_lower
        .split_whitespace()
        .filter(|t| t.len() >= 3)
        .collect();

    for term in terms {
        if let Some(pos) = content_lower.find(term) {
            return pos;
        }
    }

    0
}

/// Adjust positions to word boundaries
fn adjust_to_word_boundaries(content: &str, start: usize, end: usize) -> (usize, usize) {
    let bytes = content.as_bytes();

    let mut new_start = start;
    while new_start > 0
        && bytes
            .get(new_start - 1)
            .map(|&b| !b.is_ascii_whitespace())
            .unwrap_or(false)
    {
        new_start -= 1;
    }

    let mut new_end = end;
    while new_end < bytes.len()
        && bytes
            .get(new_end)
            .map(|&b| !b.is_ascii_whitespace())
            .unwrap_or(false)
    {
        new_end += 1;
    }

    (new_start, new_end)
}

//! Token estimation for budget checks.
//!
//! Uses the rough 4-characters-per-token heuristic. Good enough for
//! oversize-file guards and running token counts; not billing-accurate.

/// Estimate the token count of a text.
pub fn estimate_tokens(text: &str) -> usize {
    if text.is_empty() {
        return 0;
    }
    (text.len() + 3) / 4
}

/// Truncate `text` so its estimated token count fits `max_tokens`.
///
/// Cuts at a char boundary at or below the byte budget.
pub fn truncate_to_tokens(text: &str, max_tokens: usize) -> &str {
    let max_bytes = max_tokens * 4;
    if text.len() <= max_bytes {
        return text;
    }
    let mut end = max_bytes;
    while end > 0 && !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

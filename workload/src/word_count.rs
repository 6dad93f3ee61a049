//! Case-insensitive word counting over plain text.

use common::PartialResult;

/// Lowercase the text and replace anything that is neither alphanumeric
/// nor whitespace with a space, so punctuation never glues words together.
fn clean_text(text: &str) -> String {
    text.chars()
        .map(|c| {
            if c.is_alphanumeric() || c.is_whitespace() {
                c.to_ascii_lowercase()
            } else {
                ' '
            }
        })
        .collect()
}

pub fn map(payload: &str, _aux: &str) -> PartialResult {
    let mut counts = PartialResult::new();
    for word in clean_text(payload).split_whitespace() {
        *counts.entry(word.to_string()).or_insert(0) += 1;
    }
    counts
}

//! Whitespace normalization and the two size ceilings applied before tokenization.

use super::extract::extract_key_sentences_with_min;
use super::types::{BoundedText, PipelineLimits};

/// Collapse every whitespace run to a single space and trim both ends.
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Normalize `text`, reduce large documents to key sentences, then apply the hard character cap.
///
/// Extraction and truncation are independent: a document can go through both. The returned
/// text never exceeds `limits.max_input_chars` characters.
pub fn bound_text(text: &str, limits: &PipelineLimits) -> BoundedText {
    let normalized = normalize_whitespace(text);
    let input_chars = normalized.chars().count();

    let (reduced, extracted) = if input_chars > limits.large_document_chars {
        let reduced = extract_key_sentences_with_min(
            &normalized,
            limits.key_sentence_count,
            limits.min_sentence_chars,
        );
        (reduced, true)
    } else {
        (normalized, false)
    };

    let (text, truncated) = truncate_chars(reduced, limits.max_input_chars);
    BoundedText {
        text,
        input_chars,
        extracted,
        truncated,
    }
}

/// Cut `text` to its first `max_chars` characters.
fn truncate_chars(mut text: String, max_chars: usize) -> (String, bool) {
    match text.char_indices().nth(max_chars) {
        Some((byte_offset, _)) => {
            text.truncate(byte_offset);
            (text, true)
        }
        None => (text, false),
    }
}

//! Frequency-weighted key-sentence extraction.
//!
//! A cheap pre-filter that shrinks a large document to the sentences most likely to carry its
//! content before any model inference happens. The pass is linear in the input length and never
//! touches the model, so it caps downstream cost independent of how large the upload was.
//!
//! Selection is by score, but the returned extract is always in document order.

use std::collections::HashMap;

/// Default number of sentences kept by [`extract_key_sentences`].
pub const DEFAULT_KEY_SENTENCES: usize = 12;

/// Sentences shorter than this many characters are dropped as noise (page numbers, headings).
pub const MIN_SENTENCE_CHARS: usize = 20;

/// Minimum length, in characters, of a token counted by the frequency table.
const MIN_WORD_CHARS: usize = 3;

/// Reduce `text` to at most `k` salient sentences, preserving their original order.
///
/// When the text already has `k` or fewer usable sentences they are returned verbatim, joined by
/// single spaces. When every sentence is filtered out as noise, the input is returned unchanged
/// and the caller's character cap takes over.
pub fn extract_key_sentences(text: &str, k: usize) -> String {
    extract_key_sentences_with_min(text, k, MIN_SENTENCE_CHARS)
}

/// Variant of [`extract_key_sentences`] with an explicit noise threshold.
pub fn extract_key_sentences_with_min(text: &str, k: usize, min_sentence_chars: usize) -> String {
    let sentences: Vec<&str> = split_sentences(text)
        .into_iter()
        .filter(|sentence| sentence.chars().count() >= min_sentence_chars)
        .collect();

    if sentences.is_empty() {
        return text.trim().to_string();
    }
    if sentences.len() <= k {
        return sentences.join(" ");
    }

    let tokenized: Vec<Vec<String>> = sentences.iter().map(|s| words(s)).collect();

    let mut frequencies: HashMap<&str, usize> = HashMap::new();
    for word in tokenized.iter().flatten() {
        *frequencies.entry(word.as_str()).or_insert(0) += 1;
    }

    let scores: Vec<f64> = tokenized
        .iter()
        .map(|sentence_words| {
            let total: usize = sentence_words
                .iter()
                .map(|word| frequencies.get(word.as_str()).copied().unwrap_or(0))
                .sum();
            total as f64 / (sentence_words.len() + 1) as f64
        })
        .collect();

    // `sort_by` is stable, so equal scores keep first-seen order.
    let mut ranked: Vec<usize> = (0..sentences.len()).collect();
    ranked.sort_by(|&left, &right| scores[right].total_cmp(&scores[left]));
    ranked.truncate(k);
    ranked.sort_unstable();

    ranked
        .into_iter()
        .map(|index| sentences[index])
        .collect::<Vec<_>>()
        .join(" ")
}

/// Split text into trimmed sentences on `.`, `!` and `?`.
///
/// A boundary requires the punctuation run to be followed by whitespace or the end of the text,
/// so decimals such as `3.14` and runs such as `?!` stay inside one sentence. Trailing text with
/// no terminal punctuation forms a final sentence.
pub fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();

    while let Some((index, ch)) = chars.next() {
        if !is_terminal(ch) {
            continue;
        }
        let mut end = index + ch.len_utf8();
        while let Some(&(next_index, next)) = chars.peek() {
            if !is_terminal(next) {
                break;
            }
            end = next_index + next.len_utf8();
            chars.next();
        }
        let at_boundary = match chars.peek() {
            Some(&(_, next)) => next.is_whitespace(),
            None => true,
        };
        if at_boundary {
            push_trimmed(&mut sentences, &text[start..end]);
            start = end;
        }
    }

    push_trimmed(&mut sentences, &text[start..]);
    sentences
}

fn push_trimmed<'a>(sentences: &mut Vec<&'a str>, candidate: &'a str) {
    let trimmed = candidate.trim();
    if !trimmed.is_empty() {
        sentences.push(trimmed);
    }
}

fn is_terminal(ch: char) -> bool {
    matches!(ch, '.' | '!' | '?')
}

/// Lowercased alphabetic tokens of at least [`MIN_WORD_CHARS`] characters.
fn words(sentence: &str) -> Vec<String> {
    sentence
        .split(|ch: char| !ch.is_alphabetic())
        .filter(|token| token.chars().count() >= MIN_WORD_CHARS)
        .map(str::to_lowercase)
        .collect()
}

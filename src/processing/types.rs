//! Core data types and error definitions for the summarization pipeline.

use crate::{
    processing::extract::{DEFAULT_KEY_SENTENCES, MIN_SENTENCE_CHARS},
    processing::tokens::TokenizerError,
    storage::StorageError,
    summarization::SummarizationClientError,
};
use serde::Deserialize;
use thiserror::Error;

/// Sentinel returned for empty or whitespace-only input.
pub const EMPTY_INPUT_SENTINEL: &str = "No text provided.";

/// Task prefix that tells a text-to-text model to summarize.
pub const TASK_PREFIX: &str = "summarize: ";

/// Floor applied to any requested minimum summary length, in tokens.
pub const MIN_SUMMARY_TOKENS: usize = 20;

/// Size ceilings that make model cost independent of the uploaded document's size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineLimits {
    /// Normalized inputs longer than this (characters) go through key-sentence extraction.
    pub large_document_chars: usize,
    /// Hard prefix cap (characters) applied after extraction.
    pub max_input_chars: usize,
    /// Sentences kept by the extractor.
    pub key_sentence_count: usize,
    /// Sentences shorter than this (characters) are treated as noise.
    pub min_sentence_chars: usize,
    /// Token ceiling for the encoded prompt.
    pub max_input_tokens: usize,
    /// Pages read from an uploaded PDF.
    pub pdf_max_pages: usize,
}

impl Default for PipelineLimits {
    fn default() -> Self {
        Self {
            large_document_chars: 5_000,
            max_input_chars: 4_000,
            key_sentence_count: DEFAULT_KEY_SENTENCES,
            min_sentence_chars: MIN_SENTENCE_CHARS,
            max_input_tokens: 512,
            pdf_max_pages: 20,
        }
    }
}

/// Normalized, size-bounded text ready for tokenization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundedText {
    /// Text after normalization, optional extraction, and the character cap.
    pub text: String,
    /// Character count of the normalized input before any reduction.
    pub input_chars: usize,
    /// Whether key-sentence extraction ran.
    pub extracted: bool,
    /// Whether the hard character cap cut the text.
    pub truncated: bool,
}

/// Caller-supplied bounds on the generated summary, in tokens.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct SummaryOptions {
    /// Upper bound on generated tokens.
    #[serde(default)]
    pub max_length: Option<usize>,
    /// Lower bound on generated tokens; never honored below [`MIN_SUMMARY_TOKENS`].
    #[serde(default)]
    pub min_length: Option<usize>,
}

impl SummaryOptions {
    /// Resolve the `(max, min)` token bounds against configured defaults.
    ///
    /// The minimum is raised to [`MIN_SUMMARY_TOKENS`] and the maximum is raised to the
    /// resulting minimum so the pair is always satisfiable.
    pub fn resolve(&self, default_max: usize, default_min: usize) -> (usize, usize) {
        let min = self
            .min_length
            .unwrap_or(default_min)
            .max(MIN_SUMMARY_TOKENS);
        let max = self.max_length.unwrap_or(default_max).max(min);
        (max, min)
    }
}

/// Errors emitted by the summarization pipeline.
#[derive(Debug, Error)]
pub enum SummarizeError {
    /// The generation backend failed or returned an unusable response.
    #[error("Summarization model failed: {0}")]
    Model(#[from] SummarizationClientError),
    /// The prompt could not be encoded within the token budget.
    #[error("Failed to encode input: {0}")]
    Tokenizer(#[from] TokenizerError),
    /// A blocking pipeline stage panicked or was cancelled.
    #[error("Pipeline worker failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
    /// No book exists with the requested identifier.
    #[error("Book {0} not found")]
    BookNotFound(u64),
    /// The book store rejected a read or write.
    #[error("Storage request failed: {0}")]
    Storage(#[from] StorageError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_uses_defaults() {
        assert_eq!(SummaryOptions::default().resolve(150, 40), (150, 40));
    }

    #[test]
    fn resolve_floors_small_minimums() {
        let options = SummaryOptions {
            max_length: Some(60),
            min_length: Some(5),
        };
        assert_eq!(options.resolve(150, 40), (60, MIN_SUMMARY_TOKENS));
    }

    #[test]
    fn resolve_keeps_max_above_min() {
        let options = SummaryOptions {
            max_length: Some(10),
            min_length: None,
        };
        assert_eq!(options.resolve(150, 40), (40, 40));
    }
}

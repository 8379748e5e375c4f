//! Summarization pipeline: normalize, bound, tokenize, generate.

pub mod extract;
pub mod normalize;
mod service;
pub mod tokens;
pub mod types;

pub use extract::{extract_key_sentences, split_sentences};
pub use normalize::{bound_text, normalize_whitespace};
pub use service::{LATENCY_BUDGET, SummaryApi, SummaryService, ensure_terminal_punctuation};
pub use tokens::{EncodedPrompt, TokenBudget, TokenizerError};
pub use types::{
    BoundedText, EMPTY_INPUT_SENTINEL, MIN_SUMMARY_TOKENS, PipelineLimits, SummarizeError,
    SummaryOptions, TASK_PREFIX,
};

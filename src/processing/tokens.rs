//! Token-budget enforcement for model prompts.
//!
//! The character caps upstream bound the text loosely; this module applies the binding ceiling
//! by encoding the prompt with a BPE tokenizer from `tiktoken-rs` and keeping only the first
//! `max_tokens` tokens. Encodings are resolved by model name first, then by encoding name, and
//! finally fall back to `cl100k_base`.

use std::sync::Arc;
use thiserror::Error;
use tiktoken_rs::{
    CoreBPE, cl100k_base, get_bpe_from_model, o200k_base, p50k_base, p50k_edit, r50k_base,
};

/// Multi-byte characters span at most this many byte-level tokens.
const MAX_DECODE_BACKOFF: usize = 4;

/// Errors raised while loading or applying the tokenizer.
#[derive(Debug, Error)]
pub enum TokenizerError {
    /// The requested encoding could not be constructed.
    #[error("failed to load tokenizer encoding '{encoding}': {message}")]
    Load {
        /// Encoding or model name we attempted to resolve.
        encoding: String,
        /// Message reported by the tokenizer library.
        message: String,
    },
    /// A truncated token sequence could not be decoded back to text.
    #[error("failed to decode truncated prompt: {0}")]
    Decode(String),
}

/// Prompt text guaranteed to fit the token ceiling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedPrompt {
    /// Decoded text of the kept token prefix.
    pub text: String,
    /// Number of tokens kept.
    pub token_count: usize,
    /// Whether tokens were dropped to meet the ceiling.
    pub truncated: bool,
}

/// Shared BPE encoder used to cut prompts to a token budget.
///
/// Counts are in this encoder's vocabulary (`cl100k_base` by default), not the summarization
/// model's own, so the ceiling approximates the model-side token count.
#[derive(Clone)]
pub struct TokenBudget {
    encoding: Arc<CoreBPE>,
    name: String,
}

impl std::fmt::Debug for TokenBudget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenBudget")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl TokenBudget {
    /// Resolve an encoding by model or encoding name.
    pub fn load(name: &str) -> Result<Self, TokenizerError> {
        let normalized = name.trim();
        let target = if normalized.is_empty() {
            "cl100k_base"
        } else {
            normalized
        };
        let encoding = resolve_encoding(target).map_err(|error| TokenizerError::Load {
            encoding: target.to_string(),
            message: error.to_string(),
        })?;
        Ok(Self {
            encoding: Arc::new(encoding),
            name: target.to_string(),
        })
    }

    /// Name of the resolved encoding.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Count the tokens in `text`.
    pub fn count(&self, text: &str) -> usize {
        self.encoding.encode_ordinary(text).len()
    }

    /// Keep at most `max_tokens` tokens of `text`.
    ///
    /// When the cut lands inside a multi-byte character the prefix is shortened a token at a time
    /// until it decodes cleanly.
    pub fn truncate(&self, text: &str, max_tokens: usize) -> Result<EncodedPrompt, TokenizerError> {
        let tokens = self.encoding.encode_ordinary(text);
        if tokens.len() <= max_tokens {
            return Ok(EncodedPrompt {
                text: text.to_string(),
                token_count: tokens.len(),
                truncated: false,
            });
        }

        let mut last_error = None;
        for backoff in 0..=MAX_DECODE_BACKOFF.min(max_tokens) {
            let keep = max_tokens - backoff;
            match self.encoding.decode(tokens[..keep].to_vec()) {
                Ok(decoded) => {
                    return Ok(EncodedPrompt {
                        text: decoded,
                        token_count: keep,
                        truncated: true,
                    });
                }
                Err(error) => last_error = Some(error.to_string()),
            }
        }

        Err(TokenizerError::Decode(
            last_error.unwrap_or_else(|| "empty token budget".into()),
        ))
    }
}

fn resolve_encoding(model: &str) -> anyhow::Result<CoreBPE> {
    match get_bpe_from_model(model) {
        Ok(encoding) => Ok(encoding),
        Err(model_err) => {
            tracing::debug!(
                model,
                error = %model_err,
                "Tokenizer model lookup failed; trying encoding name"
            );
            if let Some(candidate) = encoding_from_name(model) {
                candidate
            } else {
                tracing::warn!(model, "Falling back to 'cl100k_base' encoding");
                cl100k_base()
            }
        }
    }
}

fn encoding_from_name(name: &str) -> Option<anyhow::Result<CoreBPE>> {
    match name {
        "cl100k_base" => Some(cl100k_base()),
        "o200k_base" => Some(o200k_base()),
        "p50k_base" => Some(p50k_base()),
        "p50k_edit" => Some(p50k_edit()),
        "r50k_base" | "gpt2" => Some(r50k_base()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_prompt_is_untouched() {
        let budget = TokenBudget::load("cl100k_base").expect("encoding");
        let prompt = budget
            .truncate("summarize: a short book.", 512)
            .expect("prompt");
        assert!(!prompt.truncated);
        assert_eq!(prompt.text, "summarize: a short book.");
        assert_eq!(prompt.token_count, budget.count("summarize: a short book."));
    }

    #[test]
    fn long_prompt_is_cut_to_budget() {
        let budget = TokenBudget::load("cl100k_base").expect("encoding");
        let text = "word ".repeat(2_000);
        let prompt = budget.truncate(&text, 512).expect("prompt");
        assert!(prompt.truncated);
        assert_eq!(prompt.token_count, 512);
        assert!(budget.count(&prompt.text) <= 512);
        assert!(text.starts_with(&prompt.text));
    }

    #[test]
    fn multibyte_text_decodes_after_cut() {
        let budget = TokenBudget::load("cl100k_base").expect("encoding");
        let text = "図書館の本を要約します。".repeat(200);
        let prompt = budget.truncate(&text, 37).expect("prompt");
        assert!(prompt.token_count <= 37);
        assert!(text.starts_with(&prompt.text));
    }

    #[test]
    fn unknown_names_fall_back_to_cl100k() {
        let budget = TokenBudget::load("llama3.2:1b").expect("fallback encoding");
        assert_eq!(budget.name(), "llama3.2:1b");
        assert!(budget.count("hello world") > 0);
    }
}

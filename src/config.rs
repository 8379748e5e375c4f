use crate::processing::PipelineLimits;
use crate::summarization::DevicePreference;
use std::env;
use std::str::FromStr;
use std::sync::OnceLock;
use thiserror::Error;

const DEFAULT_OLLAMA_URL: &str = "http://127.0.0.1:11434";
const DEFAULT_TOKENIZER_ENCODING: &str = "cl100k_base";
const DEFAULT_SUMMARY_MAX_LENGTH: usize = 150;
const DEFAULT_SUMMARY_MIN_LENGTH: usize = 40;
const DEFAULT_MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

/// Errors encountered while loading configuration from environment variables.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Required environment variable was not provided.
    #[error("Missing environment variable: {0}")]
    MissingVariable(String),
    /// Environment variable contained a value that could not be parsed.
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
}

/// Runtime configuration for the book summarizer.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the Ollama runtime hosting the summarization model.
    pub ollama_url: String,
    /// Model identifier passed to the generation backend.
    pub summarization_model: String,
    /// Requested execution device; `auto` probes the host at startup.
    pub summarizer_device: DevicePreference,
    /// BPE encoding used to enforce the input token ceiling.
    pub tokenizer_encoding: String,
    /// Default upper bound on generated summary tokens.
    pub summary_max_length: usize,
    /// Default lower bound on generated summary tokens.
    pub summary_min_length: usize,
    /// Size ceilings applied before the model sees any text.
    pub limits: PipelineLimits,
    /// Maximum accepted HTTP request body size in bytes.
    pub max_upload_bytes: usize,
    /// Optional override for the HTTP server port.
    pub server_port: Option<u16>,
}

impl Config {
    /// Load configuration from environment variables, performing validation along the way.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = PipelineLimits::default();
        Ok(Self {
            ollama_url: load_env_optional("OLLAMA_URL")
                .unwrap_or_else(|| DEFAULT_OLLAMA_URL.to_string()),
            summarization_model: load_env("SUMMARIZATION_MODEL")?,
            summarizer_device: load_env_optional("SUMMARIZER_DEVICE")
                .map(|value| {
                    value
                        .parse()
                        .map_err(|()| ConfigError::InvalidValue("SUMMARIZER_DEVICE".into()))
                })
                .transpose()?
                .unwrap_or_default(),
            tokenizer_encoding: load_env_optional("TOKENIZER_ENCODING")
                .unwrap_or_else(|| DEFAULT_TOKENIZER_ENCODING.to_string()),
            summary_max_length: parse_or("SUMMARY_MAX_LENGTH", DEFAULT_SUMMARY_MAX_LENGTH)?,
            summary_min_length: parse_or("SUMMARY_MIN_LENGTH", DEFAULT_SUMMARY_MIN_LENGTH)?,
            limits: PipelineLimits {
                large_document_chars: parse_or(
                    "LARGE_DOCUMENT_CHARS",
                    defaults.large_document_chars,
                )?,
                max_input_chars: parse_positive("MAX_INPUT_CHARS", defaults.max_input_chars)?,
                key_sentence_count: parse_positive(
                    "KEY_SENTENCE_COUNT",
                    defaults.key_sentence_count,
                )?,
                min_sentence_chars: defaults.min_sentence_chars,
                max_input_tokens: parse_positive("MAX_INPUT_TOKENS", defaults.max_input_tokens)?,
                pdf_max_pages: parse_positive("PDF_MAX_PAGES", defaults.pdf_max_pages)?,
            },
            max_upload_bytes: parse_or("MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES)?,
            server_port: load_env_optional("SERVER_PORT")
                .map(|value| {
                    value
                        .parse()
                        .map_err(|_| ConfigError::InvalidValue("SERVER_PORT".into()))
                })
                .transpose()?,
        })
    }
}

fn load_env(key: &str) -> Result<String, ConfigError> {
    env::var(key).map_err(|_| ConfigError::MissingVariable(key.to_string()))
}

fn load_env_optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_or<T: FromStr>(key: &str, default: T) -> Result<T, ConfigError> {
    match load_env_optional(key) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue(key.to_string())),
        None => Ok(default),
    }
}

/// Like [`parse_or`], but rejects zero.
fn parse_positive(key: &str, default: usize) -> Result<usize, ConfigError> {
    match parse_or(key, default)? {
        0 => Err(ConfigError::InvalidValue(key.to_string())),
        value => Ok(value),
    }
}

/// Global configuration cache populated during process start.
pub static CONFIG: OnceLock<Config> = OnceLock::new();

/// Retrieve the loaded configuration, panicking if initialization has not occurred.
pub fn get_config() -> &'static Config {
    CONFIG.get().expect("Config not initialized")
}

/// Load configuration from the environment and install it in the global cache.
pub fn init_config() {
    dotenvy::dotenv().ok();
    let config = Config::from_env().expect("Failed to load config from environment");
    tracing::debug!(
        ollama_url = %config.ollama_url,
        model = %config.summarization_model,
        device = ?config.summarizer_device,
        server_port = ?config.server_port,
        "Loaded configuration"
    );
    CONFIG.set(config).expect("Failed to set config");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_or_falls_back_to_default_when_unset() {
        let value: usize = parse_or("BOOK_SUMMARIZER_TEST_UNSET_VARIABLE", 42).expect("default");
        assert_eq!(value, 42);
    }

    #[test]
    fn parse_or_rejects_garbage() {
        // SAFETY: the variable name is unique to this test.
        unsafe { env::set_var("BOOK_SUMMARIZER_TEST_GARBAGE", "twelve") };
        let error = parse_or::<usize>("BOOK_SUMMARIZER_TEST_GARBAGE", 12).expect_err("invalid");
        assert!(matches!(error, ConfigError::InvalidValue(key) if key == "BOOK_SUMMARIZER_TEST_GARBAGE"));
    }

    #[test]
    fn zero_pipeline_limit_is_rejected() {
        // SAFETY: the variable names are unique to this test.
        unsafe {
            env::set_var("BOOK_SUMMARIZER_TEST_ZERO_LIMIT", "0");
            env::set_var("BOOK_SUMMARIZER_TEST_POSITIVE_LIMIT", " 7 ");
        }
        let error = parse_positive("BOOK_SUMMARIZER_TEST_ZERO_LIMIT", 12).expect_err("zero");
        assert!(matches!(error, ConfigError::InvalidValue(key) if key == "BOOK_SUMMARIZER_TEST_ZERO_LIMIT"));
        assert_eq!(
            parse_positive("BOOK_SUMMARIZER_TEST_POSITIVE_LIMIT", 12).expect("positive"),
            7
        );
        assert_eq!(
            parse_positive("BOOK_SUMMARIZER_TEST_UNSET_LIMIT", 12).expect("default"),
            12
        );
    }
}

//! Abstractive generation backends.
//!
//! The pipeline talks to the language model through [`SummarizationClient`]. The shipped
//! backend issues a single greedy, non-streaming request to an Ollama runtime. Sampling is
//! disabled so identical prompts produce identical summaries.

mod device;
mod runtime;

pub use device::{Device, DevicePreference, ExecutionContext, Precision};
pub use runtime::ModelRuntime;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::{Map, Value, json};
use thiserror::Error;

/// Layer count that asks Ollama to offload the whole model.
const OFFLOAD_ALL_LAYERS: u32 = 999;

/// Errors surfaced while attempting abstractive summarization.
#[derive(Debug, Error)]
pub enum SummarizationClientError {
    /// Provider was unreachable or could not be constructed.
    #[error("Summarization provider unavailable: {0}")]
    ProviderUnavailable(String),
    /// Provider returned an error response.
    #[error("Failed to generate summary: {0}")]
    GenerationFailed(String),
    /// Provider response could not be parsed or was empty.
    #[error("Malformed provider response: {0}")]
    InvalidResponse(String),
}

/// One greedy generation call.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    /// Task-prefixed, token-bounded model input.
    pub prompt: String,
    /// Upper bound on generated tokens.
    pub max_new_tokens: usize,
    /// Requested lower bound on generated tokens.
    pub min_new_tokens: usize,
    /// Backend selected at startup.
    pub context: ExecutionContext,
}

/// Interface implemented by abstractive summarization providers.
#[async_trait]
pub trait SummarizationClient: Send + Sync {
    /// Run a single deterministic generation pass and return the decoded text.
    async fn generate(&self, request: GenerationRequest)
    -> Result<String, SummarizationClientError>;
}

/// Ollama-backed generation client.
pub struct OllamaSummarizationClient {
    http: Client,
    base_url: String,
    model: String,
}

impl OllamaSummarizationClient {
    /// Build a client for `model` served at `base_url`.
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
    ) -> Result<Self, SummarizationClientError> {
        let http = Client::builder()
            .user_agent("book-summarizer/generate")
            .build()
            .map_err(|error| {
                SummarizationClientError::ProviderUnavailable(format!(
                    "failed to construct HTTP client: {error}"
                ))
            })?;
        Ok(Self {
            http,
            base_url: base_url.into(),
            model: model.into(),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/api/generate", self.base_url.trim_end_matches('/'))
    }

    fn options(request: &GenerationRequest) -> Map<String, Value> {
        let mut options = Map::new();
        // Greedy decoding: always take the most likely token.
        options.insert("temperature".into(), json!(0.0));
        options.insert("top_k".into(), json!(1));
        options.insert("seed".into(), json!(0));
        options.insert("num_predict".into(), json!(request.max_new_tokens));
        let num_gpu = match request.context.device() {
            Device::Cpu => 0,
            Device::Accelerator => OFFLOAD_ALL_LAYERS,
        };
        options.insert("num_gpu".into(), json!(num_gpu));
        options.insert(
            "f16_kv".into(),
            json!(matches!(request.context.precision(), Precision::F16)),
        );
        options
    }
}

#[derive(Debug, Deserialize)]
struct OllamaResponse {
    response: String,
    done: bool,
    #[serde(default)]
    eval_count: Option<usize>,
}

#[async_trait]
impl SummarizationClient for OllamaSummarizationClient {
    async fn generate(
        &self,
        request: GenerationRequest,
    ) -> Result<String, SummarizationClientError> {
        let payload = json!({
            "model": self.model,
            "prompt": request.prompt,
            // The prompt already carries the task prefix; skip the chat template.
            "raw": true,
            "stream": false,
            "options": Self::options(&request),
        });

        let response = self
            .http
            .post(self.endpoint())
            .json(&payload)
            .send()
            .await
            .map_err(|error| {
                SummarizationClientError::ProviderUnavailable(format!(
                    "failed to reach Ollama at {}: {error}",
                    self.base_url
                ))
            })?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(SummarizationClientError::ProviderUnavailable(format!(
                "Ollama endpoint {} returned 404 (is model '{}' pulled?)",
                self.endpoint(),
                self.model
            )));
        }

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(SummarizationClientError::GenerationFailed(format!(
                "Ollama returned {status}: {body}"
            )));
        }

        let body: OllamaResponse = response.json().await.map_err(|error| {
            SummarizationClientError::InvalidResponse(format!(
                "failed to decode Ollama response: {error}"
            ))
        })?;

        if !body.done {
            return Err(SummarizationClientError::InvalidResponse(
                "Ollama response incomplete (streaming not supported)".into(),
            ));
        }

        // Ollama has no minimum-length option; surface short generations instead.
        if let Some(generated) = shortfall(body.eval_count, request.min_new_tokens) {
            tracing::warn!(
                generated,
                requested_min = request.min_new_tokens,
                "Generation stopped before requested minimum length"
            );
        }

        Ok(body.response.trim().to_string())
    }
}

/// Generated token count when the backend reported one below `min_new_tokens`.
fn shortfall(eval_count: Option<usize>, min_new_tokens: usize) -> Option<usize> {
    eval_count.filter(|generated| *generated < min_new_tokens)
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::{Method::POST, MockServer};

    fn request() -> GenerationRequest {
        GenerationRequest {
            prompt: "summarize: The crew sails for the island.".into(),
            max_new_tokens: 150,
            min_new_tokens: 40,
            context: ExecutionContext::for_device(Device::Cpu),
        }
    }

    #[test]
    fn shortfall_only_reports_counts_under_minimum() {
        assert_eq!(shortfall(Some(4), 40), Some(4));
        assert_eq!(shortfall(Some(40), 40), None);
        assert_eq!(shortfall(Some(120), 40), None);
        assert_eq!(shortfall(None, 40), None);
    }

    fn client(server: &MockServer) -> OllamaSummarizationClient {
        OllamaSummarizationClient::new(server.base_url(), "t5-small").expect("client")
    }

    #[tokio::test]
    async fn sends_greedy_raw_request() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/api/generate")
                    .json_body_partial(
                        r#"{
                            "model": "t5-small",
                            "raw": true,
                            "stream": false,
                            "options": { "temperature": 0.0, "top_k": 1, "num_predict": 150, "num_gpu": 0, "f16_kv": false }
                        }"#,
                    );
                then.status(200).json_body(json!({
                    "response": "  The crew sails.  ",
                    "done": true,
                    "eval_count": 4
                }));
            })
            .await;

        let summary = client(&server).generate(request()).await.expect("summary");

        mock.assert_async().await;
        assert_eq!(summary, "The crew sails.");
    }

    #[tokio::test]
    async fn error_status_is_generation_failure() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/api/generate");
                then.status(500).body("boom");
            })
            .await;

        let error = client(&server)
            .generate(request())
            .await
            .expect_err("error response");

        assert!(
            matches!(error, SummarizationClientError::GenerationFailed(ref message) if message.contains("500"))
        );
    }

    #[tokio::test]
    async fn missing_model_is_provider_unavailable() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/api/generate");
                then.status(404).body("model not found");
            })
            .await;

        let error = client(&server)
            .generate(request())
            .await
            .expect_err("missing model");

        assert!(matches!(
            error,
            SummarizationClientError::ProviderUnavailable(_)
        ));
    }

    #[tokio::test]
    async fn incomplete_response_is_rejected() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/api/generate");
                then.status(200)
                    .json_body(json!({ "response": "partial", "done": false }));
            })
            .await;

        let error = client(&server)
            .generate(request())
            .await
            .expect_err("incomplete");

        assert!(matches!(error, SummarizationClientError::InvalidResponse(_)));
    }
}

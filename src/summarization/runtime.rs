//! Process-wide model runtime.
//!
//! The generation client, tokenizer, and execution context are built once and shared read-only
//! for the rest of the process. Initialization goes through a `tokio::sync::OnceCell`, so
//! concurrent first callers wait on a single construction instead of racing.

use super::{ExecutionContext, OllamaSummarizationClient, SummarizationClient};
use crate::config::Config;
use crate::processing::{SummarizeError, TokenBudget};
use std::sync::Arc;
use tokio::sync::OnceCell;

static RUNTIME: OnceCell<ModelRuntime> = OnceCell::const_new();

/// Loaded model handle plus the resources the pipeline needs alongside it.
#[derive(Clone)]
pub struct ModelRuntime {
    client: Arc<dyn SummarizationClient>,
    tokenizer: TokenBudget,
    context: ExecutionContext,
}

impl ModelRuntime {
    /// Assemble a runtime from explicit parts.
    pub fn new(
        client: Arc<dyn SummarizationClient>,
        tokenizer: TokenBudget,
        context: ExecutionContext,
    ) -> Self {
        Self {
            client,
            tokenizer,
            context,
        }
    }

    /// Build a runtime from configuration, detecting the execution backend.
    pub fn from_config(config: &Config) -> Result<Self, SummarizeError> {
        let context = ExecutionContext::detect(config.summarizer_device);
        let tokenizer = TokenBudget::load(&config.tokenizer_encoding)?;
        let client =
            OllamaSummarizationClient::new(config.ollama_url.clone(), &config.summarization_model)?;
        tracing::info!(
            model = %config.summarization_model,
            device = ?context.device(),
            precision = ?context.precision(),
            tokenizer = tokenizer.name(),
            "Model runtime initialized"
        );
        Ok(Self::new(Arc::new(client), tokenizer, context))
    }

    /// Return the process-wide runtime, building it from `config` on first use.
    pub async fn global(config: &Config) -> Result<&'static ModelRuntime, SummarizeError> {
        RUNTIME
            .get_or_try_init(|| async { Self::from_config(config) })
            .await
    }

    /// Generation backend.
    pub fn client(&self) -> &dyn SummarizationClient {
        self.client.as_ref()
    }

    /// Tokenizer enforcing the prompt ceiling.
    pub fn tokenizer(&self) -> &TokenBudget {
        &self.tokenizer
    }

    /// Execution backend selected at startup.
    pub fn context(&self) -> ExecutionContext {
        self.context
    }
}

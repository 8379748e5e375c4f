//! Summarization service coordinating bounding, tokenization, generation, and storage.

use crate::{
    config::Config,
    metrics::{MetricsSnapshot, PipelineMetrics},
    pdf,
    processing::{
        normalize::bound_text,
        tokens::EncodedPrompt,
        types::{
            BoundedText, EMPTY_INPUT_SENTINEL, PipelineLimits, SummarizeError, SummaryOptions,
            TASK_PREFIX,
        },
    },
    storage::{BookStore, SummaryRecord},
    summarization::{GenerationRequest, ModelRuntime},
};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Wall-clock target for one summary, from raw text to decoded output.
pub const LATENCY_BUDGET: Duration = Duration::from_secs(30);

/// Owns the shared model runtime, the book store, and pipeline metrics.
///
/// Construct once near process start and share it through an `Arc`; the HTTP surface and the
/// CLI both call into the same instance.
pub struct SummaryService {
    runtime: ModelRuntime,
    store: Arc<dyn BookStore>,
    metrics: Arc<PipelineMetrics>,
    limits: PipelineLimits,
    default_max_length: usize,
    default_min_length: usize,
}

/// Abstraction over the summarization pipeline used by external surfaces.
#[async_trait]
pub trait SummaryApi: Send + Sync {
    /// Summarize raw text. Empty input yields the `"No text provided."` sentinel.
    async fn summarize(
        &self,
        text: &str,
        options: SummaryOptions,
    ) -> Result<String, SummarizeError>;

    /// Summarize a stored book and persist the result.
    async fn summarize_book(
        &self,
        book_id: u64,
        options: SummaryOptions,
    ) -> Result<SummaryRecord, SummarizeError>;

    /// Extract text from uploaded PDF bytes. Unreadable documents yield an empty string.
    async fn extract_pdf_text(&self, bytes: Vec<u8>) -> Result<String, SummarizeError>;

    /// Retrieve the current metrics snapshot.
    fn metrics_snapshot(&self) -> MetricsSnapshot;
}

/// Bounded text plus the token-capped prompt built from it.
struct PreparedInput {
    bounded: BoundedText,
    prompt: EncodedPrompt,
}

impl SummaryService {
    /// Build the service on the process-wide model runtime.
    pub async fn new(config: &Config, store: Arc<dyn BookStore>) -> Result<Self, SummarizeError> {
        let runtime = ModelRuntime::global(config).await?.clone();
        Ok(Self::from_parts(runtime, store, config))
    }

    /// Assemble a service from an explicit runtime.
    pub fn from_parts(runtime: ModelRuntime, store: Arc<dyn BookStore>, config: &Config) -> Self {
        Self {
            runtime,
            store,
            metrics: Arc::new(PipelineMetrics::new()),
            limits: config.limits,
            default_max_length: config.summary_max_length,
            default_min_length: config.summary_min_length,
        }
    }

    /// Summarize `text`, returning the summary and the bounded input it was built from.
    async fn run(
        &self,
        text: &str,
        options: SummaryOptions,
    ) -> Result<Option<(String, BoundedText)>, SummarizeError> {
        if text.trim().is_empty() {
            self.metrics.record_empty_input();
            return Ok(None);
        }

        let started = Instant::now();
        let (max_new_tokens, min_new_tokens) =
            options.resolve(self.default_max_length, self.default_min_length);

        let PreparedInput { bounded, prompt } = self.prepare(text.to_string()).await?;
        tracing::debug!(
            input_chars = bounded.input_chars,
            bounded_chars = bounded.text.chars().count(),
            extracted = bounded.extracted,
            truncated = bounded.truncated,
            prompt_tokens = prompt.token_count,
            prompt_truncated = prompt.truncated,
            "Prepared model input"
        );

        let generated = self
            .runtime
            .client()
            .generate(GenerationRequest {
                prompt: prompt.text,
                max_new_tokens,
                min_new_tokens,
                context: self.runtime.context(),
            })
            .await?;
        if generated.trim().is_empty() {
            return Err(SummarizeError::Model(
                crate::summarization::SummarizationClientError::InvalidResponse(
                    "model returned an empty summary".into(),
                ),
            ));
        }
        let summary = ensure_terminal_punctuation(&generated);

        let elapsed = started.elapsed();
        if elapsed > LATENCY_BUDGET {
            tracing::warn!(
                elapsed_ms = elapsed.as_millis() as u64,
                budget_ms = LATENCY_BUDGET.as_millis() as u64,
                input_chars = bounded.input_chars,
                "Summary exceeded latency budget"
            );
        } else {
            tracing::info!(
                elapsed_ms = elapsed.as_millis() as u64,
                input_chars = bounded.input_chars,
                summary_chars = summary.chars().count(),
                "Summary generated"
            );
        }
        self.metrics
            .record_summary(bounded.extracted, bounded.truncated);

        Ok(Some((summary, bounded)))
    }

    /// Normalize, extract, cap, and tokenize on the blocking pool.
    async fn prepare(&self, text: String) -> Result<PreparedInput, SummarizeError> {
        let limits = self.limits;
        let tokenizer = self.runtime.tokenizer().clone();
        let prepared = tokio::task::spawn_blocking(move || {
            let bounded = bound_text(&text, &limits);
            let prompt = tokenizer.truncate(
                &format!("{TASK_PREFIX}{}", bounded.text),
                limits.max_input_tokens,
            )?;
            Ok::<_, SummarizeError>(PreparedInput { bounded, prompt })
        })
        .await??;
        Ok(prepared)
    }
}

#[async_trait]
impl SummaryApi for SummaryService {
    async fn summarize(
        &self,
        text: &str,
        options: SummaryOptions,
    ) -> Result<String, SummarizeError> {
        Ok(self
            .run(text, options)
            .await?
            .map(|(summary, _)| summary)
            .unwrap_or_else(|| EMPTY_INPUT_SENTINEL.to_string()))
    }

    async fn summarize_book(
        &self,
        book_id: u64,
        options: SummaryOptions,
    ) -> Result<SummaryRecord, SummarizeError> {
        let raw_text = self
            .store
            .raw_text(book_id)
            .await?
            .ok_or(SummarizeError::BookNotFound(book_id))?;

        let record = match self.run(&raw_text, options).await? {
            Some((summary, bounded)) => {
                SummaryRecord::new(book_id, summary, bounded.input_chars, bounded.extracted)
            }
            None => SummaryRecord::new(book_id, EMPTY_INPUT_SENTINEL.to_string(), 0, false),
        };

        self.store.save_summary(record.clone()).await?;
        tracing::info!(book_id, record_id = %record.id, "Stored book summary");
        Ok(record)
    }

    async fn extract_pdf_text(&self, bytes: Vec<u8>) -> Result<String, SummarizeError> {
        let max_pages = self.limits.pdf_max_pages;
        let extraction =
            tokio::task::spawn_blocking(move || pdf::extract_pdf(&bytes, max_pages)).await?;
        self.metrics.record_pdf_pages(
            extraction.pages_extracted as u64,
            extraction.pages_skipped as u64,
        );
        Ok(extraction.text)
    }

    fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }
}

/// Append a period unless the text already ends in `.`, `!` or `?`.
pub fn ensure_terminal_punctuation(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.ends_with(['.', '!', '?']) {
        trimmed.to_string()
    } else {
        format!("{trimmed}.")
    }
}

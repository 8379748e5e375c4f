use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters describing summarization activity.
#[derive(Default)]
pub struct PipelineMetrics {
    summaries_generated: AtomicU64,
    empty_inputs: AtomicU64,
    extractions_applied: AtomicU64,
    truncations_applied: AtomicU64,
    pdf_pages_extracted: AtomicU64,
    pdf_pages_skipped: AtomicU64,
}

impl PipelineMetrics {
    /// Create an empty metrics accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a completed model-backed summary and which size ceilings engaged for it.
    pub fn record_summary(&self, extracted: bool, truncated: bool) {
        self.summaries_generated.fetch_add(1, Ordering::Relaxed);
        if extracted {
            self.extractions_applied.fetch_add(1, Ordering::Relaxed);
        }
        if truncated {
            self.truncations_applied.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Record a request that short-circuited on empty input.
    pub fn record_empty_input(&self) {
        self.empty_inputs.fetch_add(1, Ordering::Relaxed);
    }

    /// Record the outcome of a PDF extraction.
    pub fn record_pdf_pages(&self, extracted: u64, skipped: u64) {
        self.pdf_pages_extracted
            .fetch_add(extracted, Ordering::Relaxed);
        self.pdf_pages_skipped.fetch_add(skipped, Ordering::Relaxed);
    }

    /// Return a snapshot of the current counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            summaries_generated: self.summaries_generated.load(Ordering::Relaxed),
            empty_inputs: self.empty_inputs.load(Ordering::Relaxed),
            extractions_applied: self.extractions_applied.load(Ordering::Relaxed),
            truncations_applied: self.truncations_applied.load(Ordering::Relaxed),
            pdf_pages_extracted: self.pdf_pages_extracted.load(Ordering::Relaxed),
            pdf_pages_skipped: self.pdf_pages_skipped.load(Ordering::Relaxed),
        }
    }
}

/// Immutable view of pipeline counters used for reporting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct MetricsSnapshot {
    /// Summaries produced by the model since startup.
    pub summaries_generated: u64,
    /// Requests answered with the empty-input sentinel.
    pub empty_inputs: u64,
    /// Summaries whose input went through key-sentence extraction.
    pub extractions_applied: u64,
    /// Summaries whose input hit the hard character cap.
    pub truncations_applied: u64,
    /// PDF pages whose text was extracted.
    pub pdf_pages_extracted: u64,
    /// PDF pages skipped after an extraction failure.
    pub pdf_pages_skipped: u64,
}

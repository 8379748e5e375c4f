//! PDF text extraction ahead of summarization.
//!
//! Pages are read one at a time, in order, up to a page cap. A page that fails to extract is
//! logged and skipped; a document that cannot be opened at all yields an empty string so the
//! caller treats it like any other upload without usable text.

use lopdf::Document;
use std::panic::{AssertUnwindSafe, catch_unwind};
use thiserror::Error;

/// Default number of pages read from one document.
pub const DEFAULT_MAX_PAGES: usize = 20;

/// Errors raised while reading a PDF.
#[derive(Debug, Error)]
pub enum PdfError {
    /// The bytes are not a PDF the parser understands.
    #[error("failed to open PDF: {0}")]
    Open(String),
    /// A single page could not be converted to text.
    #[error("failed to extract page {page}: {message}")]
    Page {
        /// One-based page number.
        page: usize,
        /// Parser message.
        message: String,
    },
}

/// Page-addressable text source.
pub trait PageSource {
    /// Number of pages in the document.
    fn page_count(&self) -> usize;

    /// Text of the page at zero-based `index`.
    fn page_text(&self, index: usize) -> Result<String, PdfError>;
}

/// Result of a capped, failure-tolerant extraction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PdfExtraction {
    /// Extracted pages joined with newlines.
    pub text: String,
    /// Pages whose text was kept.
    pub pages_extracted: usize,
    /// Pages skipped after an extraction failure.
    pub pages_skipped: usize,
}

/// Extract text from PDF bytes, reading at most `max_pages` pages.
///
/// Returns an empty string when the document cannot be opened.
pub fn extract_text_from_pdf(bytes: &[u8], max_pages: usize) -> String {
    extract_pdf(bytes, max_pages).text
}

/// Like [`extract_text_from_pdf`], also reporting page counters.
pub fn extract_pdf(bytes: &[u8], max_pages: usize) -> PdfExtraction {
    match LopdfPages::open(bytes) {
        Ok(pages) => extract_pages(&pages, max_pages),
        Err(error) => {
            tracing::warn!(error = %error, bytes = bytes.len(), "Unreadable PDF upload");
            PdfExtraction::default()
        }
    }
}

/// Read up to `max_pages` pages from `source`, skipping pages that fail.
pub fn extract_pages(source: &dyn PageSource, max_pages: usize) -> PdfExtraction {
    let total = source.page_count();
    let mut pages = Vec::new();
    let mut skipped = 0;

    for index in 0..total.min(max_pages) {
        match source.page_text(index) {
            Ok(text) => pages.push(text.trim_end_matches(['\n', '\r']).to_string()),
            Err(error) => {
                skipped += 1;
                tracing::warn!(error = %error, "Skipping PDF page");
            }
        }
    }

    if total > max_pages {
        tracing::debug!(total, max_pages, "PDF page cap reached");
    }

    PdfExtraction {
        pages_extracted: pages.len(),
        pages_skipped: skipped,
        text: pages.join("\n"),
    }
}

/// [`PageSource`] backed by `lopdf`.
pub struct LopdfPages {
    document: Document,
    page_numbers: Vec<u32>,
}

impl LopdfPages {
    /// Parse a document from memory.
    pub fn open(bytes: &[u8]) -> Result<Self, PdfError> {
        let document = catch_unwind(|| Document::load_mem(bytes))
            .map_err(|_| PdfError::Open("parser panicked".into()))?
            .map_err(|error| PdfError::Open(error.to_string()))?;
        let page_numbers = document.get_pages().into_keys().collect();
        Ok(Self {
            document,
            page_numbers,
        })
    }
}

impl PageSource for LopdfPages {
    fn page_count(&self) -> usize {
        self.page_numbers.len()
    }

    fn page_text(&self, index: usize) -> Result<String, PdfError> {
        let page = index + 1;
        let number = *self.page_numbers.get(index).ok_or_else(|| PdfError::Page {
            page,
            message: "page out of range".into(),
        })?;
        // Malformed content streams can panic inside the parser; treat that like any page error.
        catch_unwind(AssertUnwindSafe(|| self.document.extract_text(&[number])))
            .map_err(|_| PdfError::Page {
                page,
                message: "parser panicked".into(),
            })?
            .map_err(|error| PdfError::Page {
                page,
                message: error.to_string(),
            })
    }
}

//! Book and summary persistence seam.
//!
//! The relational schema lives outside this crate. The pipeline only needs to read a book's raw
//! text and to write back a finished [`SummaryRecord`], so storage is expressed as the
//! [`BookStore`] trait. [`InMemoryBookStore`] backs the default server and the tests.

use async_trait::async_trait;
use serde::Serialize;
use std::collections::HashMap;
use thiserror::Error;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};
use tokio::sync::RwLock;
use uuid::Uuid;

/// Errors raised by storage backends.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The backend could not complete the request.
    #[error("storage backend error: {0}")]
    Backend(String),
}

/// A book as seen by the summarization pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredBook {
    /// Book identifier.
    pub id: u64,
    /// Display title.
    pub title: String,
    /// Uploaded text the summary is generated from.
    pub raw_text: String,
    /// Most recent summary, if one has been generated.
    pub summary: Option<SummaryRecord>,
}

/// Generated summary persisted against a book.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SummaryRecord {
    /// Unique record identifier.
    pub id: Uuid,
    /// Book the summary belongs to.
    pub book_id: u64,
    /// Summary text.
    pub summary: String,
    /// Characters in the normalized source text.
    pub source_chars: usize,
    /// Whether key-sentence extraction reduced the source.
    pub extracted: bool,
    /// RFC 3339 creation timestamp.
    pub generated_at: String,
}

impl SummaryRecord {
    /// Create a record stamped with the current UTC time.
    pub fn new(book_id: u64, summary: String, source_chars: usize, extracted: bool) -> Self {
        let generated_at = OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .unwrap_or_default();
        Self {
            id: Uuid::new_v4(),
            book_id,
            summary,
            source_chars,
            extracted,
            generated_at,
        }
    }
}

/// Storage operations the summarization pipeline depends on.
#[async_trait]
pub trait BookStore: Send + Sync {
    /// Load a book's raw text, or `None` when the book does not exist.
    async fn raw_text(&self, book_id: u64) -> Result<Option<String>, StorageError>;

    /// Persist a summary for an existing book, replacing any previous one.
    async fn save_summary(&self, record: SummaryRecord) -> Result<(), StorageError>;
}

/// Process-local [`BookStore`].
#[derive(Default)]
pub struct InMemoryBookStore {
    books: RwLock<HashMap<u64, StoredBook>>,
}

impl InMemoryBookStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a book.
    pub async fn insert_book(&self, id: u64, title: impl Into<String>, raw_text: impl Into<String>) {
        let book = StoredBook {
            id,
            title: title.into(),
            raw_text: raw_text.into(),
            summary: None,
        };
        self.books.write().await.insert(id, book);
    }

    /// Fetch a copy of a stored book.
    pub async fn book(&self, id: u64) -> Option<StoredBook> {
        self.books.read().await.get(&id).cloned()
    }
}

#[async_trait]
impl BookStore for InMemoryBookStore {
    async fn raw_text(&self, book_id: u64) -> Result<Option<String>, StorageError> {
        Ok(self
            .books
            .read()
            .await
            .get(&book_id)
            .map(|book| book.raw_text.clone()))
    }

    async fn save_summary(&self, record: SummaryRecord) -> Result<(), StorageError> {
        let mut books = self.books.write().await;
        let book = books.get_mut(&record.book_id).ok_or_else(|| {
            StorageError::Backend(format!("book {} disappeared before commit", record.book_id))
        })?;
        book.summary = Some(record);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn stores_and_replaces_summaries() {
        let store = InMemoryBookStore::new();
        store.insert_book(7, "Moby-Dick", "Call me Ishmael.").await;

        assert_eq!(
            store.raw_text(7).await.expect("read").as_deref(),
            Some("Call me Ishmael.")
        );
        assert!(store.raw_text(8).await.expect("read").is_none());

        store
            .save_summary(SummaryRecord::new(7, "First.".into(), 16, false))
            .await
            .expect("save");
        store
            .save_summary(SummaryRecord::new(7, "Second.".into(), 16, false))
            .await
            .expect("save");

        let book = store.book(7).await.expect("book");
        assert_eq!(book.summary.map(|record| record.summary).as_deref(), Some("Second."));
    }

    #[tokio::test]
    async fn saving_for_unknown_book_fails() {
        let store = InMemoryBookStore::new();
        let error = store
            .save_summary(SummaryRecord::new(1, "Orphan.".into(), 0, false))
            .await
            .expect_err("missing book");
        assert!(error.to_string().contains("book 1"));
    }

    #[test]
    fn record_timestamp_is_rfc3339() {
        let record = SummaryRecord::new(3, "Done.".into(), 5, true);
        assert!(OffsetDateTime::parse(&record.generated_at, &Rfc3339).is_ok());
    }
}

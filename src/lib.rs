#![deny(missing_docs)]

//! Core library for the book summarizer backend.

/// HTTP routing and REST handlers.
pub mod api;
/// Environment-driven configuration management.
pub mod config;
/// Structured logging and tracing setup.
pub mod logging;
/// Summarization pipeline counters.
pub mod metrics;
/// PDF text extraction.
pub mod pdf;
/// Bounding, tokenization, and summary orchestration.
pub mod processing;
/// Book and summary persistence interface.
pub mod storage;
/// Generation backends and the shared model runtime.
pub mod summarization;

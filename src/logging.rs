//! Tracing configuration and log routing.
//!
//! The server logs to stdout through a compact formatter and to a file. When
//! `BOOK_SUMMARIZER_LOG_FILE` is set, logs are appended to that path; otherwise a file logger
//! is created under `logs/book-summarizer.log`. The command-line front end logs to stderr only,
//! keeping stdout clean for the summary it prints.
use std::path::Path;
use std::sync::OnceLock;

use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

const DEFAULT_LOG_DIR: &str = "logs";
const DEFAULT_LOG_FILE: &str = "book-summarizer.log";

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// Configure tracing subscribers for the HTTP server.
///
/// - Respects `RUST_LOG` for filtering (defaults to `info`).
/// - Installs a compact stdout layer and, when available, a file layer.
/// - Keeps the non-blocking writer guard alive for the process lifetime.
pub fn init_tracing() {
    let stdout_layer = fmt::layer().with_target(false).compact();
    let registry = tracing_subscriber::registry()
        .with(env_filter("info"))
        .with(stdout_layer);

    match configure_file_writer() {
        Some(writer) => {
            let file_layer = fmt::layer()
                .with_writer(writer)
                .with_target(true)
                .with_ansi(false)
                .compact();
            registry.with(file_layer).init();
        }
        None => registry.init(),
    }
}

/// Configure a stderr-only subscriber for the `summarize` binary.
///
/// Defaults to `warn` so pipeline chatter does not drown out the printed summary.
pub fn init_cli_tracing() {
    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact();
    tracing_subscriber::registry()
        .with(env_filter("warn"))
        .with(stderr_layer)
        .init();
}

fn env_filter(default_directive: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive))
}

/// Build a non-blocking writer for file logging.
///
/// Returns `None` when the log directory cannot be created or the target file cannot be opened.
fn configure_file_writer() -> Option<NonBlocking> {
    let writer = match std::env::var("BOOK_SUMMARIZER_LOG_FILE") {
        Ok(path) => match std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
        {
            Ok(file) => tracing_appender::non_blocking(file),
            Err(err) => {
                eprintln!("Failed to open log file {path}: {err}");
                return None;
            }
        },
        Err(_) => {
            if let Err(err) = std::fs::create_dir_all(DEFAULT_LOG_DIR) {
                eprintln!("Failed to create {DEFAULT_LOG_DIR} directory: {err}");
                return None;
            }
            let appender =
                tracing_appender::rolling::never(Path::new(DEFAULT_LOG_DIR), DEFAULT_LOG_FILE);
            tracing_appender::non_blocking(appender)
        }
    };

    let (non_blocking, guard) = writer;
    let _ = LOG_GUARD.set(guard);
    Some(non_blocking)
}

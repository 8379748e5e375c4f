//! One-off summaries from the command line.
//!
//! Reads text from `--text`, `--file`, `--pdf`, or stdin, runs it through the same pipeline the
//! HTTP server uses, and prints the summary to stdout. `--extract-only` stops before the model
//! and prints the text that would have been sent to it.
use std::{
    io::{IsTerminal, Read},
    path::PathBuf,
    sync::Arc,
};

use anyhow::{Context, Result, bail};
use book_summarizer::{
    config::Config,
    logging,
    pdf::extract_text_from_pdf,
    processing::{SummaryApi, SummaryOptions, SummaryService, bound_text},
    storage::InMemoryBookStore,
};
use clap::{ArgGroup, Parser};

#[derive(Parser)]
#[command(
    name = "summarize",
    about = "Summarize a book, document, or PDF with the configured model"
)]
#[command(group(ArgGroup::new("input").args(["text", "file", "pdf"])))]
struct Cli {
    /// Inline text to summarize.
    #[arg(long)]
    text: Option<String>,
    /// Plain-text file to summarize.
    #[arg(long)]
    file: Option<PathBuf>,
    /// PDF document to summarize.
    #[arg(long)]
    pdf: Option<PathBuf>,
    /// Upper bound on summary tokens.
    #[arg(long)]
    max_length: Option<usize>,
    /// Lower bound on summary tokens (never below 20).
    #[arg(long)]
    min_length: Option<usize>,
    /// Print the bounded model input instead of calling the model.
    #[arg(long)]
    extract_only: bool,
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    dotenvy::dotenv().ok();
    logging::init_cli_tracing();
    let config = Config::from_env().context("failed to load configuration")?;

    let text = read_input(&cli, &config)?;
    if cli.extract_only {
        println!("{}", bound_text(&text, &config.limits).text);
        return Ok(());
    }

    let service = SummaryService::new(&config, Arc::new(InMemoryBookStore::new()))
        .await
        .context("failed to initialize model runtime")?;
    let options = SummaryOptions {
        max_length: cli.max_length,
        min_length: cli.min_length,
    };
    let summary = service
        .summarize(&text, options)
        .await
        .context("summarization failed")?;
    println!("{summary}");
    Ok(())
}

fn read_input(cli: &Cli, config: &Config) -> Result<String> {
    if let Some(text) = &cli.text {
        return Ok(text.clone());
    }
    if let Some(path) = &cli.file {
        return std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()));
    }
    if let Some(path) = &cli.pdf {
        let bytes =
            std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
        let text = extract_text_from_pdf(&bytes, config.limits.pdf_max_pages);
        if text.trim().is_empty() {
            tracing::warn!(path = %path.display(), "No text extracted from PDF");
        }
        return Ok(text);
    }

    let mut stdin = std::io::stdin();
    if stdin.is_terminal() {
        bail!("provide --text, --file, --pdf, or pipe text on stdin");
    }
    let mut buffer = String::new();
    stdin
        .read_to_string(&mut buffer)
        .context("failed to read stdin")?;
    Ok(buffer)
}

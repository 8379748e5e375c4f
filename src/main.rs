//! HTTP server entrypoint.
//!
//! Loads the model runtime once, then serves the summarization API. Without `SERVER_PORT` the
//! server takes the first free port in 5000-5099.
use anyhow::{Context, Result, bail};
use book_summarizer::{api, config, logging, processing::SummaryService, storage};
use std::net::Ipv4Addr;
use std::ops::RangeInclusive;
use std::sync::Arc;
use tokio::net::TcpListener;

const PORT_RANGE: RangeInclusive<u16> = 5000..=5099;

#[tokio::main]
async fn main() -> Result<()> {
    config::init_config();
    logging::init_tracing();
    let config = config::get_config();

    let store = Arc::new(storage::InMemoryBookStore::new());
    let service = SummaryService::new(config, store)
        .await
        .context("failed to initialize model runtime")?;
    let app = api::create_router(Arc::new(service), config.max_upload_bytes);

    let (listener, port) = bind_listener(config.server_port).await?;
    tracing::info!("Listening on http://0.0.0.0:{}", port);
    axum::serve(listener, app)
        .await
        .context("HTTP server terminated unexpectedly")
}

async fn bind_listener(requested: Option<u16>) -> Result<(TcpListener, u16)> {
    if let Some(port) = requested {
        let listener = TcpListener::bind((Ipv4Addr::UNSPECIFIED, port))
            .await
            .with_context(|| format!("failed to bind port {port}"))?;
        return Ok((listener, port));
    }

    for port in PORT_RANGE {
        match TcpListener::bind((Ipv4Addr::UNSPECIFIED, port)).await {
            Ok(listener) => {
                tracing::debug!(port, "Bound server port");
                return Ok((listener, port));
            }
            Err(err) if err.kind() == std::io::ErrorKind::AddrInUse => {
                tracing::debug!(port, "Port already in use; trying next");
            }
            Err(err) => return Err(err).with_context(|| format!("failed to bind port {port}")),
        }
    }

    bail!(
        "no available port found in range {}-{}",
        PORT_RANGE.start(),
        PORT_RANGE.end()
    )
}

//! ghoststock gatekeeper entry point.
//!
//! Boots one gatekeeper against the configured origin, registers it (install
//! then activate), and exposes it as MCP tools on stdio transport.
//! Logging goes to stderr to avoid interfering with the JSON-RPC protocol on stdout.

use std::sync::Arc;

use anyhow::Result;
use ghoststock_client::{FetchConfig, Gatekeeper, HttpNetwork};
use ghoststock_core::{CacheStorage, GateConfig};
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use tracing_subscriber::EnvFilter;

mod error;
mod handler;
mod tools;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = GateConfig::load()?;
    tracing::info!(
        cache_name = %config.cache_name,
        origin = %config.origin,
        db_path = %config.db_path.display(),
        "Starting ghoststock gatekeeper on stdio transport"
    );

    let storage = CacheStorage::open(&config.db_path).await?;
    let network = HttpNetwork::new(FetchConfig::from(&config))?;
    let gate = Arc::new(Gatekeeper::new(storage, Arc::new(network), &config)?);

    if let Err(e) = gate.register().await {
        tracing::warn!(
            error = %e,
            state = %gate.state(),
            "registration failed; requests pass through until install succeeds"
        );
    }

    let handler = handler::GateServer::new(gate.clone());
    let server = serve_server(handler, stdio()).await?;

    server.waiting().await?;
    gate.settle().await;

    Ok(())
}

//! telemetry-relay binary entry point.
//!
//! Usage:
//! ```bash
//! telemetry-relay --config relay.toml
//! RUST_LOG=telemetry_relay=debug telemetry-relay
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use telemetry_relay::config::Config;
use telemetry_relay::server::{serve, TelemetryRelay};
use telemetry_relay::store::MemoryStore;
use tracing_subscriber::EnvFilter;

/// In-memory relay for fragment-keyed simulation telemetry.
#[derive(Parser, Debug)]
#[command(name = "telemetry-relay")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(long, short, default_value = "relay.toml")]
    config: PathBuf,

    /// Override `server.bind_address` from the config file
    #[arg(long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let mut config = Config::load_or_default(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;
    if let Some(bind) = cli.bind {
        config.server.bind_address = bind;
    }
    config.validate().context("validating configuration")?;

    tracing::info!("telemetry-relay v{}", env!("CARGO_PKG_VERSION"));
    let relay = Arc::new(TelemetryRelay::new(config, MemoryStore::new()));

    serve(relay, shutdown_signal()).await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

//! sportmld: sportml daemon.
//!
//! Serves the chat, next-events and health endpoints over HTTP.

use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use sportml::server::config::{Config, Secrets};
use sportml::server::{AppState, serve, shutdown_signal};

/// sportml daemon: sports chat gateway service.
#[derive(Parser)]
#[command(name = "sportmld")]
#[command(version = sportml::PKG_VERSION)]
#[command(about = "Sports chat gateway daemon")]
struct Args {
    /// Path to configuration file.
    #[arg(short, long, env = "SPORTML_CONFIG")]
    config: Option<std::path::PathBuf>,

    /// Override the bind address from the config file.
    #[arg(short, long)]
    address: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    let config = Config::load(args.config.as_deref())?;
    let secrets = Secrets::load()?;

    let orchestrator = config.builder(&secrets).build()?;
    let registry = orchestrator.registry();
    if registry.usable() < registry.len() {
        warn!(
            usable = registry.usable(),
            registered = registry.len(),
            "some providers have no credential and will be skipped"
        );
    }

    let address = args.address.as_deref().unwrap_or(&config.server.address);
    let addr: SocketAddr = address.parse().map_err(|e| {
        sportml::SportmlError::Configuration(format!("Invalid address {address:?}: {e}"))
    })?;

    info!(
        version = sportml::version_string(),
        %addr,
        providers = ?orchestrator.registry().provider_names(),
        "sportmld starting"
    );

    let listener = TcpListener::bind(addr).await?;
    let state = AppState::new(Arc::new(orchestrator), config.server.environment);
    serve(listener, state, shutdown_signal()).await?;

    info!("sportmld stopped");
    Ok(())
}

//! Okapi-style multi-tenant gateway.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ──────────────▶ http server ──▶ tenant check ──▶ route resolver
//!                                                         │ ordered steps
//!                                                         ▼
//!     Client Response                               pipeline executor
//!     ◀────────────── + X-Okapi-Trace ◀──── module ◀──▶ module ◀──▶ module
//!
//!     Cross-cutting: config (+ hot reload), registry snapshot,
//!                    observability, lifecycle
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use okapi_gateway::config::{load_config, watcher::ConfigWatcher, GatewayConfig};
use okapi_gateway::observability::{init_logging, init_metrics};
use okapi_gateway::{HttpServer, Shutdown};

#[derive(Parser, Debug)]
#[command(name = "okapi-gateway", version, about = "Multi-tenant module gateway")]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Reload the configuration file when it changes.
    #[arg(long, requires = "config")]
    watch: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => GatewayConfig::default(),
    };

    init_logging(&config.observability);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "okapi-gateway starting");

    tracing::info!(
        bind_address = %config.listener.bind_address,
        modules = config.modules.len(),
        tenants = config.tenants.len(),
        deployments = config.deployments.len(),
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    // The watcher stops when dropped, so it lives until main returns.
    let (_watcher, config_updates) = match (&cli.config, cli.watch) {
        (Some(path), true) => {
            let (watcher, updates) = ConfigWatcher::new(path);
            (Some(watcher.run()?), updates)
        }
        _ => (None, tokio::sync::mpsc::unbounded_channel().1),
    };

    let shutdown = Shutdown::new();
    let server = HttpServer::new(config);
    server.run(listener, config_updates, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

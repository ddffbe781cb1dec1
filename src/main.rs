//! Relay gateway (v1)
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ──────────────▶ http::server ──▶ http::gateway ──▶ routing (match + rewrite)
//!                                           │
//!                                           ├──▶ audit (request log, background)
//!                                           │
//!                                           ▼
//!                                    net::tls client ──▶ Origin
//!                                           │
//!     Client Response                       ▼
//!     ◀────────────── http::capture ◀── origin response
//!                           │
//!                           └──▶ audit (response log, background)
//!
//!     store (routes file, request records) ◀── cache (TTL, swept)
//! ```

use std::path::PathBuf;

use clap::Parser;

use relay_gateway::config::{load_config, GatewayConfig};
use relay_gateway::lifecycle::{signals, Application, Shutdown};
use relay_gateway::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "relay-gateway")]
#[command(about = "Reverse-proxy gateway that records every request", long_about = None)]
struct Cli {
    /// Path to the TOML configuration file. Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => GatewayConfig::default(),
    };

    logging::init(&config.observability.log_filter);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "relay-gateway starting");
    tracing::info!(
        config = ?cli.config,
        bind_address = %config.listener.bind_address,
        route_ttl_secs = config.cache.route_ttl_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => {
                metrics::init_metrics(addr);
            }
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let shutdown = Shutdown::new();
    let app = Application::build(&config, shutdown.clone()).await?;
    signals::spawn_signal_handler(shutdown);
    app.run().await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

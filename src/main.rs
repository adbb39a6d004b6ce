//! API gateway binary.
//!
//! ```text
//!                        ┌──────────────────────────────────────────────┐
//!                        │                 API GATEWAY                   │
//!   Client Request       │  ┌────────────┐   ┌────────┐   ┌───────────┐  │
//!   ─────────────────────┼─▶│ rate limit │──▶│  auth  │──▶│  header   │  │
//!                        │  │   layer    │   │        │   │  guard    │  │
//!                        │  └─────┬──────┘   └────────┘   └─────┬─────┘  │
//!                        │        │ redis / local bucket        ▼        │
//!                        │        ▼                      ┌───────────┐  │
//!                        │   shared store                │  route +  │  │
//!                        │                               │  locate   │  │
//!                        │                               └─────┬─────┘  │
//!   Client Response      │                               ┌─────▼─────┐  │
//!   ◀────────────────────┼───────────────────────────────│ forwarder │◀─┼── Backend
//!                        │                               │ + breaker │  │
//!                        │                               └───────────┘  │
//!                        └──────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;

use api_gateway::config::{load_config, GatewayConfig};
use api_gateway::lifecycle::signals::wait_for_signal;
use api_gateway::observability::{logging, metrics};
use api_gateway::{Gateway, HttpServer, Shutdown};

#[derive(Debug, Parser)]
#[command(name = "api-gateway", version, about = "Authenticating API gateway")]
struct Cli {
    /// Path to the TOML configuration file. Defaults apply when omitted.
    #[arg(short, long, env = "GATEWAY_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => GatewayConfig::default(),
    };

    logging::init_logging(&config.observability.log_level);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "api-gateway starting");
    match &cli.config {
        Some(path) => tracing::info!(path = %path.display(), "Configuration loaded"),
        None => tracing::warn!("No configuration file given, using defaults"),
    }

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    let bind_address = config.listener.bind_address.clone();
    let gateway = Gateway::build(config).await?;
    let server = HttpServer::new(gateway);

    let listener = TcpListener::bind(&bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Arc::new(Shutdown::new());
    let trigger = shutdown.clone();
    tokio::spawn(async move {
        wait_for_signal().await;
        trigger.trigger();
    });

    server.run(listener, &shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

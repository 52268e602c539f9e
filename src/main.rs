//! logdrain-router
//!
//! Receives HTTP log drains, decodes their octet-counted syslog frames and
//! routes the database log lines to the monitored server that emitted them.
//!
//! # Architecture Overview
//!
//! ```text
//!                     ┌───────────────────────────────────────────────────────────┐
//!                     │                     LOGDRAIN ROUTER                        │
//!                     │                                                            │
//!   POST /logs/<src>  │  ┌─────────┐    ┌──────────┐    ┌────────────┐            │
//!   ──────────────────┼─▶│  http   │───▶│  drain   │───▶│ correlation│───┐        │
//!                     │  │ server  │    │ decoder  │mpsc│   worker   │   │mpsc    │
//!                     │  └─────────┘    └──────────┘    └─────┬──────┘   ▼        │
//!                     │                                       │     ┌─────────┐   │
//!                     │                           ┌───────────┘     │  sink   │───┼──▶ stdout / log
//!                     │                           ▼                 └─────────┘   │
//!                     │                     ┌──────────┐                          │
//!                     │                     │ registry │                          │
//!                     │                     └──────────┘                          │
//!                     │                                                            │
//!                     │   config · lifecycle · observability · resilience         │
//!                     └───────────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;

use logdrain_router::config::{load_config, RouterConfig};
use logdrain_router::lifecycle::{self, wait_for_signal, Shutdown};
use logdrain_router::observability::logging::init_logging;

#[derive(Parser)]
#[command(name = "logdrain-router")]
#[command(about = "Routes Postgres log drains to monitored servers", long_about = None)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Validate the configuration and exit
    #[arg(long)]
    check: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => RouterConfig::default(),
    };

    if cli.check {
        println!("configuration ok ({} servers)", config.servers.len());
        return Ok(());
    }

    init_logging(&config.observability);

    tracing::info!("logdrain-router v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        tls = config.listener.tls.is_some(),
        servers = config.servers.len(),
        sink = %config.sink.kind,
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );
    if config.servers.is_empty() {
        tracing::warn!("No servers configured, every log line will be dropped");
    }

    let shutdown = Shutdown::new();
    let signal_shutdown = shutdown.clone();
    tokio::spawn(async move {
        wait_for_signal().await;
        signal_shutdown.trigger();
    });

    lifecycle::run(config, shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

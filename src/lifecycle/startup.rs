//! Startup orchestration.
//!
//! # Responsibilities
//! - Initialize subsystems in dependency order
//! - Start the correlator and sink tasks
//! - Bind the listener and serve until shutdown
//! - Wait for the pipeline to drain before returning
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Listeners start last (traffic only when ready)

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::mpsc;

use crate::config::RouterConfig;
use crate::correlation::StreamCorrelator;
use crate::http::{load_tls_config, HttpServer, TlsError};
use crate::lifecycle::Shutdown;
use crate::logline::PostgresLogParser;
use crate::observability::metrics;
use crate::registry::ServerRegistry;
use crate::sink::{build_sink, run_sink, SinkError};

/// Error type for daemon startup and serving.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("failed to bind {addr}: {source}")]
    Bind { addr: String, source: io::Error },

    #[error("TLS setup failed: {0}")]
    Tls(#[from] TlsError),

    #[error("invalid metrics address '{0}'")]
    MetricsAddress(String),

    #[error("metrics exporter failed: {0}")]
    Metrics(#[from] metrics_exporter_prometheus::BuildError),

    #[error(transparent)]
    Sink(#[from] SinkError),

    #[error("HTTP server failed: {0}")]
    Server(#[from] io::Error),
}

/// Run the router until `shutdown` fires and the pipeline has drained.
pub async fn run(config: RouterConfig, shutdown: Shutdown) -> Result<(), StartupError> {
    if config.observability.metrics_enabled {
        let addr: SocketAddr = config
            .observability
            .metrics_address
            .parse()
            .map_err(|_| StartupError::MetricsAddress(config.observability.metrics_address.clone()))?;
        metrics::init_metrics(addr)?;
    }

    let registry = Arc::new(ServerRegistry::from_config(&config.servers));
    let sink = build_sink(&config.sink.kind)?;

    let (message_tx, message_rx) = mpsc::channel(config.drain.message_queue_size);
    let (record_tx, record_rx) = mpsc::channel(config.drain.record_queue_size);

    let correlator = StreamCorrelator::new(
        Arc::clone(&registry),
        PostgresLogParser,
        config.correlation.clone(),
    );
    let correlator_task = tokio::spawn(correlator.run(message_rx, record_tx, shutdown.subscribe()));
    let sink_task = tokio::spawn(run_sink(sink, record_rx));

    tracing::info!(
        servers = registry.len(),
        sink = %config.sink.kind,
        "Pipeline started"
    );

    let server = HttpServer::new(&config, registry, message_tx);
    let served = serve(&config, server, &shutdown).await;

    // The listener is gone; make sure the workers wind down as well.
    shutdown.trigger();

    if let Err(e) = correlator_task.await {
        tracing::error!(error = %e, "Correlator task failed");
    }
    match sink_task.await {
        Ok(Ok(_)) => {}
        Ok(Err(e)) => tracing::error!(error = %e, "Record sink failed"),
        Err(e) => tracing::error!(error = %e, "Record sink task failed"),
    }

    served
}

async fn serve(
    config: &RouterConfig,
    server: HttpServer,
    shutdown: &Shutdown,
) -> Result<(), StartupError> {
    let bind_address = &config.listener.bind_address;

    match &config.listener.tls {
        Some(tls) => {
            let addr: SocketAddr = bind_address.parse().map_err(|e| StartupError::Bind {
                addr: bind_address.clone(),
                source: io::Error::new(io::ErrorKind::InvalidInput, e),
            })?;
            let tls_config = load_tls_config(tls).await?;
            server.run_tls(addr, tls_config, shutdown.subscribe()).await?;
        }
        None => {
            let listener = TcpListener::bind(bind_address)
                .await
                .map_err(|source| StartupError::Bind {
                    addr: bind_address.clone(),
                    source,
                })?;
            server.run(listener, shutdown.subscribe()).await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_bind_failure_is_reported() {
        let taken = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let mut config = RouterConfig::default();
        config.listener.bind_address = taken.local_addr().unwrap().to_string();
        config.sink.kind = "log".into();

        let err = run(config, Shutdown::new()).await.unwrap_err();
        assert!(matches!(err, StartupError::Bind { .. }));
    }

    #[tokio::test]
    async fn test_stops_on_shutdown() {
        let mut config = RouterConfig::default();
        config.listener.bind_address = "127.0.0.1:0".into();
        config.sink.kind = "log".into();

        let shutdown = Shutdown::new();
        let task = tokio::spawn(run(config, shutdown.clone()));

        // give the listener a moment to come up
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        shutdown.trigger();

        let result = tokio::time::timeout(std::time::Duration::from_secs(2), task)
            .await
            .expect("router should stop after shutdown")
            .unwrap();
        assert!(result.is_ok());
    }
}

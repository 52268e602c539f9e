//! Shared utilities for integration testing.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use logdrain_router::config::{RouterConfig, ServerConfig};
use logdrain_router::drain::encode_frame;
use logdrain_router::logline::PostgresLogParser;
use logdrain_router::registry::ServerRegistry;
use logdrain_router::{HttpServer, RoutedRecord, Shutdown, StreamCorrelator};

/// A running router on an ephemeral port, with the record channel exposed.
pub struct Pipeline {
    pub addr: SocketAddr,
    pub records: mpsc::Receiver<RoutedRecord>,
    pub shutdown: Shutdown,
    pub server: JoinHandle<std::io::Result<()>>,
    pub correlator: JoinHandle<()>,
}

impl Pipeline {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Next routed record, failing the test after two seconds.
    pub async fn next_record(&mut self) -> RoutedRecord {
        tokio::time::timeout(Duration::from_secs(2), self.records.recv())
            .await
            .expect("timed out waiting for a routed record")
            .expect("record channel closed")
    }

    /// True if no record shows up within a short grace period.
    pub async fn no_more_records(&mut self) -> bool {
        tokio::time::timeout(Duration::from_millis(200), self.records.recv())
            .await
            .is_err()
    }
}

/// Two servers: `db1` → `srv-1` and `db2` → `srv-2`.
pub fn test_config() -> RouterConfig {
    let mut config = RouterConfig::default();
    config.listener.bind_address = "127.0.0.1:0".into();
    config.servers = vec![
        ServerConfig {
            section_name: "db1".into(),
            identifier: Some("srv-1".into()),
            db_url: Some("postgres://app_user@db1.internal/orders".into()),
            ..Default::default()
        },
        ServerConfig {
            section_name: "db2".into(),
            identifier: Some("srv-2".into()),
            ..Default::default()
        },
    ];
    config
}

/// Start decoder, correlator and server the way the daemon wires them.
pub async fn start_pipeline(config: RouterConfig) -> Pipeline {
    let registry = Arc::new(ServerRegistry::from_config(&config.servers));
    let shutdown = Shutdown::new();

    let (message_tx, message_rx) = mpsc::channel(config.drain.message_queue_size);
    let (record_tx, record_rx) = mpsc::channel(config.drain.record_queue_size);

    let correlator = StreamCorrelator::new(
        Arc::clone(&registry),
        PostgresLogParser,
        config.correlation.clone(),
    );
    let correlator = tokio::spawn(correlator.run(message_rx, record_tx, shutdown.subscribe()));

    let listener = TcpListener::bind(&config.listener.bind_address).await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = HttpServer::new(&config, registry, message_tx);
    let server = tokio::spawn(server.run(listener, shutdown.subscribe()));

    Pipeline {
        addr,
        records: record_rx,
        shutdown,
        server,
        correlator,
    }
}

/// Syslog payload as emitted for a Postgres add-on.
pub fn postgres_frame(message: &str) -> String {
    format!("<134>1 2024-03-01T10:00:00+00:00 host app postgres.1 - {message}")
}

/// Octet-encode `payloads` into one drain body.
pub fn drain_body<S: AsRef<str>>(payloads: &[S]) -> Vec<u8> {
    let mut out = Vec::new();
    for payload in payloads {
        encode_frame(payload.as_ref().as_bytes(), &mut out);
    }
    out
}

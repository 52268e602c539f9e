//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with all handlers
//! - Wire up middleware (request ID, tracing, timeout, body limit)
//! - Stream drain bodies through the message decoder into the correlator
//! - Serve plain TCP or TLS with graceful shutdown

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use axum_server::tls_rustls::RustlsConfig;
use futures_util::TryStreamExt;
use serde::Serialize;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tokio_util::io::StreamReader;
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::RouterConfig;
use crate::drain::{FrameFilter, MessageDecoder, RawMessage};
use crate::http::request::{request_id, MakeRequestUuid};
use crate::observability::metrics;
use crate::registry::ServerRegistry;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    /// Input channel of the stream correlator.
    pub messages: mpsc::Sender<RawMessage>,
    pub registry: Arc<ServerRegistry>,
    pub filter: FrameFilter,
    pub max_frame_bytes: usize,
}

/// HTTP server for drain deliveries.
pub struct HttpServer {
    router: Router,
    request_timeout: Duration,
}

impl HttpServer {
    /// Create a new HTTP server feeding `messages`.
    pub fn new(
        config: &RouterConfig,
        registry: Arc<ServerRegistry>,
        messages: mpsc::Sender<RawMessage>,
    ) -> Self {
        let state = AppState {
            messages,
            registry,
            filter: FrameFilter::new(&config.drain.filter, config.correlation.identify_marker.clone()),
            max_frame_bytes: config.drain.max_frame_bytes,
        };

        Self {
            router: Self::build_router(config, state),
            request_timeout: Duration::from_secs(config.timeouts.request_secs),
        }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &RouterConfig, state: AppState) -> Router {
        Router::new()
            .route("/health", get(health_handler))
            .route("/status", get(status_handler))
            .route("/{*path}", post(drain_handler))
            .route("/", post(drain_handler))
            .with_state(state)
            .layer(RequestBodyLimitLayer::new(config.security.max_body_size))
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(
                TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                    tracing::info_span!(
                        "request",
                        method = %request.method(),
                        path = %request.uri().path(),
                        request_id = %request_id(request.headers()),
                    )
                }),
            )
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    /// The fully layered router.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server on `listener` until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("HTTP server draining connections");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Run the server with TLS on `addr` until `shutdown` fires.
    pub async fn run_tls(
        self,
        addr: SocketAddr,
        tls: RustlsConfig,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), io::Error> {
        tracing::info!(address = %addr, "HTTPS server starting");

        let handle = axum_server::Handle::new();
        let shutdown_handle = handle.clone();
        let grace = self.request_timeout;
        tokio::spawn(async move {
            let _ = shutdown.recv().await;
            tracing::info!("HTTPS server draining connections");
            shutdown_handle.graceful_shutdown(Some(grace));
        });

        axum_server::bind_rustls(addr, tls)
            .handle(handle)
            .serve(self.router.into_make_service())
            .await?;

        tracing::info!("HTTPS server stopped");
        Ok(())
    }
}

/// Decode one drain delivery and hand its messages to the correlator.
async fn drain_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let request_id = request_id(request.headers()).to_string();
    let path = request.uri().path().to_string();

    let body = request
        .into_body()
        .into_data_stream()
        .map_err(io::Error::other);
    let mut decoder = MessageDecoder::new(
        StreamReader::new(body),
        path.as_str(),
        state.filter.clone(),
        state.max_frame_bytes,
    );

    loop {
        match decoder.next_message().await {
            Ok(Some(message)) => {
                if state.messages.send(message).await.is_err() {
                    tracing::warn!(
                        request_id = %request_id,
                        path = %path,
                        "Correlator is gone, rejecting delivery"
                    );
                    metrics::record_request(503);
                    return (StatusCode::SERVICE_UNAVAILABLE, "shutting down").into_response();
                }
            }
            Ok(None) => break,
            Err(e) => {
                tracing::warn!(
                    request_id = %request_id,
                    path = %path,
                    frames = decoder.stats().frames,
                    error = %e,
                    "Framing error, discarding rest of body"
                );
                metrics::record_request(400);
                return (StatusCode::BAD_REQUEST, e.to_string()).into_response();
            }
        }
    }

    let stats = decoder.stats();
    tracing::debug!(
        request_id = %request_id,
        path = %path,
        frames = stats.frames,
        filtered = stats.filtered,
        "Drain delivery decoded"
    );
    metrics::record_request(204);
    StatusCode::NO_CONTENT.into_response()
}

async fn health_handler() -> &'static str {
    "ok"
}

#[derive(Debug, Serialize)]
struct StatusResponse {
    version: &'static str,
    servers: Vec<ServerStatus>,
}

#[derive(Debug, Serialize)]
struct ServerStatus {
    section_name: String,
    identifier: String,
}

async fn status_handler(State(state): State<AppState>) -> Json<StatusResponse> {
    Json(StatusResponse {
        version: env!("CARGO_PKG_VERSION"),
        servers: state
            .registry
            .iter()
            .map(|server| ServerStatus {
                section_name: server.section_name().to_string(),
                identifier: server.identifier().to_string(),
            })
            .collect(),
    })
}

//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP/TLS connection
//!     → server.rs (Axum setup, middleware)
//!     → request.rs (request ID)
//!     → drain handler: body stream → drain::MessageDecoder
//!     → correlator input channel
//!     → 204 / 400 / 503
//! ```

pub mod request;
pub mod server;
pub mod tls;

pub use request::{request_id, MakeRequestUuid, X_REQUEST_ID};
pub use server::{AppState, HttpServer};
pub use tls::{load_tls_config, TlsError};

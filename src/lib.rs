//! Log-drain router library.

pub mod config;
pub mod correlation;
pub mod drain;
pub mod http;
pub mod lifecycle;
pub mod logline;
pub mod observability;
pub mod registry;
pub mod resilience;
pub mod sink;

pub use config::RouterConfig;
pub use correlation::{RoutedRecord, StreamCorrelator};
pub use drain::{MessageDecoder, RawMessage};
pub use http::HttpServer;
pub use lifecycle::Shutdown;

//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the router.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

use crate::correlation::DEFAULT_IDENTIFY_MARKER;
use crate::drain::framing::DEFAULT_MAX_FRAME_BYTES;

/// Root configuration for the log-drain router.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct RouterConfig {
    /// Listener configuration (bind address, TLS).
    pub listener: ListenerConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Request hardening.
    pub security: SecurityConfig,

    /// Drain decoding and channel sizing.
    pub drain: DrainConfig,

    /// Source identification settings.
    pub correlation: CorrelationConfig,

    /// Where routed records go.
    pub sink: SinkConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Monitored database servers.
    pub servers: Vec<ServerConfig>,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Optional TLS configuration.
    pub tls: Option<TlsConfig>,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            tls: None,
        }
    }
}

/// TLS configuration for the listener.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TlsConfig {
    /// Path to certificate file (PEM).
    pub cert_path: String,

    /// Path to private key file (PEM).
    pub key_path: String,
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (whole drain delivery) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Security hardening configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Maximum body size in bytes.
    pub max_body_size: usize,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            max_body_size: 2 * 1024 * 1024, // 2MB
        }
    }
}

/// Drain decoding configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DrainConfig {
    /// Largest frame payload accepted, in bytes.
    pub max_frame_bytes: usize,

    /// Capacity of the decoder → correlator channel.
    pub message_queue_size: usize,

    /// Capacity of the correlator → sink channel.
    pub record_queue_size: usize,

    /// Which frames are worth correlating.
    pub filter: FilterConfig,
}

impl Default for DrainConfig {
    fn default() -> Self {
        Self {
            max_frame_bytes: DEFAULT_MAX_FRAME_BYTES,
            message_queue_size: 1000,
            record_queue_size: 1000,
            filter: FilterConfig::default(),
        }
    }
}

/// Frame filter. Empty lists match anything.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Accepted syslog APP-NAME values.
    pub app_names: Vec<String>,

    /// Accepted syslog PROCID prefixes.
    pub proc_id_prefixes: Vec<String>,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            app_names: Vec::new(),
            proc_id_prefixes: vec!["postgres".to_string(), "heroku-postgres".to_string()],
        }
    }
}

/// Correlation configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CorrelationConfig {
    /// Request path prefix stripped to get the source name.
    pub source_prefix: String,

    /// Token that starts an identification line.
    pub identify_marker: String,

    /// Postgres `log_line_prefix` handed to the log-line parser.
    pub log_line_prefix: String,

    /// Minimum seconds between "can't be matched" diagnostics per source.
    pub unmatched_log_interval_secs: u64,
}

impl Default for CorrelationConfig {
    fn default() -> Self {
        Self {
            source_prefix: "/logs/".to_string(),
            identify_marker: DEFAULT_IDENTIFY_MARKER.to_string(),
            log_line_prefix: String::new(),
            unmatched_log_interval_secs: 60,
        }
    }
}

/// Record sink selection.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SinkConfig {
    /// `stdout` (JSON lines) or `log` (tracing events).
    pub kind: String,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            kind: "stdout".to_string(),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Fallback filter directives when `RUST_LOG` is unset.
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "logdrain_router=info,tower_http=info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// A monitored database server.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct ServerConfig {
    /// Section name announced by identification lines.
    pub section_name: String,

    /// Routing identifier; defaults to the section name.
    pub identifier: Option<String>,

    /// Connection URL. User and database embedded here take precedence.
    pub db_url: Option<String>,

    pub db_username: Option<String>,

    pub db_name: Option<String>,
}

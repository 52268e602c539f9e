//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check referential integrity (unique section names and identifiers)
//! - Validate value ranges (sizes > 0, addresses parse)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: RouterConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::net::SocketAddr;

use url::Url;

use crate::config::schema::RouterConfig;

/// One failed semantic check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field, e.g. `servers[0].section_name`.
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Sink kinds the daemon knows how to build.
pub const SINK_KINDS: &[&str] = &["stdout", "log"];

fn is_section_name(name: &str) -> bool {
    name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Check `config` and collect every problem found.
pub fn validate_config(config: &RouterConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("'{}' is not a socket address", config.listener.bind_address),
        ));
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::new("timeouts.request_secs", "must be > 0"));
    }
    if config.security.max_body_size == 0 {
        errors.push(ValidationError::new("security.max_body_size", "must be > 0"));
    }

    let drain = &config.drain;
    for (field, value) in [
        ("drain.max_frame_bytes", drain.max_frame_bytes),
        ("drain.message_queue_size", drain.message_queue_size),
        ("drain.record_queue_size", drain.record_queue_size),
    ] {
        if value == 0 {
            errors.push(ValidationError::new(field, "must be > 0"));
        }
    }

    let correlation = &config.correlation;
    if !correlation.source_prefix.starts_with('/') {
        errors.push(ValidationError::new(
            "correlation.source_prefix",
            "must start with '/'",
        ));
    }
    let marker = &correlation.identify_marker;
    if marker.is_empty() || marker.contains(|c: char| c.is_whitespace() || c == ':') {
        errors.push(ValidationError::new(
            "correlation.identify_marker",
            "must be non-empty without whitespace or ':'",
        ));
    }
    if correlation.unmatched_log_interval_secs == 0 {
        errors.push(ValidationError::new(
            "correlation.unmatched_log_interval_secs",
            "must be > 0",
        ));
    }

    if !SINK_KINDS.contains(&config.sink.kind.as_str()) {
        errors.push(ValidationError::new(
            "sink.kind",
            format!("unknown sink '{}', expected one of {:?}", config.sink.kind, SINK_KINDS),
        ));
    }

    if config.observability.metrics_enabled
        && config
            .observability
            .metrics_address
            .parse::<SocketAddr>()
            .is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("'{}' is not a socket address", config.observability.metrics_address),
        ));
    }

    let mut sections = HashSet::new();
    let mut identifiers = HashSet::new();
    for (i, server) in config.servers.iter().enumerate() {
        let name = &server.section_name;
        if name.is_empty() {
            errors.push(ValidationError::new(
                format!("servers[{i}].section_name"),
                "must not be empty",
            ));
        } else if !is_section_name(name) {
            errors.push(ValidationError::new(
                format!("servers[{i}].section_name"),
                format!("'{name}' may only contain letters, digits and '_'"),
            ));
        } else if !sections.insert(name.as_str()) {
            errors.push(ValidationError::new(
                format!("servers[{i}].section_name"),
                format!("duplicate section name '{name}'"),
            ));
        }

        let identifier = server.identifier.as_deref().unwrap_or(name);
        if !identifier.is_empty() && !identifiers.insert(identifier) {
            errors.push(ValidationError::new(
                format!("servers[{i}].identifier"),
                format!("duplicate identifier '{identifier}'"),
            ));
        }

        if let Some(db_url) = &server.db_url {
            if let Err(e) = Url::parse(db_url) {
                errors.push(ValidationError::new(
                    format!("servers[{i}].db_url"),
                    format!("invalid URL: {e}"),
                ));
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServerConfig;

    fn server(section: &str) -> ServerConfig {
        ServerConfig {
            section_name: section.into(),
            ..Default::default()
        }
    }

    fn fields(config: &RouterConfig) -> Vec<String> {
        validate_config(config)
            .unwrap_err()
            .into_iter()
            .map(|e| e.field)
            .collect()
    }

    #[test]
    fn test_defaults_are_valid() {
        assert!(validate_config(&RouterConfig::default()).is_ok());
    }

    #[test]
    fn test_ranges_and_addresses() {
        let mut config = RouterConfig::default();
        config.listener.bind_address = "not-an-address".into();
        config.drain.message_queue_size = 0;
        config.correlation.source_prefix = "logs/".into();
        config.correlation.identify_marker = "bad marker".into();
        config.correlation.unmatched_log_interval_secs = 0;

        assert_eq!(fields(&config), vec![
            "listener.bind_address",
            "drain.message_queue_size",
            "correlation.source_prefix",
            "correlation.identify_marker",
            "correlation.unmatched_log_interval_secs",
        ]);
    }

    #[test]
    fn test_server_entries() {
        let mut config = RouterConfig::default();
        config.servers = vec![
            server("db1"),
            server("db1"),
            server("db-2"),
            ServerConfig {
                identifier: Some("db1".into()),
                ..server("db3")
            },
            ServerConfig {
                db_url: Some("::not a url".into()),
                ..server("db4")
            },
        ];

        assert_eq!(fields(&config), vec![
            "servers[1].section_name",
            "servers[1].identifier",
            "servers[2].section_name",
            "servers[3].identifier",
            "servers[4].db_url",
        ]);
    }

    #[test]
    fn test_metrics_address_checked_only_when_enabled() {
        let mut config = RouterConfig::default();
        config.observability.metrics_address = "nope".into();
        assert!(validate_config(&config).is_ok());

        config.observability.metrics_enabled = true;
        assert_eq!(fields(&config), vec!["observability.metrics_address"]);
    }

    #[test]
    fn test_display() {
        let err = ValidationError::new("sink.kind", "unknown");
        assert_eq!(err.to_string(), "sink.kind: unknown");
    }
}

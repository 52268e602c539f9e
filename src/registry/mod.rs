//! Monitored server registry.
//!
//! # Responsibilities
//! - Expose configured servers through the `MonitoredServer` capability set
//! - Look servers up by section name for identification lines
//!
//! # Design Decisions
//! - The correlator only sees `Arc<dyn MonitoredServer>`, never config structs
//! - Registry is built once at startup and shared read-only
//! - Lookup is a linear scan; deployments have tens of servers at most

use std::fmt;
use std::sync::Arc;

use url::Url;

use crate::config::ServerConfig;

/// What the correlator needs to know about a monitored database server.
pub trait MonitoredServer: Send + Sync + fmt::Debug {
    /// Configuration section name, announced by identification lines.
    fn section_name(&self) -> &str;

    /// Stable routing key for downstream consumers.
    fn identifier(&self) -> &str;

    fn db_username(&self) -> Option<&str>;

    fn db_name(&self) -> Option<&str>;
}

/// A server built from a `[[servers]]` config entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfiguredServer {
    section_name: String,
    identifier: String,
    db_username: Option<String>,
    db_name: Option<String>,
}

impl ConfiguredServer {
    /// Resolve credentials from the config entry.
    ///
    /// Values embedded in `db_url` win over the separate fields.
    pub fn from_config(config: &ServerConfig) -> Self {
        let url = config.db_url.as_deref().and_then(|u| Url::parse(u).ok());

        let url_username = url
            .as_ref()
            .map(|u| u.username())
            .filter(|name| !name.is_empty())
            .map(str::to_string);
        let url_db_name = url
            .as_ref()
            .map(|u| u.path().trim_start_matches('/'))
            .filter(|name| !name.is_empty())
            .map(str::to_string);

        Self {
            section_name: config.section_name.clone(),
            identifier: config
                .identifier
                .clone()
                .unwrap_or_else(|| config.section_name.clone()),
            db_username: url_username.or_else(|| config.db_username.clone()),
            db_name: url_db_name.or_else(|| config.db_name.clone()),
        }
    }
}

impl MonitoredServer for ConfiguredServer {
    fn section_name(&self) -> &str {
        &self.section_name
    }

    fn identifier(&self) -> &str {
        &self.identifier
    }

    fn db_username(&self) -> Option<&str> {
        self.db_username.as_deref()
    }

    fn db_name(&self) -> Option<&str> {
        self.db_name.as_deref()
    }
}

/// Ordered, read-only list of monitored servers.
#[derive(Debug, Default, Clone)]
pub struct ServerRegistry {
    servers: Vec<Arc<dyn MonitoredServer>>,
}

impl ServerRegistry {
    pub fn new(servers: Vec<Arc<dyn MonitoredServer>>) -> Self {
        Self { servers }
    }

    /// Build the registry from validated config entries.
    pub fn from_config(servers: &[ServerConfig]) -> Self {
        Self::new(
            servers
                .iter()
                .map(|s| Arc::new(ConfiguredServer::from_config(s)) as Arc<dyn MonitoredServer>)
                .collect(),
        )
    }

    /// First server whose section name equals `section_name`.
    pub fn find_by_section(&self, section_name: &str) -> Option<&Arc<dyn MonitoredServer>> {
        self.servers
            .iter()
            .find(|server| server.section_name() == section_name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn MonitoredServer>> {
        self.servers.iter()
    }

    pub fn len(&self) -> usize {
        self.servers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.servers.is_empty()
    }
}

//! Frame filtering.
//!
//! # Responsibilities
//! - Keep frames emitted by the database's log channel
//! - Keep identification lines whichever process emitted them
//! - Drop everything else the platform multiplexes onto the drain
//!
//! # Design Decisions
//! - Pure predicate over header fields and the message start
//! - Empty allow-lists match anything

use crate::config::FilterConfig;
use crate::drain::header::SyslogHeader;

/// Predicate selecting the frames worth correlating.
#[derive(Debug, Clone)]
pub struct FrameFilter {
    app_names: Vec<String>,
    proc_id_prefixes: Vec<String>,
    identify_marker: String,
}

impl FrameFilter {
    /// Build the filter from config. `identify_marker` lines always pass.
    pub fn new(config: &FilterConfig, identify_marker: impl Into<String>) -> Self {
        Self {
            app_names: config.app_names.clone(),
            proc_id_prefixes: config.proc_id_prefixes.clone(),
            identify_marker: identify_marker.into(),
        }
    }

    /// A filter that keeps every well-formed frame.
    pub fn accept_all() -> Self {
        Self {
            app_names: Vec::new(),
            proc_id_prefixes: Vec::new(),
            identify_marker: String::new(),
        }
    }

    /// Returns true if the frame belongs to the monitored log channel.
    pub fn matches(&self, header: &SyslogHeader<'_>, message: &str) -> bool {
        if !self.identify_marker.is_empty() && message.starts_with(self.identify_marker.as_str()) {
            return true;
        }

        let app_ok = self.app_names.is_empty()
            || self.app_names.iter().any(|name| name == header.app_name);
        let proc_ok = self.proc_id_prefixes.is_empty()
            || self
                .proc_id_prefixes
                .iter()
                .any(|prefix| header.proc_id.starts_with(prefix.as_str()));

        app_ok && proc_ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header<'a>(app_name: &'a str, proc_id: &'a str) -> SyslogHeader<'a> {
        SyslogHeader {
            priority: 134,
            version: 1,
            timestamp: "-",
            hostname: "host",
            app_name,
            proc_id,
            msg_id: "-",
        }
    }

    #[test]
    fn test_default_filter_keeps_postgres_only() {
        let filter = FrameFilter::new(&FilterConfig::default(), "pganalyze-collector-identify");

        assert!(filter.matches(&header("app", "postgres.1"), "LOG:  hello"));
        assert!(filter.matches(&header("app", "heroku-postgres"), "sample#load-avg-1m=0.01"));
        assert!(!filter.matches(&header("app", "web.1"), "GET / 200"));
        assert!(!filter.matches(&header("heroku", "router"), "at=info method=GET"));
    }

    #[test]
    fn test_identify_lines_always_pass() {
        let filter = FrameFilter::new(&FilterConfig::default(), "pganalyze-collector-identify");
        assert!(filter.matches(
            &header("app", "web.1"),
            "pganalyze-collector-identify: db1"
        ));
    }

    #[test]
    fn test_app_name_allow_list() {
        let config = FilterConfig {
            app_names: vec!["postgres".into()],
            proc_id_prefixes: vec![],
        };
        let filter = FrameFilter::new(&config, "marker");

        assert!(filter.matches(&header("postgres", "anything"), "x"));
        assert!(!filter.matches(&header("app", "postgres"), "x"));
    }

    #[test]
    fn test_accept_all() {
        let filter = FrameFilter::accept_all();
        assert!(filter.matches(&header("router", "web.9"), ""));
    }
}

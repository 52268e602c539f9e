//! Source identity resolution.
//!
//! Monitored software announces which config section it belongs to with a
//! sentinel line on its own log stream:
//! ```text
//! pganalyze-collector-identify: db1
//! ```
//! Seeing that line on source `S` binds `S` to the server whose section name
//! is `db1`.
//!
//! # Design Decisions
//! - Extraction is one pure function, no regex
//! - Bindings are only ever added or replaced, never removed
//! - A later identification naming another known section replaces the binding

use std::collections::HashMap;
use std::sync::Arc;

use crate::correlation::source::SourceName;
use crate::registry::{MonitoredServer, ServerRegistry};

/// Default identification marker token.
pub const DEFAULT_IDENTIFY_MARKER: &str = "pganalyze-collector-identify";

/// Extract the section name from a sentinel `line`.
///
/// The line must read `<marker>:` followed by whitespace and a section name
/// made of ASCII alphanumerics and `_`. Anything after the name is ignored.
pub fn extract_section_name<'a>(line: &'a str, marker: &str) -> Option<&'a str> {
    let rest = line.strip_prefix(marker)?.strip_prefix(':')?;
    let trimmed = rest.trim_start_matches([' ', '\t']);
    if trimmed.len() == rest.len() {
        return None;
    }

    let end = trimmed
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .unwrap_or(trimmed.len());
    let section = &trimmed[..end];
    (!section.is_empty()).then_some(section)
}

/// First sentinel in `content`, checked line by line.
pub fn find_sentinel<'a>(content: &'a str, marker: &str) -> Option<&'a str> {
    content
        .lines()
        .find_map(|line| extract_section_name(line, marker))
}

/// Source name → server bindings, owned by one correlator.
#[derive(Debug, Default)]
pub struct SourceBindings {
    map: HashMap<SourceName, Arc<dyn MonitoredServer>>,
}

impl SourceBindings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `source` to `server`, returning the previous binding.
    pub fn bind(
        &mut self,
        source: SourceName,
        server: Arc<dyn MonitoredServer>,
    ) -> Option<Arc<dyn MonitoredServer>> {
        self.map.insert(source, server)
    }

    pub fn get(&self, source: &str) -> Option<&Arc<dyn MonitoredServer>> {
        self.map.get(source)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

/// Outcome of running the resolver over one line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// No sentinel in the content.
    NoSentinel,
    /// Sentinel names a section that is not configured.
    UnknownSection(String),
    /// Source was unbound and is now bound.
    Bound { identifier: String },
    /// Source was already bound to the same server.
    Unchanged { identifier: String },
    /// Source moved from one server to another.
    Rebound { previous: String, identifier: String },
}

impl Resolution {
    /// True if the content was an identification line, matched or not.
    pub fn is_identification(&self) -> bool {
        !matches!(self, Resolution::NoSentinel)
    }
}

/// Scan `content` for a sentinel and update `bindings` for `source`.
pub fn resolve(
    source: &SourceName,
    content: &str,
    marker: &str,
    bindings: &mut SourceBindings,
    registry: &ServerRegistry,
) -> Resolution {
    let Some(section) = find_sentinel(content, marker) else {
        return Resolution::NoSentinel;
    };

    let Some(server) = registry.find_by_section(section) else {
        return Resolution::UnknownSection(section.to_string());
    };

    let identifier = server.identifier().to_string();
    match bindings.bind(source.clone(), Arc::clone(server)) {
        None => Resolution::Bound { identifier },
        Some(previous) if Arc::ptr_eq(&previous, server) => Resolution::Unchanged { identifier },
        Some(previous) => Resolution::Rebound {
            previous: previous.identifier().to_string(),
            identifier,
        },
    }
}

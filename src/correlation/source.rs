//! Source name derivation.

use std::borrow::Borrow;
use std::fmt;

/// Correlation key for one drain: the request path minus the routing prefix.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SourceName(String);

impl SourceName {
    /// Strip `prefix` from `source_path` if present.
    ///
    /// Returns `None` when nothing is left to identify the source.
    pub fn from_path(source_path: &str, prefix: &str) -> Option<Self> {
        let name = source_path.strip_prefix(prefix).unwrap_or(source_path);
        if name.is_empty() {
            None
        } else {
            Some(Self(name.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for SourceName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SourceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SourceName {
    fn from(name: &str) -> Self {
        Self(name.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_routing_prefix() {
        let name = SourceName::from_path("/logs/app-a", "/logs/").unwrap();
        assert_eq!(name.as_str(), "app-a");
    }

    #[test]
    fn test_path_without_prefix_is_kept() {
        let name = SourceName::from_path("/drain/app-a", "/logs/").unwrap();
        assert_eq!(name.as_str(), "/drain/app-a");
    }

    #[test]
    fn test_empty_name_is_none() {
        assert!(SourceName::from_path("/logs/", "/logs/").is_none());
        assert!(SourceName::from_path("", "/logs/").is_none());
    }
}

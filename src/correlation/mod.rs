//! Stream correlation subsystem.
//!
//! # Data Flow
//! ```text
//! RawMessage { content, source_path }
//!     → source.rs (source path → SourceName)
//!     → LogLineParser (content → LogLine)
//!     → identity.rs (identification line? update bindings)
//!     → worker.rs (bound? annotate and forward : drop)
//!     → RoutedRecord { identifier, log_line }
//! ```
//!
//! # Design Decisions
//! - A single worker owns all correlation state
//! - Servers are matched through the `MonitoredServer` trait only
//! - Unmatched diagnostics are rate limited per source

pub mod diagnostics;
pub mod identity;
pub mod source;
pub mod worker;

pub use diagnostics::DiagnosticLimiter;
pub use identity::{Resolution, SourceBindings, DEFAULT_IDENTIFY_MARKER};
pub use source::SourceName;
pub use worker::StreamCorrelator;

use serde::Serialize;

use crate::logline::LogLine;

/// A log line attributed to a monitored server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoutedRecord {
    /// Identifier of the server the line belongs to.
    pub identifier: String,
    pub log_line: LogLine,
}

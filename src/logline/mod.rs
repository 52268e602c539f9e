//! Structured log lines and the parser seam.
//!
//! # Responsibilities
//! - Define `LogLine`, the unit handed to downstream consumers
//! - Define the `LogLineParser` trait the correlator depends on
//! - Provide `PostgresLogParser` for Postgres text logs
//!
//! # Design Decisions
//! - Parsers are pure: text in, `LogLine` or `ParseError` out
//! - Username/database are never parsed from text; the correlator fills
//!   them from the identified server

use serde::Serialize;

/// Postgres message severity, plus the continuation kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Debug,
    Info,
    Notice,
    Warning,
    Error,
    Log,
    Fatal,
    Panic,
    Detail,
    Hint,
    Context,
    Statement,
    Query,
    Location,
    Unknown,
}

impl LogLevel {
    /// Map a severity token as printed by Postgres (`DEBUG1`..`DEBUG5` fold to `Debug`).
    pub fn from_token(token: &str) -> Option<Self> {
        let level = match token {
            "DEBUG" | "DEBUG1" | "DEBUG2" | "DEBUG3" | "DEBUG4" | "DEBUG5" => Self::Debug,
            "INFO" => Self::Info,
            "NOTICE" => Self::Notice,
            "WARNING" => Self::Warning,
            "ERROR" => Self::Error,
            "LOG" => Self::Log,
            "FATAL" => Self::Fatal,
            "PANIC" => Self::Panic,
            "DETAIL" => Self::Detail,
            "HINT" => Self::Hint,
            "CONTEXT" => Self::Context,
            "STATEMENT" => Self::Statement,
            "QUERY" => Self::Query,
            "LOCATION" => Self::Location,
            _ => return None,
        };
        Some(level)
    }
}

/// A parsed log line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogLine {
    pub level: LogLevel,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
}

/// Why a piece of text did not yield a log line.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("empty log line")]
    Empty,

    #[error("line does not start with prefix {0:?}")]
    PrefixMismatch(String),
}

/// Turns raw text into a `LogLine`.
pub trait LogLineParser: Send {
    fn parse(&self, prefix: &str, content: &str) -> Result<LogLine, ParseError>;
}

/// Parser for Postgres stderr-style lines (`... LOG:  message`).
#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresLogParser;

impl LogLineParser for PostgresLogParser {
    fn parse(&self, prefix: &str, content: &str) -> Result<LogLine, ParseError> {
        let line = content.trim_end_matches(['\r', '\n']);
        if line.trim().is_empty() {
            return Err(ParseError::Empty);
        }

        let line = if prefix.is_empty() {
            line
        } else {
            line.strip_prefix(prefix)
                .ok_or_else(|| ParseError::PrefixMismatch(prefix.to_string()))?
        };

        let (level, message) = match find_severity(line) {
            Some((level, rest)) => (level, rest.trim_start()),
            None => (LogLevel::Unknown, line.trim()),
        };

        Ok(LogLine {
            level,
            content: message.to_string(),
            username: None,
            database: None,
        })
    }
}

/// Find the first `LEVEL:` marker followed by whitespace; returns the level
/// and the text after the colon.
fn find_severity(line: &str) -> Option<(LogLevel, &str)> {
    let mut search_from = 0;
    while let Some(offset) = line[search_from..].find(':') {
        let colon = search_from + offset;
        let rest = &line[colon + 1..];
        search_from = colon + 1;

        if !rest.starts_with([' ', '\t']) {
            continue;
        }
        // byte scan: a non-ASCII char ends in a byte >= 0x80, so `i + 1`
        // is always a char boundary
        let token_start = line.as_bytes()[..colon]
            .iter()
            .rposition(|b| !b.is_ascii_alphanumeric())
            .map_or(0, |i| i + 1);
        if let Some(level) = LogLevel::from_token(&line[token_start..colon]) {
            return Some((level, rest));
        }
    }
    None
}

//! Routed record sinks.
//!
//! # Data Flow
//! ```text
//! correlator ──mpsc<RoutedRecord>──▶ run_sink ──▶ RecordSink
//!                                                ├─ JsonLinesSink (stdout)
//!                                                └─ TracingSink (log)
//! ```
//!
//! # Design Decisions
//! - The sink task drains until every sender is gone, so nothing already
//!   routed is lost on shutdown
//! - A write error stops the sink; the correlator then sees a closed channel
//! - Sinks do blocking I/O, so the drain loop runs on the blocking pool

use std::io::{self, Write};

use tokio::sync::mpsc;

use crate::correlation::RoutedRecord;

/// Error type for sink writes.
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("sink write failed: {0}")]
    Io(#[from] io::Error),

    #[error("record encoding failed: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("unknown sink kind '{0}'")]
    UnknownKind(String),

    #[error("sink task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Destination for routed records.
pub trait RecordSink: Send {
    fn write(&mut self, record: &RoutedRecord) -> Result<(), SinkError>;

    fn flush(&mut self) -> Result<(), SinkError> {
        Ok(())
    }
}

impl RecordSink for Box<dyn RecordSink> {
    fn write(&mut self, record: &RoutedRecord) -> Result<(), SinkError> {
        (**self).write(record)
    }

    fn flush(&mut self) -> Result<(), SinkError> {
        (**self).flush()
    }
}

/// Writes one JSON object per record, newline separated.
#[derive(Debug)]
pub struct JsonLinesSink<W> {
    writer: W,
}

impl<W: Write + Send> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write + Send> RecordSink for JsonLinesSink<W> {
    fn write(&mut self, record: &RoutedRecord) -> Result<(), SinkError> {
        serde_json::to_writer(&mut self.writer, record)?;
        self.writer.write_all(b"\n")?;
        Ok(())
    }

    fn flush(&mut self) -> Result<(), SinkError> {
        self.writer.flush()?;
        Ok(())
    }
}

/// Emits one `tracing` event per record.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl RecordSink for TracingSink {
    fn write(&mut self, record: &RoutedRecord) -> Result<(), SinkError> {
        let line = &record.log_line;
        tracing::info!(
            identifier = %record.identifier,
            level = ?line.level,
            username = line.username.as_deref(),
            database = line.database.as_deref(),
            "{}",
            line.content
        );
        Ok(())
    }
}

/// Build the sink named by `sink.kind`.
pub fn build_sink(kind: &str) -> Result<Box<dyn RecordSink>, SinkError> {
    match kind {
        "stdout" => Ok(Box::new(JsonLinesSink::new(io::stdout()))),
        "log" => Ok(Box::new(TracingSink)),
        other => Err(SinkError::UnknownKind(other.to_string())),
    }
}

/// Drain `rx` into `sink` on the blocking pool until all senders are dropped.
///
/// Returns the number of records written.
pub async fn run_sink<S: RecordSink + 'static>(
    mut sink: S,
    rx: mpsc::Receiver<RoutedRecord>,
) -> Result<u64, SinkError> {
    tokio::task::spawn_blocking(move || drain_blocking(&mut sink, rx)).await?
}

/// Blocking drain loop. Must not be called from an async context.
pub fn drain_blocking<S: RecordSink>(
    sink: &mut S,
    mut rx: mpsc::Receiver<RoutedRecord>,
) -> Result<u64, SinkError> {
    let mut written = 0u64;

    while let Some(record) = rx.blocking_recv() {
        sink.write(&record)?;
        written += 1;

        // flush once the burst is over
        if rx.is_empty() {
            sink.flush()?;
        }
    }

    sink.flush()?;
    tracing::info!(records = written, "Record sink drained");
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logline::{LogLevel, LogLine};
    use tracing_test::traced_test;

    fn record(identifier: &str, content: &str) -> RoutedRecord {
        RoutedRecord {
            identifier: identifier.into(),
            log_line: LogLine {
                level: LogLevel::Error,
                content: content.into(),
                username: Some("app_user".into()),
                database: None,
            },
        }
    }

    #[test]
    fn test_json_lines_format() {
        let mut sink = JsonLinesSink::new(Vec::new());
        sink.write(&record("srv-1", "first")).unwrap();
        sink.write(&record("srv-2", "second")).unwrap();

        let out = String::from_utf8(sink.into_inner()).unwrap();
        let lines: Vec<serde_json::Value> = out
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();

        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["identifier"], "srv-1");
        assert_eq!(lines[0]["log_line"]["level"], "ERROR");
        assert_eq!(lines[0]["log_line"]["username"], "app_user");
        assert!(lines[0]["log_line"].get("database").is_none());
        assert_eq!(lines[1]["log_line"]["content"], "second");
    }

    #[test]
    fn test_drain_blocking_after_senders_drop() {
        let (tx, rx) = mpsc::channel(8);
        for i in 0..5 {
            tx.try_send(record("srv-1", &i.to_string())).unwrap();
        }
        drop(tx);

        let mut sink = JsonLinesSink::new(Vec::new());
        let written = drain_blocking(&mut sink, rx).unwrap();

        assert_eq!(written, 5);
        assert_eq!(sink.into_inner().iter().filter(|b| **b == b'\n').count(), 5);
    }

    #[tokio::test]
    async fn test_run_sink_keeps_runtime_free() {
        let (tx, rx) = mpsc::channel(8);
        let sink_task = tokio::spawn(run_sink(JsonLinesSink::new(Vec::new()), rx));

        for i in 0..3 {
            tx.send(record("srv-1", &i.to_string())).await.unwrap();
        }
        drop(tx);

        assert_eq!(sink_task.await.unwrap().unwrap(), 3);
    }

    #[test]
    #[traced_test]
    fn test_tracing_sink_emits_event() {
        TracingSink.write(&record("srv-9", "disk full")).unwrap();
        assert!(logs_contain("srv-9"));
        assert!(logs_contain("disk full"));
    }

    #[test]
    fn test_build_sink() {
        assert!(build_sink("stdout").is_ok());
        assert!(build_sink("log").is_ok());
        assert!(matches!(build_sink("kafka"), Err(SinkError::UnknownKind(_))));
    }
}

//! The stream correlator worker.
//!
//! # Responsibilities
//! - Parse each raw message into a log line
//! - Learn source → server bindings from identification lines
//! - Annotate and forward lines of bound sources, drop the rest
//!
//! # State machine (per source name)
//! ```text
//! Unidentified ──identification line──▶ Identified(server)
//! Identified(a) ──identification line──▶ Identified(b)   (last wins)
//! ```
//! There is no way back to Unidentified.
//!
//! # Design Decisions
//! - Exactly one worker owns the binding table; nothing is locked
//! - Identification lines are control lines and are never forwarded
//! - Output backpressure blocks the worker; only unmatched lines are dropped
//! - Shutdown is polled first at every await point

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc};

use crate::config::CorrelationConfig;
use crate::correlation::diagnostics::DiagnosticLimiter;
use crate::correlation::identity::{resolve, Resolution, SourceBindings};
use crate::correlation::source::SourceName;
use crate::correlation::RoutedRecord;
use crate::drain::RawMessage;
use crate::logline::LogLineParser;
use crate::observability::metrics;
use crate::registry::ServerRegistry;

/// Correlates raw drain messages with monitored servers.
pub struct StreamCorrelator<P> {
    registry: Arc<ServerRegistry>,
    parser: P,
    config: CorrelationConfig,
    bindings: SourceBindings,
    unmatched: DiagnosticLimiter,
}

impl<P: LogLineParser> StreamCorrelator<P> {
    /// Create a correlator with an empty binding table.
    pub fn new(registry: Arc<ServerRegistry>, parser: P, config: CorrelationConfig) -> Self {
        let unmatched =
            DiagnosticLimiter::new(Duration::from_secs(config.unmatched_log_interval_secs));
        Self {
            registry,
            parser,
            config,
            bindings: SourceBindings::new(),
            unmatched,
        }
    }

    /// Current binding table.
    pub fn bindings(&self) -> &SourceBindings {
        &self.bindings
    }

    /// Process one message; returns the record to forward, if any.
    pub fn handle(&mut self, message: RawMessage) -> Option<RoutedRecord> {
        let Some(source) = SourceName::from_path(&message.source_path, &self.config.source_prefix)
        else {
            tracing::debug!(path = %message.source_path, "Message without source name");
            metrics::record_message_dropped("no_source");
            return None;
        };

        let text = String::from_utf8_lossy(&message.content);
        let mut line = match self.parser.parse(&self.config.log_line_prefix, &text) {
            Ok(line) => line,
            Err(e) => {
                tracing::trace!(source = %source, error = %e, "Skipping unparsable message");
                metrics::record_message_dropped("unparsable");
                return None;
            }
        };

        let resolution = resolve(
            &source,
            &line.content,
            &self.config.identify_marker,
            &mut self.bindings,
            &self.registry,
        );
        if resolution.is_identification() {
            if matches!(resolution, Resolution::Bound { .. }) {
                self.unmatched.forget(source.as_str());
            }
            log_identification(&source, &resolution);
            return None;
        }

        let Some(server) = self.bindings.get(source.as_str()) else {
            metrics::record_message_dropped("unmatched");
            if let Some(suppressed) = self.unmatched.check(source.as_str()) {
                tracing::info!(
                    source = %source,
                    suppressed,
                    "Ignoring log line since server can't be matched yet - if this keeps showing up you have a configuration error"
                );
            }
            return None;
        };

        line.username = server.db_username().map(str::to_string);
        line.database = server.db_name().map(str::to_string);
        metrics::record_record_routed();

        Some(RoutedRecord {
            identifier: server.identifier().to_string(),
            log_line: line,
        })
    }

    /// Run until the input closes, the output closes, or shutdown fires.
    pub async fn run(
        mut self,
        mut input: mpsc::Receiver<RawMessage>,
        output: mpsc::Sender<RoutedRecord>,
        mut shutdown: broadcast::Receiver<()>,
    ) {
        tracing::info!(servers = self.registry.len(), "Stream correlator starting");

        loop {
            let message = tokio::select! {
                biased;
                _ = shutdown.recv() => {
                    tracing::info!("Stream correlator received shutdown signal");
                    break;
                }
                message = input.recv() => match message {
                    Some(message) => message,
                    None => {
                        tracing::info!("Message channel closed");
                        break;
                    }
                },
            };

            let Some(record) = self.handle(message) else {
                continue;
            };

            tokio::select! {
                biased;
                _ = shutdown.recv() => {
                    tracing::info!("Stream correlator received shutdown signal while blocked on output");
                    break;
                }
                sent = output.send(record) => {
                    if sent.is_err() {
                        tracing::warn!("Record channel closed, stopping correlator");
                        break;
                    }
                }
            }
        }

        tracing::info!(
            bound_sources = self.bindings.len(),
            "Stream correlator stopped"
        );
    }
}

fn log_identification(source: &SourceName, resolution: &Resolution) {
    match resolution {
        Resolution::NoSentinel => {}
        Resolution::UnknownSection(section) => {
            metrics::record_identification("unknown_section");
            tracing::warn!(
                source = %source,
                section = %section,
                "Identification line names a section that is not configured"
            );
        }
        Resolution::Bound { identifier } => {
            metrics::record_identification("bound");
            tracing::info!(source = %source, identifier = %identifier, "Source identified");
        }
        Resolution::Unchanged { .. } => {
            metrics::record_identification("unchanged");
        }
        Resolution::Rebound {
            previous,
            identifier,
        } => {
            metrics::record_identification("rebound");
            tracing::info!(
                source = %source,
                previous = %previous,
                identifier = %identifier,
                "Source re-identified as a different server"
            );
        }
    }
}

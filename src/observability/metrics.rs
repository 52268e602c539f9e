//! Metrics collection and exposition.
//!
//! # Metrics
//! - `drain_requests_total` (counter): drain deliveries by response status
//! - `drain_frames_decoded_total` (counter): frames read off request bodies
//! - `drain_frames_filtered_total` (counter): frames dropped by the frame filter
//! - `drain_framing_errors_total` (counter): bodies aborted on a framing error
//! - `drain_identifications_total` (counter): identification lines by outcome
//! - `drain_records_routed_total` (counter): records handed to the sink
//! - `drain_messages_dropped_total` (counter): messages dropped by reason
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade; with no recorder installed
//!   every call is a no-op
//! - The Prometheus exporter serves its own HTTP listener

use std::net::SocketAddr;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and its scrape endpoint on `addr`.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn record_request(status: u16) {
    metrics::counter!("drain_requests_total", "status" => status.to_string()).increment(1);
}

pub fn record_frame_decoded() {
    metrics::counter!("drain_frames_decoded_total").increment(1);
}

pub fn record_frame_filtered() {
    metrics::counter!("drain_frames_filtered_total").increment(1);
}

pub fn record_framing_error() {
    metrics::counter!("drain_framing_errors_total").increment(1);
}

/// `outcome` is one of `bound`, `unchanged`, `rebound`, `unknown_section`.
pub fn record_identification(outcome: &'static str) {
    metrics::counter!("drain_identifications_total", "outcome" => outcome).increment(1);
}

pub fn record_record_routed() {
    metrics::counter!("drain_records_routed_total").increment(1);
}

/// `reason` is one of `no_source`, `unparsable`, `unmatched`.
pub fn record_message_dropped(reason: &'static str) {
    metrics::counter!("drain_messages_dropped_total", "reason" => reason).increment(1);
}

//! Log-drain decoding subsystem.
//!
//! # Data Flow
//! ```text
//! HTTP request body (AsyncRead)
//!     → framing.rs (octet counting: "<len> <payload>")
//!     → header.rs (split syslog header from message)
//!     → filter.rs (keep database log channel + identification lines)
//!     → RawMessage { content, source_path }
//!     → correlator input channel
//! ```
//!
//! # Design Decisions
//! - One `MessageDecoder` per request body; it is lazy and forward-only
//! - A framing error ends the request; filtered frames do not
//! - Payload bytes are shared (`Bytes`), never copied into messages

pub mod filter;
pub mod framing;
pub mod header;

pub use filter::FrameFilter;
pub use framing::{encode_frame, FrameDecoder, FramingError};
pub use header::SyslogHeader;

use bytes::Bytes;
use tokio::io::AsyncRead;

use crate::observability::metrics;

/// One decoded log message, tagged with the request path it arrived on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawMessage {
    /// The syslog MSG part of the frame.
    pub content: Bytes,
    /// Request path of the drain delivery, e.g. `/logs/my-app`.
    pub source_path: String,
}

/// Counters for one decoded body.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecodeStats {
    pub frames: u64,
    pub filtered: u64,
}

/// Turns one drain body into the `RawMessage`s worth correlating.
pub struct MessageDecoder<R> {
    frames: FrameDecoder<R>,
    filter: FrameFilter,
    source_path: String,
    stats: DecodeStats,
}

impl<R: AsyncRead + Unpin> MessageDecoder<R> {
    pub fn new(
        reader: R,
        source_path: impl Into<String>,
        filter: FrameFilter,
        max_frame_bytes: usize,
    ) -> Self {
        Self {
            frames: FrameDecoder::new(reader, max_frame_bytes),
            filter,
            source_path: source_path.into(),
            stats: DecodeStats::default(),
        }
    }

    /// Next kept message, `Ok(None)` at the clean end of the body.
    pub async fn next_message(&mut self) -> Result<Option<RawMessage>, FramingError> {
        loop {
            let payload = match self.frames.next_frame().await {
                Ok(Some(payload)) => payload,
                Ok(None) => return Ok(None),
                Err(e) => {
                    metrics::record_framing_error();
                    return Err(e);
                }
            };
            self.stats.frames += 1;
            metrics::record_frame_decoded();

            match self.keep(&payload) {
                Some(content) => {
                    return Ok(Some(RawMessage {
                        content,
                        source_path: self.source_path.clone(),
                    }));
                }
                None => {
                    self.stats.filtered += 1;
                    metrics::record_frame_filtered();
                }
            }
        }
    }

    /// Frame and filter counts so far.
    pub fn stats(&self) -> DecodeStats {
        self.stats
    }

    /// The message part of `payload`, if the frame is kept.
    fn keep(&self, payload: &Bytes) -> Option<Bytes> {
        let (header, message) = SyslogHeader::parse(payload)?;
        if !self.filter.matches(&header, message) {
            tracing::trace!(
                app_name = header.app_name,
                proc_id = header.proc_id,
                "Frame filtered"
            );
            return None;
        }
        Some(payload.slice_ref(message.as_bytes()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FilterConfig;

    fn body(lines: &[&str]) -> Vec<u8> {
        let mut out = Vec::new();
        for line in lines {
            encode_frame(line.as_bytes(), &mut out);
        }
        out
    }

    #[tokio::test]
    async fn test_filters_and_tags_messages() {
        let data = body(&[
            "<134>1 - host app postgres.1 - LOG:  first\n",
            "<134>1 - host heroku router - at=info path=/",
            "not a syslog line",
            "<134>1 - host app web.1 - pganalyze-collector-identify: db1",
            "<134>1 - host app postgres.1 - LOG:  second",
        ]);
        let filter = FrameFilter::new(&FilterConfig::default(), "pganalyze-collector-identify");
        let mut decoder = MessageDecoder::new(&data[..], "/logs/app-a", filter, 1024);

        let mut contents = Vec::new();
        while let Some(msg) = decoder.next_message().await.unwrap() {
            assert_eq!(msg.source_path, "/logs/app-a");
            contents.push(String::from_utf8(msg.content.to_vec()).unwrap());
        }

        assert_eq!(contents, vec![
            "LOG:  first",
            "pganalyze-collector-identify: db1",
            "LOG:  second",
        ]);
        assert_eq!(decoder.stats(), DecodeStats { frames: 5, filtered: 2 });
    }

    #[tokio::test]
    async fn test_framing_error_yields_no_partial_message() {
        let mut data = body(&["<134>1 - host app postgres - LOG:  ok"]);
        data.extend_from_slice(b"40 <134>1 - host app postgres - LOG:  cut");

        let mut decoder =
            MessageDecoder::new(&data[..], "/logs/x", FrameFilter::accept_all(), 1024);

        assert!(decoder.next_message().await.unwrap().is_some());
        assert!(matches!(
            decoder.next_message().await,
            Err(FramingError::Truncated { .. })
        ));
        assert!(decoder.next_message().await.unwrap().is_none());
    }
}

//! Octet-counting frame codec (RFC 6587 section 3.4.1).
//!
//! # Frame format
//! ```text
//! MSG-LEN SP PAYLOAD
//! MSG-LEN = 1*9DIGIT   (decimal byte length of PAYLOAD)
//! ```
//! This is looser than RFC 6587, which asks for a nonzero leading digit:
//! leading zeros are accepted and `0 ` is an empty frame.
//!
//! # Design Decisions
//! - The length prefix is read one byte at a time from a buffered reader, so
//!   a prefix split across body chunks decodes the same as a whole one
//! - The payload is read with `read_exact`; frame boundaries never have to
//!   line up with chunk boundaries
//! - No resynchronization: after a bad prefix the rest of the stream is
//!   untrustworthy, so the decoder stops for good

use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncReadExt, BufReader};

/// Byte separating the length prefix from the payload.
pub const SEPARATOR: u8 = b' ';

/// Longest accepted length prefix, in digits.
const MAX_LENGTH_DIGITS: usize = 9;

/// Default upper bound for a single frame payload (64 KiB).
pub const DEFAULT_MAX_FRAME_BYTES: usize = 64 * 1024;

/// Errors that end the decoding of a stream.
#[derive(Debug, thiserror::Error)]
pub enum FramingError {
    /// The separator showed up where the first length digit was expected.
    #[error("missing frame length prefix")]
    MissingLength,

    /// A byte that is neither a digit nor the separator inside the prefix.
    #[error("invalid byte 0x{0:02x} in frame length prefix")]
    InvalidLengthByte(u8),

    /// The length prefix has more digits than any sane frame needs.
    #[error("frame length prefix longer than 9 digits")]
    LengthOverflow,

    /// The declared payload length is above the configured limit.
    #[error("frame length {len} exceeds limit {limit}")]
    FrameTooLarge { len: usize, limit: usize },

    /// The stream ended inside a frame.
    #[error("stream ended inside {expected}")]
    Truncated { expected: &'static str },

    /// The underlying body could not be read.
    #[error("I/O error while reading frames: {0}")]
    Io(#[from] std::io::Error),
}

/// Incremental decoder over one byte stream.
///
/// Forward-only: once it has returned `None` or an error it stays exhausted.
pub struct FrameDecoder<R> {
    reader: BufReader<R>,
    max_frame_bytes: usize,
    frames_read: u64,
    finished: bool,
}

impl<R: AsyncRead + Unpin> FrameDecoder<R> {
    /// Create a decoder that rejects frames longer than `max_frame_bytes`.
    pub fn new(reader: R, max_frame_bytes: usize) -> Self {
        Self {
            reader: BufReader::new(reader),
            max_frame_bytes,
            frames_read: 0,
            finished: false,
        }
    }

    /// Read the next frame payload.
    ///
    /// Returns `Ok(None)` when the stream ends cleanly on a frame boundary.
    pub async fn next_frame(&mut self) -> Result<Option<Bytes>, FramingError> {
        if self.finished {
            return Ok(None);
        }

        match self.read_frame().await {
            Ok(Some(payload)) => {
                self.frames_read += 1;
                Ok(Some(payload))
            }
            other => {
                self.finished = true;
                other
            }
        }
    }

    /// Number of complete frames returned so far.
    pub fn frames_read(&self) -> u64 {
        self.frames_read
    }

    async fn read_frame(&mut self) -> Result<Option<Bytes>, FramingError> {
        let len = match self.read_length().await? {
            Some(len) => len,
            None => return Ok(None),
        };

        if len > self.max_frame_bytes {
            return Err(FramingError::FrameTooLarge {
                len,
                limit: self.max_frame_bytes,
            });
        }

        let mut payload = vec![0u8; len];
        self.reader
            .read_exact(&mut payload)
            .await
            .map_err(|e| eof_as_truncated(e, "frame payload"))?;

        Ok(Some(Bytes::from(payload)))
    }

    async fn read_length(&mut self) -> Result<Option<usize>, FramingError> {
        let mut len = 0usize;
        let mut digits = 0usize;

        loop {
            let byte = match self.reader.read_u8().await {
                Ok(byte) => byte,
                // EOF before the first digit is the clean end of the stream
                Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof && digits == 0 => {
                    return Ok(None);
                }
                Err(e) => return Err(eof_as_truncated(e, "frame length prefix")),
            };

            match byte {
                b'0'..=b'9' => {
                    if digits == MAX_LENGTH_DIGITS {
                        return Err(FramingError::LengthOverflow);
                    }
                    len = len * 10 + usize::from(byte - b'0');
                    digits += 1;
                }
                SEPARATOR if digits > 0 => return Ok(Some(len)),
                SEPARATOR => return Err(FramingError::MissingLength),
                other => return Err(FramingError::InvalidLengthByte(other)),
            }
        }
    }
}

fn eof_as_truncated(e: std::io::Error, expected: &'static str) -> FramingError {
    if e.kind() == std::io::ErrorKind::UnexpectedEof {
        FramingError::Truncated { expected }
    } else {
        FramingError::Io(e)
    }
}

/// Append one octet-counted frame holding `payload` to `out`.
pub fn encode_frame(payload: &[u8], out: &mut Vec<u8>) {
    out.extend_from_slice(payload.len().to_string().as_bytes());
    out.push(SEPARATOR);
    out.extend_from_slice(payload);
}

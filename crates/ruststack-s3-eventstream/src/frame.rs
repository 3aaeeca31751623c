//! Event-stream frame codec and incremental frame reader.
//!
//! Wire layout of one frame (all integers big-endian):
//!
//! ```text
//! +--------------+----------------+-------------+--------------+---------+-------------+
//! | total_length | headers_length | prelude_crc | header block | payload | message_crc |
//! |   4 bytes    |    4 bytes     |   4 bytes   |   variable   | variable|   4 bytes   |
//! +--------------+----------------+-------------+--------------+---------+-------------+
//! ```
//!
//! `prelude_crc` is the CRC32 of the first 8 bytes. `message_crc` is the CRC32
//! of every byte before it. `total_length` counts the whole frame including
//! both checksums, so the payload length is `total_length - headers_length - 16`.
//!
//! Prelude validation order is fixed: prelude checksum, then the minimum total
//! length, then header block containment, and only then the configured size
//! limits. A bit flip inside the prelude is therefore always reported as a
//! corrupt frame rather than as an oversize frame.

use std::io;
use std::time::Duration;

use bytes::{Buf, BufMut, Bytes, BytesMut};
use tracing::trace;

use crate::config::{DEFAULT_MAX_FRAME_SIZE, DEFAULT_MAX_HEADER_BLOCK_SIZE, EventStreamConfig};
use crate::error::{ChecksumKind, EventStreamError, EventStreamResult, FrameCorruption};
use crate::header::{Headers, decode_headers};
use crate::source::ByteSource;

/// Length of the prelude including its checksum.
pub const PRELUDE_LEN: usize = 12;

/// Length of the trailing message checksum.
pub const MESSAGE_CRC_LEN: usize = 4;

/// Smallest possible frame: a prelude and a message checksum.
pub const MIN_FRAME_LEN: usize = PRELUDE_LEN + MESSAGE_CRC_LEN;

// ---------------------------------------------------------------------------
// Limits and prelude
// ---------------------------------------------------------------------------

/// Size limits applied to a validated prelude.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameLimits {
    /// Largest accepted total length.
    pub max_frame_size: usize,
    /// Largest accepted header block length.
    pub max_header_block_size: usize,
}

impl Default for FrameLimits {
    fn default() -> Self {
        Self {
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
            max_header_block_size: DEFAULT_MAX_HEADER_BLOCK_SIZE,
        }
    }
}

impl FrameLimits {
    /// Check a prelude against these limits.
    ///
    /// # Errors
    ///
    /// Returns [`EventStreamError::FrameTooLarge`] if either length exceeds its limit.
    pub fn check(&self, prelude: &Prelude) -> EventStreamResult<()> {
        if prelude.total_len() > self.max_frame_size {
            return Err(EventStreamError::FrameTooLarge {
                what: "frame",
                length: prelude.total_len(),
                limit: self.max_frame_size,
            });
        }
        if prelude.headers_len() > self.max_header_block_size {
            return Err(EventStreamError::FrameTooLarge {
                what: "header block",
                length: prelude.headers_len(),
                limit: self.max_header_block_size,
            });
        }
        Ok(())
    }
}

/// The fixed 12-byte frame prelude.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Prelude {
    /// Declared length of the whole frame.
    pub total_length: u32,
    /// Declared length of the header block.
    pub headers_length: u32,
    /// Stored CRC32 of the first 8 bytes.
    pub crc: u32,
}

impl Prelude {
    /// Parse and validate the first [`PRELUDE_LEN`] bytes of `bytes`.
    ///
    /// # Errors
    ///
    /// Returns [`EventStreamError::IncompleteFrame`] if fewer than 12 bytes are
    /// given, and [`EventStreamError::CorruptFrame`] if the prelude checksum
    /// fails or the declared lengths are inconsistent.
    pub fn parse(bytes: &[u8]) -> EventStreamResult<Self> {
        if bytes.len() < PRELUDE_LEN {
            return Err(EventStreamError::IncompleteFrame {
                expected: PRELUDE_LEN,
                received: bytes.len(),
            });
        }

        let mut buf = &bytes[..PRELUDE_LEN];
        let total_length = buf.get_u32();
        let headers_length = buf.get_u32();
        let crc = buf.get_u32();

        let computed = crc32fast::hash(&bytes[..8]);
        if computed != crc {
            return Err(FrameCorruption::Checksum {
                kind: ChecksumKind::Prelude,
                expected: crc,
                computed,
            }
            .into());
        }

        let prelude = Self {
            total_length,
            headers_length,
            crc,
        };
        if prelude.total_len() < MIN_FRAME_LEN {
            return Err(FrameCorruption::TotalLengthTooSmall { total_length }.into());
        }
        if prelude.headers_len() > prelude.total_len() - MIN_FRAME_LEN {
            return Err(FrameCorruption::HeadersOverflow {
                headers_length,
                total_length,
            }
            .into());
        }
        Ok(prelude)
    }

    /// Declared total length as `usize`.
    #[must_use]
    pub fn total_len(&self) -> usize {
        self.total_length as usize
    }

    /// Declared header block length as `usize`.
    #[must_use]
    pub fn headers_len(&self) -> usize {
        self.headers_length as usize
    }

    /// Payload length implied by the prelude.
    #[must_use]
    pub fn payload_len(&self) -> usize {
        self.total_len() - self.headers_len() - MIN_FRAME_LEN
    }
}

// ---------------------------------------------------------------------------
// Frame
// ---------------------------------------------------------------------------

/// One validated frame. The header block is kept raw until dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// The validated prelude.
    pub prelude: Prelude,
    /// The raw header block.
    pub headers: Bytes,
    /// The opaque payload.
    pub payload: Bytes,
    /// Stored CRC32 of the frame up to the checksum itself.
    pub message_crc: u32,
}

impl Frame {
    /// Build a frame from its complete wire bytes and an already validated prelude.
    fn from_wire(prelude: Prelude, wire: Bytes) -> EventStreamResult<Self> {
        let crc_offset = prelude.total_len() - MESSAGE_CRC_LEN;
        let message_crc = (&wire[crc_offset..]).get_u32();
        let computed = crc32fast::hash(&wire[..crc_offset]);
        if computed != message_crc {
            return Err(FrameCorruption::Checksum {
                kind: ChecksumKind::Message,
                expected: message_crc,
                computed,
            }
            .into());
        }

        let headers_end = PRELUDE_LEN + prelude.headers_len();
        Ok(Self {
            prelude,
            headers: wire.slice(PRELUDE_LEN..headers_end),
            payload: wire.slice(headers_end..crc_offset),
            message_crc,
        })
    }

    /// Total encoded length of this frame.
    #[must_use]
    pub fn total_len(&self) -> usize {
        self.prelude.total_len()
    }

    /// Decode the raw header block.
    ///
    /// # Errors
    ///
    /// Returns [`EventStreamError::MalformedHeader`] if the block is malformed.
    pub fn decode_headers(&self) -> EventStreamResult<Headers> {
        decode_headers(self.headers.clone())
    }

    /// Re-encode this frame from its header block and payload.
    ///
    /// # Errors
    ///
    /// Returns [`EventStreamError::FrameTooLarge`] if the frame no longer fits
    /// the 32-bit length fields.
    pub fn encode(&self) -> EventStreamResult<Bytes> {
        encode_raw_frame(&self.headers, &self.payload)
    }
}

/// Decode the frame at the start of `buf`.
///
/// Returns the frame and the number of bytes it occupied. Bytes after the
/// frame are left untouched.
///
/// # Errors
///
/// Returns [`EventStreamError::IncompleteFrame`] if `buf` ends before the
/// frame does, [`EventStreamError::CorruptFrame`] on a checksum or prelude
/// inconsistency, and [`EventStreamError::FrameTooLarge`] if `limits` are exceeded.
pub fn decode_frame(buf: &Bytes, limits: &FrameLimits) -> EventStreamResult<(Frame, usize)> {
    let prelude = Prelude::parse(buf)?;
    limits.check(&prelude)?;

    let total = prelude.total_len();
    if buf.len() < total {
        return Err(EventStreamError::IncompleteFrame {
            expected: total,
            received: buf.len(),
        });
    }

    let frame = Frame::from_wire(prelude, buf.slice(..total))?;
    Ok((frame, total))
}

/// Encode a frame from typed headers and a payload.
///
/// # Errors
///
/// Returns [`EventStreamError::MalformedHeader`] if the headers cannot be
/// encoded, and [`EventStreamError::FrameTooLarge`] if the frame does not fit
/// the 32-bit length fields.
pub fn encode_frame(headers: &Headers, payload: &[u8]) -> EventStreamResult<Bytes> {
    let block = headers.encode()?;
    encode_raw_frame(&block, payload)
}

/// Encode a frame from an already encoded header block and a payload.
///
/// # Errors
///
/// Returns [`EventStreamError::FrameTooLarge`] if the frame does not fit the
/// 32-bit length fields.
pub fn encode_raw_frame(header_block: &[u8], payload: &[u8]) -> EventStreamResult<Bytes> {
    let total = MIN_FRAME_LEN + header_block.len() + payload.len();
    let too_large = |length: usize| EventStreamError::FrameTooLarge {
        what: "frame",
        length,
        limit: u32::MAX as usize,
    };
    let total_length = u32::try_from(total).map_err(|_| too_large(total))?;
    let headers_length = u32::try_from(header_block.len()).map_err(|_| too_large(total))?;

    let mut buf = BytesMut::with_capacity(total);
    buf.put_u32(total_length);
    buf.put_u32(headers_length);
    let prelude_crc = crc32fast::hash(&buf[..8]);
    buf.put_u32(prelude_crc);
    buf.put_slice(header_block);
    buf.put_slice(payload);
    let message_crc = crc32fast::hash(&buf);
    buf.put_u32(message_crc);
    Ok(buf.freeze())
}

// ---------------------------------------------------------------------------
// Incremental reader
// ---------------------------------------------------------------------------

/// Reads whole frames from a [`ByteSource`].
///
/// The reader buffers at most one frame. It never asks the source for more
/// bytes than the current frame still needs, so nothing past the last
/// delivered frame is consumed.
#[derive(Debug)]
pub struct FrameReader<S> {
    source: S,
    buffer: BytesMut,
    limits: FrameLimits,
    read_chunk_size: usize,
    read_timeout: Option<Duration>,
}

impl<S: ByteSource> FrameReader<S> {
    /// Create a reader over `source` using default limits and no timeout.
    pub fn new(source: S) -> Self {
        Self::with_config(source, &EventStreamConfig::default())
    }

    /// Create a reader over `source` with the limits and timeouts of `config`.
    pub fn with_config(source: S, config: &EventStreamConfig) -> Self {
        Self {
            source,
            buffer: BytesMut::new(),
            limits: config.limits(),
            read_chunk_size: config.read_chunk_size.max(1),
            read_timeout: config.read_timeout(),
        }
    }

    /// Read the next frame.
    ///
    /// Returns `Ok(None)` when the source ends cleanly on a frame boundary.
    ///
    /// # Errors
    ///
    /// Returns [`EventStreamError::IncompleteFrame`] if the source ends inside
    /// a frame, [`EventStreamError::Transport`] if a read fails or times out,
    /// and the validation errors of [`decode_frame`].
    pub async fn read_frame(&mut self) -> EventStreamResult<Option<Frame>> {
        if !self.fill_to(PRELUDE_LEN).await? {
            if self.buffer.is_empty() {
                return Ok(None);
            }
            return Err(EventStreamError::IncompleteFrame {
                expected: PRELUDE_LEN,
                received: self.buffer.len(),
            });
        }

        let prelude = Prelude::parse(&self.buffer)?;
        self.limits.check(&prelude)?;

        let total = prelude.total_len();
        self.buffer.reserve(total - self.buffer.len());
        if !self.fill_to(total).await? {
            return Err(EventStreamError::IncompleteFrame {
                expected: total,
                received: self.buffer.len(),
            });
        }

        let wire = self.buffer.split_to(total).freeze();
        let frame = Frame::from_wire(prelude, wire)?;
        trace!(
            total_length = total,
            headers_length = prelude.headers_len(),
            payload_length = prelude.payload_len(),
            "decoded event-stream frame"
        );
        Ok(Some(frame))
    }

    /// Release the underlying source.
    pub fn into_inner(self) -> S {
        self.source
    }

    /// Read until `target` bytes are buffered. Returns false if the source ends first.
    async fn fill_to(&mut self, target: usize) -> EventStreamResult<bool> {
        while self.buffer.len() < target {
            let wanted = (target - self.buffer.len()).min(self.read_chunk_size);
            match self.read_chunk(wanted).await? {
                Some(chunk) if !chunk.is_empty() => self.buffer.extend_from_slice(&chunk),
                _ => return Ok(false),
            }
        }
        Ok(true)
    }

    async fn read_chunk(&mut self, max_bytes: usize) -> EventStreamResult<Option<Bytes>> {
        let read = self.source.read_chunk(max_bytes);
        let chunk = match self.read_timeout {
            Some(timeout) => tokio::time::timeout(timeout, read).await.map_err(|_| {
                io::Error::new(
                    io::ErrorKind::TimedOut,
                    format!("byte source read timed out after {timeout:?}"),
                )
            })??,
            None => read.await?,
        };
        Ok(chunk)
    }
}

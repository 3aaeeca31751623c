//! Event-stream decoding errors.
//!
//! Every variant of [`EventStreamError`] is terminal for the session that
//! produced it: the stream controller surfaces it once and then reports
//! end-of-stream. Unknown event types are not errors; they are delivered as
//! data through the model's catch-all variant.

use std::fmt;

use ruststack_s3_model::S3Error;

/// Which of the two frame checksums failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChecksumKind {
    /// CRC32 over the 8-byte prelude.
    Prelude,
    /// CRC32 over every frame byte before the trailing checksum.
    Message,
}

impl fmt::Display for ChecksumKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Prelude => f.write_str("prelude"),
            Self::Message => f.write_str("message"),
        }
    }
}

/// The way in which a frame failed integrity validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FrameCorruption {
    /// A stored CRC32 does not match the bytes it covers.
    #[error("{kind} checksum mismatch: expected {expected:#010x}, computed {computed:#010x}")]
    Checksum {
        /// Which checksum failed.
        kind: ChecksumKind,
        /// The checksum stored in the frame.
        expected: u32,
        /// The checksum computed over the received bytes.
        computed: u32,
    },

    /// The declared total length cannot hold a prelude and a message checksum.
    #[error("total length {total_length} is below the 16-byte minimum")]
    TotalLengthTooSmall {
        /// The declared total length.
        total_length: u32,
    },

    /// The declared header block does not fit in the declared frame.
    #[error("headers length {headers_length} does not fit in a frame of {total_length} bytes")]
    HeadersOverflow {
        /// The declared header block length.
        headers_length: u32,
        /// The declared total length.
        total_length: u32,
    },
}

/// Errors produced while decoding an event stream.
#[derive(Debug, thiserror::Error)]
pub enum EventStreamError {
    /// The byte source ended before the declared frame length was available.
    #[error("incomplete frame: expected {expected} bytes, received {received}")]
    IncompleteFrame {
        /// Bytes required to complete the frame (or its prelude).
        expected: usize,
        /// Bytes actually received for this frame.
        received: usize,
    },

    /// The frame failed a checksum or its prelude is self-inconsistent.
    #[error("corrupt frame: {0}")]
    CorruptFrame(#[from] FrameCorruption),

    /// The frame exceeds a configured size limit.
    #[error("{what} of {length} bytes exceeds the {limit} byte limit")]
    FrameTooLarge {
        /// Which length was checked (`frame` or `header block`).
        what: &'static str,
        /// The declared length.
        length: usize,
        /// The configured limit.
        limit: usize,
    },

    /// The header block is inconsistent, or a required header is missing.
    #[error("malformed header: {0}")]
    MalformedHeader(String),

    /// A known event carries a payload its model cannot interpret.
    #[error("malformed {event_type} payload: {reason}")]
    MalformedPayload {
        /// The `:event-type` of the offending event.
        event_type: String,
        /// Why the payload was rejected.
        reason: String,
    },

    /// The service ended the stream with an exception message.
    #[error("service error: {0}")]
    Service(#[source] S3Error),

    /// The byte source failed or timed out.
    #[error("transport error: {0}")]
    Transport(#[from] std::io::Error),
}

impl EventStreamError {
    /// Create a [`EventStreamError::MalformedHeader`] error.
    #[must_use]
    pub fn malformed_header(reason: impl Into<String>) -> Self {
        Self::MalformedHeader(reason.into())
    }

    /// Create a [`EventStreamError::MalformedPayload`] error.
    #[must_use]
    pub fn malformed_payload(event_type: impl Into<String>, reason: impl fmt::Display) -> Self {
        Self::MalformedPayload {
            event_type: event_type.into(),
            reason: reason.to_string(),
        }
    }

    /// Returns the service error if the stream ended with an exception message.
    #[must_use]
    pub fn service_error(&self) -> Option<&S3Error> {
        match self {
            Self::Service(err) => Some(err),
            _ => None,
        }
    }

    /// Returns true for checksum and prelude consistency failures.
    #[must_use]
    pub fn is_corrupt_frame(&self) -> bool {
        matches!(self, Self::CorruptFrame(_))
    }

    /// Returns true if the byte source ended mid-frame.
    #[must_use]
    pub fn is_incomplete_frame(&self) -> bool {
        matches!(self, Self::IncompleteFrame { .. })
    }
}

impl From<S3Error> for EventStreamError {
    fn from(err: S3Error) -> Self {
        Self::Service(err)
    }
}

/// Convenience result type for event-stream operations.
pub type EventStreamResult<T> = Result<T, EventStreamError>;

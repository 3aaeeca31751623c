//! Streaming event-stream decoder for S3 `SelectObjectContent` responses.
//!
//! This crate turns a response body framed in the AWS event-stream binary
//! format into a lazily produced sequence of typed events. It handles:
//!
//! - **Framing** ([`frame`]): Length-prefixed frames with CRC32-protected
//!   preludes and bodies, read incrementally from a [`ByteSource`].
//!
//! - **Headers** ([`header`]): The typed header block codec.
//!
//! - **Dispatch** ([`dispatch`]): Classifies messages by `:message-type` and
//!   routes events by `:event-type` into an [`EventStreamModel`]. Exception
//!   messages become service errors.
//!
//! - **Sessions** ([`session`]): The pull-based [`EventStreamSession`] with
//!   cancellation, plus `Stream` and channel adapters.
//!
//! - **Select** ([`select`]): The model binding for
//!   [`SelectObjectContentEventStream`](ruststack_s3_model::SelectObjectContentEventStream).
//!
//! # Architecture
//!
//! ```text
//! ByteSource (AsyncRead / chunk stream)
//!   -> FrameReader (prelude + message CRC validation)
//!     -> Message (header block decode)
//!       -> dispatch (message type / event type routing)
//!         -> EventStreamModel (typed event union)
//!   <- EventStreamSession::next_event
//! ```
//!
//! # Usage
//!
//! ```rust,no_run
//! use ruststack_s3_eventstream::open_select_stream;
//! use ruststack_s3_model::SelectObjectContentEventStream;
//!
//! # async fn run(body: tokio::fs::File) -> Result<(), ruststack_s3_eventstream::EventStreamError> {
//! let mut session = open_select_stream(body);
//! while let Some(event) = session.next_event().await? {
//!     if let SelectObjectContentEventStream::Records(records) = event {
//!         println!("{} record bytes", records.payload.len());
//!     }
//! }
//! # Ok(())
//! # }
//! ```

// EventStreamError carries S3Error for service failures. Its size is inherent
// to that error's fields.
#![allow(clippy::result_large_err)]

pub mod config;
pub mod dispatch;
pub mod error;
pub mod frame;
pub mod header;
pub mod select;
pub mod session;
pub mod source;

pub use config::EventStreamConfig;
pub use dispatch::{EventStreamModel, Message, MessageType, dispatch};
pub use error::{ChecksumKind, EventStreamError, EventStreamResult, FrameCorruption};
pub use frame::{Frame, FrameLimits, FrameReader, Prelude, decode_frame, encode_frame};
pub use header::{HeaderType, HeaderValue, Headers, decode_headers};
pub use select::{
    SelectEventStream, encode_select_event, open_select_stream, open_select_stream_with_config,
    to_message,
};
pub use session::{CancelHandle, EventStreamSession, SessionMetrics, SessionReceiver, SessionState};
pub use source::{ByteSource, StreamSource};

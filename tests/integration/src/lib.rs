//! End-to-end tests for the S3 Select event-stream decoder.
//!
//! These tests build complete `SelectObjectContent` response bodies in memory
//! and decode them through the public session API, over the byte sources a
//! real client would use: plain readers, partial reads, and chunk streams.
//!
//! Run them with:
//! ```text
//! cargo test -p ruststack-integration
//! ```

use std::io;
use std::sync::Once;

use bytes::Bytes;
use futures::stream::{self, Iter};
use ruststack_s3_eventstream::{Message, StreamSource, encode_select_event};
use ruststack_s3_model::{S3Error, SelectObjectContentEventStream};

static INIT: Once = Once::new();

/// Initialize tracing (once).
pub fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
            )
            .with_test_writer()
            .init();
    });
}

/// Encode one event as a frame.
#[must_use]
pub fn event_frame(event: &SelectObjectContentEventStream) -> Vec<u8> {
    encode_select_event(event)
        .unwrap_or_else(|e| panic!("failed to encode {}: {e}", event.event_type()))
        .to_vec()
}

/// Encode a sequence of events as a response body.
#[must_use]
pub fn select_body(events: &[SelectObjectContentEventStream]) -> Vec<u8> {
    events.iter().flat_map(event_frame).collect()
}

/// Encode an exception message as a frame.
#[must_use]
pub fn exception_frame(err: &S3Error) -> Vec<u8> {
    Message::exception(err)
        .encode()
        .unwrap_or_else(|e| panic!("failed to encode exception: {e}"))
        .to_vec()
}

/// Byte offsets at which each frame of `frames` ends within their concatenation.
#[must_use]
pub fn frame_boundaries(frames: &[Vec<u8>]) -> Vec<usize> {
    frames
        .iter()
        .scan(0, |end, frame| {
            *end += frame.len();
            Some(*end)
        })
        .collect()
}

/// A chunk stream yielding `body` in pieces of `chunk_size` bytes.
pub type ChunkStream = Iter<std::vec::IntoIter<Result<Bytes, io::Error>>>;

/// Wrap `body` as a [`StreamSource`] that delivers `chunk_size` bytes per item.
#[must_use]
pub fn chunked_source(body: &[u8], chunk_size: usize) -> StreamSource<ChunkStream> {
    let chunks: Vec<Result<Bytes, io::Error>> = body
        .chunks(chunk_size)
        .map(|c| Ok(Bytes::copy_from_slice(c)))
        .collect();
    StreamSource::new(stream::iter(chunks))
}

mod test_cancel;
mod test_framing;
mod test_select;

//! Byte sources feeding the frame reader.
//!
//! [`ByteSource`] is the single seam between the decoder and the transport.
//! Any `tokio::io::AsyncRead` is a byte source, and [`StreamSource`] adapts a
//! stream of byte chunks such as an HTTP response body.

use std::fmt;
use std::io;

use async_trait::async_trait;
use bytes::Bytes;
use futures::{Stream, StreamExt};
use tokio::io::{AsyncRead, AsyncReadExt};

/// A pull-based supplier of response body bytes.
#[async_trait]
pub trait ByteSource: Send {
    /// Read at most `max_bytes` bytes.
    ///
    /// Returns `Ok(None)` at end of input. A returned chunk is never empty and
    /// never longer than `max_bytes`.
    async fn read_chunk(&mut self, max_bytes: usize) -> io::Result<Option<Bytes>>;
}

#[async_trait]
impl<R> ByteSource for R
where
    R: AsyncRead + Unpin + Send,
{
    async fn read_chunk(&mut self, max_bytes: usize) -> io::Result<Option<Bytes>> {
        if max_bytes == 0 {
            return Ok(None);
        }
        let mut buf = vec![0u8; max_bytes];
        let n = self.read(&mut buf).await?;
        if n == 0 {
            return Ok(None);
        }
        buf.truncate(n);
        Ok(Some(Bytes::from(buf)))
    }
}

/// Adapts a stream of `Result<Bytes, E>` chunks into a [`ByteSource`].
///
/// Chunks larger than the requested size are split; the remainder is held
/// until the next read. Empty chunks are skipped.
pub struct StreamSource<S> {
    stream: S,
    pending: Bytes,
}

impl<S> StreamSource<S> {
    /// Wrap a chunk stream.
    pub fn new(stream: S) -> Self {
        Self {
            stream,
            pending: Bytes::new(),
        }
    }
}

impl<S> fmt::Debug for StreamSource<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamSource")
            .field("pending", &self.pending.len())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl<S, E> ByteSource for StreamSource<S>
where
    S: Stream<Item = Result<Bytes, E>> + Unpin + Send,
    E: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    async fn read_chunk(&mut self, max_bytes: usize) -> io::Result<Option<Bytes>> {
        if max_bytes == 0 {
            return Ok(None);
        }
        while self.pending.is_empty() {
            match self.stream.next().await {
                Some(Ok(chunk)) => self.pending = chunk,
                Some(Err(err)) => return Err(io::Error::other(err)),
                None => return Ok(None),
            }
        }
        let n = max_bytes.min(self.pending.len());
        Ok(Some(self.pending.split_to(n)))
    }
}

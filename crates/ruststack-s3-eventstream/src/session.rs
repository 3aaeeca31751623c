//! Stream controller: the consumer-facing event session.
//!
//! An [`EventStreamSession`] owns a [`FrameReader`] and turns frames into
//! typed events one at a time. It is pull-based; [`EventStreamSession::into_stream`]
//! and [`EventStreamSession::spawn`] adapt it to `futures::Stream` and to a
//! bounded channel respectively.
//!
//! ```text
//!            next_event()
//!   Idle ──────────────────► Streaming ──┬── End event / clean EOF ──► Completed
//!                                        ├── any error ──────────────► Failed
//!                                        └── cancel() ───────────────► Cancelled
//! ```
//!
//! Terminal states are absorbing: every later `next_event` returns `Ok(None)`
//! without touching the byte source, which is released on the transition.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures::Stream;
use tokio::sync::{Notify, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::config::EventStreamConfig;
use crate::dispatch::{EventStreamModel, Message, dispatch};
use crate::error::{EventStreamError, EventStreamResult};
use crate::frame::{Frame, FrameReader, MIN_FRAME_LEN};
use crate::source::ByteSource;

/// Lifecycle state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    /// Opened, nothing read yet.
    Idle,
    /// At least one read attempted, no terminal condition reached.
    Streaming,
    /// The end event arrived, or the source ended cleanly.
    Completed,
    /// An error was surfaced.
    Failed,
    /// The consumer cancelled the session.
    Cancelled,
}

impl SessionState {
    /// Returns true for `Completed`, `Failed` and `Cancelled`.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }
}

/// Counters describing the work a session has done.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionMetrics {
    /// Frames that passed validation.
    pub frames_decoded: u64,
    /// Bytes of all validated frames.
    pub bytes_consumed: u64,
    /// Events handed to the consumer, unknown ones included.
    pub events_delivered: u64,
    /// Events delivered through the model's catch-all variant.
    pub unknown_events: u64,
}

/// A cloneable handle that cancels a session from anywhere.
///
/// Cancellation is observed at the session's next suspension point: a read
/// that is blocked on the byte source is abandoned.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle {
    inner: Arc<CancelInner>,
}

#[derive(Debug, Default)]
struct CancelInner {
    cancelled: AtomicBool,
    notify: Notify,
}

impl CancelHandle {
    /// Create a handle that is not cancelled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        if !self.inner.cancelled.swap(true, Ordering::AcqRel) {
            self.inner.notify.notify_waiters();
        }
    }

    /// Returns true once [`CancelHandle::cancel`] has been called.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::Acquire)
    }

    /// Wait until cancellation is requested.
    pub async fn cancelled(&self) {
        loop {
            // Register before checking the flag so a concurrent cancel is not missed.
            let notified = self.inner.notify.notified();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }
}

/// A decoding session over one response body.
pub struct EventStreamSession<S, E> {
    reader: Option<FrameReader<S>>,
    state: SessionState,
    cancel: CancelHandle,
    require_end_event: bool,
    metrics: SessionMetrics,
    _model: PhantomData<fn() -> E>,
}

impl<S, E> fmt::Debug for EventStreamSession<S, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStreamSession")
            .field("state", &self.state)
            .field("metrics", &self.metrics)
            .field("require_end_event", &self.require_end_event)
            .finish_non_exhaustive()
    }
}

impl<S, E> EventStreamSession<S, E>
where
    S: ByteSource,
    E: EventStreamModel,
{
    /// Open a session over `source` with the default configuration.
    pub fn open(source: S) -> Self {
        Self::open_with_config(source, &EventStreamConfig::default())
    }

    /// Open a session over `source` with `config`.
    pub fn open_with_config(source: S, config: &EventStreamConfig) -> Self {
        Self {
            reader: Some(FrameReader::with_config(source, config)),
            state: SessionState::Idle,
            cancel: CancelHandle::new(),
            require_end_event: config.require_end_event,
            metrics: SessionMetrics::default(),
            _model: PhantomData,
        }
    }

    /// Pull the next event.
    ///
    /// Returns `Ok(None)` once the session has completed, failed, or been
    /// cancelled. An error is returned at most once; the session is `Failed`
    /// afterwards.
    ///
    /// # Errors
    ///
    /// Returns the first decoding, transport, or service error of the stream.
    pub async fn next_event(&mut self) -> EventStreamResult<Option<E>> {
        if self.state.is_terminal() {
            return Ok(None);
        }
        if self.cancel.is_cancelled() {
            self.finish(SessionState::Cancelled);
            return Ok(None);
        }
        if self.state == SessionState::Idle {
            self.transition(SessionState::Streaming);
        }
        let Some(reader) = self.reader.as_mut() else {
            return Ok(None);
        };

        let cancel = self.cancel.clone();
        let read = tokio::select! {
            biased;
            () = cancel.cancelled() => None,
            result = reader.read_frame() => Some(result),
        };
        let Some(read) = read else {
            self.finish(SessionState::Cancelled);
            return Ok(None);
        };

        match self.accept(read) {
            Ok(event) => Ok(event),
            Err(err) => {
                warn!(error = %err, "event stream failed");
                self.finish(SessionState::Failed);
                Err(err)
            }
        }
    }

    /// Cancel the session. Later calls to `next_event` return `Ok(None)`.
    pub fn cancel(&mut self) {
        self.cancel.cancel();
        if !self.state.is_terminal() {
            self.finish(SessionState::Cancelled);
        }
    }

    /// A handle that cancels this session from another task.
    #[must_use]
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Counters for the work done so far.
    #[must_use]
    pub fn metrics(&self) -> SessionMetrics {
        self.metrics
    }

    /// Adapt the session into a `Stream` that ends after the last event or
    /// after the first error.
    pub fn into_stream(self) -> impl Stream<Item = EventStreamResult<E>> {
        futures::stream::unfold(self, |mut session| async move {
            match session.next_event().await {
                Ok(Some(event)) => Some((Ok(event), session)),
                Ok(None) => None,
                Err(err) => Some((Err(err), session)),
            }
        })
    }

    /// Drive the session on a background task, delivering events through a
    /// channel with room for one undelivered item.
    ///
    /// Dropping or cancelling the receiver stops the task.
    pub fn spawn(self) -> SessionReceiver<E>
    where
        S: 'static,
    {
        let (tx, rx) = mpsc::channel(1);
        let cancel = self.cancel.clone();
        let task = tokio::spawn(async move {
            let mut session = self;
            loop {
                let item = match session.next_event().await {
                    Ok(Some(event)) => Ok(event),
                    Ok(None) => break,
                    Err(err) => Err(err),
                };
                if tx.send(item).await.is_err() {
                    debug!("event receiver dropped, cancelling session");
                    session.cancel();
                    break;
                }
            }
            session.state()
        });
        SessionReceiver { rx, cancel, task }
    }

    fn accept(&mut self, read: EventStreamResult<Option<Frame>>) -> EventStreamResult<Option<E>> {
        let Some(frame) = read? else {
            if self.require_end_event {
                return Err(EventStreamError::IncompleteFrame {
                    expected: MIN_FRAME_LEN,
                    received: 0,
                });
            }
            debug!("byte source ended on a frame boundary");
            self.finish(SessionState::Completed);
            return Ok(None);
        };

        self.metrics.frames_decoded += 1;
        self.metrics.bytes_consumed += frame.total_len() as u64;

        let event = dispatch::<E>(Message::from_frame(frame)?)?;
        self.metrics.events_delivered += 1;
        if event.is_unknown() {
            self.metrics.unknown_events += 1;
        }
        if event.is_end() {
            self.finish(SessionState::Completed);
        }
        Ok(Some(event))
    }
}

impl<S, E> EventStreamSession<S, E> {
    /// Enter a terminal state and release the byte source.
    fn finish(&mut self, state: SessionState) {
        self.reader = None;
        self.transition(state);
        debug!(
            frames = self.metrics.frames_decoded,
            bytes = self.metrics.bytes_consumed,
            events = self.metrics.events_delivered,
            unknown = self.metrics.unknown_events,
            "event stream session finished"
        );
    }

    fn transition(&mut self, to: SessionState) {
        debug!(from = ?self.state, to = ?to, "event stream session state change");
        self.state = to;
    }
}

/// Receiving end of a spawned session.
pub struct SessionReceiver<E> {
    rx: mpsc::Receiver<EventStreamResult<E>>,
    cancel: CancelHandle,
    task: JoinHandle<SessionState>,
}

impl<E> fmt::Debug for SessionReceiver<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionReceiver")
            .field("cancelled", &self.cancel.is_cancelled())
            .finish_non_exhaustive()
    }
}

impl<E> SessionReceiver<E> {
    /// Receive the next event, or `None` once the session has ended.
    pub async fn recv(&mut self) -> Option<EventStreamResult<E>> {
        self.rx.recv().await
    }

    /// Cancel the session. At most one already buffered item is still delivered.
    pub fn cancel(&mut self) {
        self.cancel.cancel();
        self.rx.close();
    }

    /// Stop receiving and wait for the background task to exit.
    ///
    /// A session that has not finished yet is cancelled, abandoning any read
    /// in flight. Returns the session's final state.
    pub async fn join(mut self) -> SessionState {
        self.cancel();
        match (&mut self.task).await {
            Ok(state) => state,
            Err(err) => {
                warn!(error = %err, "event stream task did not complete");
                SessionState::Failed
            }
        }
    }
}

impl<E> Drop for SessionReceiver<E> {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

//! Cancellation and backpressure integration tests.

#[cfg(test)]
mod tests {
    use std::io;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use bytes::Bytes;
    use ruststack_s3_eventstream::{
        ByteSource, EventStreamConfig, EventStreamError, SessionState, open_select_stream,
        open_select_stream_with_config,
    };
    use ruststack_s3_model::SelectObjectContentEventStream;
    use tokio::io::AsyncWriteExt;

    use crate::{event_frame, init_tracing, select_body};

    /// Serves a fixed body and counts the bytes handed out.
    struct CountingSource {
        body: Bytes,
        served: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl ByteSource for CountingSource {
        async fn read_chunk(&mut self, max_bytes: usize) -> io::Result<Option<Bytes>> {
            if self.body.is_empty() {
                return Ok(None);
            }
            let n = max_bytes.min(self.body.len());
            self.served.fetch_add(n, Ordering::SeqCst);
            Ok(Some(self.body.split_to(n)))
        }
    }

    #[tokio::test]
    async fn test_should_cancel_from_another_task_while_blocked() {
        init_tracing();
        let (mut writer, reader) = tokio::io::duplex(4096);
        writer
            .write_all(&event_frame(&SelectObjectContentEventStream::records("first")))
            .await
            .expect("write");

        let mut session = open_select_stream(reader);
        assert_eq!(
            session.next_event().await.expect("event"),
            Some(SelectObjectContentEventStream::records("first"))
        );

        let handle = session.cancel_handle();
        let canceller = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(25)).await;
            handle.cancel();
        });

        let next = tokio::time::timeout(Duration::from_secs(5), session.next_event())
            .await
            .expect("cancel should end the blocked read promptly");
        assert!(next.expect("cancel is not an error").is_none());
        assert_eq!(session.state(), SessionState::Cancelled);
        assert!(session.next_event().await.expect("after cancel").is_none());

        canceller.await.expect("canceller task");
        drop(writer);
    }

    #[tokio::test]
    async fn test_should_not_race_ahead_of_slow_consumer() {
        init_tracing();
        let frame = event_frame(&SelectObjectContentEventStream::records("0123456789"));
        let body: Vec<u8> = std::iter::repeat_n(frame.clone(), 10).flatten().collect();
        let served = Arc::new(AtomicUsize::new(0));
        let source = CountingSource {
            body: Bytes::from(body),
            served: Arc::clone(&served),
        };

        let mut rx = open_select_stream(source).spawn();
        tokio::time::sleep(Duration::from_millis(50)).await;

        // One event waits in the channel and one waits to be sent.
        assert!(
            served.load(Ordering::SeqCst) <= 2 * frame.len(),
            "producer read {} bytes ahead of the consumer",
            served.load(Ordering::SeqCst)
        );

        let mut received = 0;
        while let Some(item) = rx.recv().await {
            item.expect("event");
            received += 1;
        }
        assert_eq!(received, 10);
        assert_eq!(rx.join().await, SessionState::Completed);
    }

    #[tokio::test]
    async fn test_should_stop_producer_when_receiver_dropped() {
        init_tracing();
        let body = select_body(&vec![SelectObjectContentEventStream::records("row"); 20]);
        let served = Arc::new(AtomicUsize::new(0));
        let source = CountingSource {
            body: Bytes::from(body.clone()),
            served: Arc::clone(&served),
        };

        let mut rx = open_select_stream(source).spawn();
        assert!(rx.recv().await.expect("item").is_ok());
        let state = rx.join().await;

        assert_eq!(state, SessionState::Cancelled);
        assert!(served.load(Ordering::SeqCst) < body.len());
    }

    #[tokio::test]
    async fn test_should_deliver_error_through_channel() {
        init_tracing();
        let mut body = event_frame(&SelectObjectContentEventStream::records("ok"));
        body.extend_from_slice(&[0, 0, 0, 40, 0, 0]);
        let config = EventStreamConfig::builder().read_chunk_size(4).build();

        let mut rx = open_select_stream_with_config(std::io::Cursor::new(body), &config).spawn();
        assert!(rx.recv().await.expect("item").is_ok());
        let err = rx.recv().await.expect("item").unwrap_err();
        assert!(matches!(err, EventStreamError::IncompleteFrame { .. }));
        assert!(rx.recv().await.is_none());
        assert_eq!(rx.join().await, SessionState::Failed);
    }
}

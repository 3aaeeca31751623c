//! Select response decoding integration tests.

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use futures::StreamExt;
    use ruststack_s3_eventstream::{
        EventStreamConfig, EventStreamError, SessionState, open_select_stream,
        open_select_stream_with_config,
    };
    use ruststack_s3_model::error::S3ErrorCode;
    use ruststack_s3_model::{
        ContinuationEvent, Progress, S3Error, SelectObjectContentEventStream, Stats,
    };
    use tokio_test::io::Builder;

    use crate::{chunked_source, event_frame, exception_frame, init_tracing, select_body};

    fn typical_response() -> Vec<SelectObjectContentEventStream> {
        vec![
            SelectObjectContentEventStream::records("id,name\n1,alice\n"),
            SelectObjectContentEventStream::progress(Progress {
                bytes_scanned: Some(512),
                bytes_processed: Some(512),
                bytes_returned: Some(16),
            }),
            SelectObjectContentEventStream::Cont(ContinuationEvent),
            SelectObjectContentEventStream::records("2,bob\n"),
            SelectObjectContentEventStream::stats(Stats {
                bytes_scanned: Some(1024),
                bytes_processed: Some(1024),
                bytes_returned: Some(24),
            }),
            SelectObjectContentEventStream::end(),
        ]
    }

    fn records_text(events: &[SelectObjectContentEventStream]) -> String {
        events
            .iter()
            .filter_map(|e| match e {
                SelectObjectContentEventStream::Records(r) => {
                    Some(String::from_utf8_lossy(&r.payload).into_owned())
                }
                _ => None,
            })
            .collect()
    }

    #[tokio::test]
    async fn test_should_decode_typical_select_response() {
        init_tracing();
        let expected = typical_response();
        let body = select_body(&expected);

        let mut session = open_select_stream(&body[..]);
        let mut events = Vec::new();
        while let Some(event) = session.next_event().await.expect("event") {
            events.push(event);
        }

        assert_eq!(events, expected);
        assert_eq!(records_text(&events), "id,name\n1,alice\n2,bob\n");
        assert_eq!(session.state(), SessionState::Completed);

        let metrics = session.metrics();
        assert_eq!(metrics.frames_decoded, 6);
        assert_eq!(metrics.bytes_consumed, body.len() as u64);
        assert_eq!(metrics.unknown_events, 0);
    }

    #[tokio::test]
    async fn test_should_decode_identically_for_any_chunking() {
        init_tracing();
        let expected = typical_response();
        let body = select_body(&expected);

        for chunk_size in [1, 2, 3, 5, 11, 16, 64, body.len()] {
            let session = open_select_stream(chunked_source(&body, chunk_size));
            let events: Vec<_> = session
                .into_stream()
                .map(|e| e.expect("event"))
                .collect()
                .await;
            assert_eq!(events, expected, "chunk size {chunk_size}");
        }
    }

    #[tokio::test]
    async fn test_should_decode_with_small_read_chunks() {
        init_tracing();
        let expected = typical_response();
        let body = select_body(&expected);
        let config = EventStreamConfig::builder().read_chunk_size(3).build();

        let mut session = open_select_stream_with_config(&body[..], &config);
        let mut count = 0;
        while session.next_event().await.expect("event").is_some() {
            count += 1;
        }
        assert_eq!(count, expected.len());
    }

    #[tokio::test]
    async fn test_should_decode_over_partial_reads() {
        init_tracing();
        let body = select_body(&[
            SelectObjectContentEventStream::records("hello"),
            SelectObjectContentEventStream::end(),
        ]);
        let (head, tail) = body.split_at(13);
        let (middle, tail) = tail.split_at(tail.len() / 2);
        let mock = Builder::new().read(head).read(middle).read(tail).build();

        let mut session = open_select_stream(mock);
        assert_eq!(
            session.next_event().await.expect("event"),
            Some(SelectObjectContentEventStream::records("hello"))
        );
        assert_eq!(
            session.next_event().await.expect("event"),
            Some(SelectObjectContentEventStream::end())
        );
        assert_eq!(session.next_event().await.expect("event"), None);
    }

    #[tokio::test]
    async fn test_should_deliver_unknown_events_in_order() {
        init_tracing();
        let telemetry = SelectObjectContentEventStream::Unknown {
            event_type: "Telemetry".to_owned(),
            payload: Bytes::from_static(b"{\"cpu\":3}"),
        };
        let body = select_body(&[
            SelectObjectContentEventStream::records("a"),
            telemetry.clone(),
            SelectObjectContentEventStream::records("b"),
            SelectObjectContentEventStream::end(),
        ]);

        let mut session = open_select_stream(&body[..]);
        let mut events = Vec::new();
        while let Some(event) = session.next_event().await.expect("event") {
            events.push(event);
        }

        assert_eq!(events.len(), 4);
        assert_eq!(events[1], telemetry);
        assert_eq!(records_text(&events), "ab");
        assert_eq!(session.metrics().unknown_events, 1);
    }

    #[tokio::test]
    async fn test_should_surface_exception_after_records() {
        init_tracing();
        let mut body = event_frame(&SelectObjectContentEventStream::records("1,ok\n"));
        body.extend(exception_frame(
            &S3Error::with_message(S3ErrorCode::CSVParsingError, "unterminated quote")
                .with_request_id("4442587FB7D0A2F9"),
        ));
        body.extend(event_frame(&SelectObjectContentEventStream::end()));

        let mut session = open_select_stream(&body[..]);
        assert_eq!(
            session.next_event().await.expect("event"),
            Some(SelectObjectContentEventStream::records("1,ok\n"))
        );

        let err = session.next_event().await.unwrap_err();
        let service = err
            .service_error()
            .unwrap_or_else(|| panic!("expected service error, got {err}"));
        assert_eq!(service.code, S3ErrorCode::CSVParsingError);
        assert_eq!(service.message, "unterminated quote");
        assert_eq!(service.request_id.as_deref(), Some("4442587FB7D0A2F9"));

        assert_eq!(session.next_event().await.expect("after error"), None);
        assert_eq!(session.state(), SessionState::Failed);
    }

    #[tokio::test]
    async fn test_should_fail_on_malformed_stats_payload() {
        init_tracing();
        let mut body = event_frame(&SelectObjectContentEventStream::records("x"));
        body.extend(
            ruststack_s3_eventstream::Message::event(
                "Stats",
                Some("text/xml"),
                "<Stats><BytesScanned>many</BytesScanned></Stats>",
            )
            .encode()
            .expect("encode")
            .to_vec(),
        );

        let stream = open_select_stream(&body[..]).into_stream();
        let items: Vec<_> = stream.collect().await;
        assert_eq!(items.len(), 2);
        assert!(matches!(
            items[1],
            Err(EventStreamError::MalformedPayload { ref event_type, .. }) if event_type == "Stats"
        ));
    }

    #[tokio::test]
    async fn test_should_reject_oversized_frame_before_reading_it() {
        init_tracing();
        let body = select_body(&[SelectObjectContentEventStream::records(vec![b'r'; 4096])]);
        let config = EventStreamConfig::builder().max_frame_size(1024).build();

        let mut session = open_select_stream_with_config(&body[..], &config);
        let err = session.next_event().await.unwrap_err();
        assert!(matches!(
            err,
            EventStreamError::FrameTooLarge { what: "frame", limit: 1024, .. }
        ));
        assert_eq!(session.metrics().bytes_consumed, 0);
    }
}

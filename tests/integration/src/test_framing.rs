//! Framing integrity integration tests: truncation, corruption, and header types.

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use ruststack_s3_eventstream::{
        EventStreamError, HeaderValue, Headers, Message, SessionState, open_select_stream,
    };
    use ruststack_s3_model::{Progress, SelectObjectContentEventStream};

    use crate::{event_frame, frame_boundaries, init_tracing};

    type Outcome = (Vec<SelectObjectContentEventStream>, Option<EventStreamError>);

    fn sample_frames() -> Vec<Vec<u8>> {
        vec![
            event_frame(&SelectObjectContentEventStream::records("alpha,1\n")),
            event_frame(&SelectObjectContentEventStream::progress(Progress {
                bytes_scanned: Some(64),
                bytes_processed: Some(64),
                bytes_returned: Some(8),
            })),
            event_frame(&SelectObjectContentEventStream::records("beta,2\n")),
        ]
    }

    async fn decode_all(body: &[u8]) -> Outcome {
        let mut session = open_select_stream(body);
        let mut events = Vec::new();
        loop {
            match session.next_event().await {
                Ok(Some(event)) => events.push(event),
                Ok(None) => return (events, None),
                Err(err) => {
                    assert_eq!(session.state(), SessionState::Failed);
                    return (events, Some(err));
                }
            }
        }
    }

    #[tokio::test]
    async fn test_should_report_every_mid_frame_truncation_as_incomplete() {
        init_tracing();
        let frames = sample_frames();
        let boundaries = frame_boundaries(&frames);
        let body = frames.concat();

        for cut in 0..=body.len() {
            let (events, err) = decode_all(&body[..cut]).await;
            let complete = boundaries.iter().filter(|end| **end <= cut).count();
            assert_eq!(events.len(), complete, "cut at {cut}");

            if cut == 0 || boundaries.contains(&cut) {
                assert!(err.is_none(), "cut at boundary {cut} should end cleanly");
            } else {
                let err = err.unwrap_or_else(|| panic!("cut at {cut} should fail"));
                assert!(err.is_incomplete_frame(), "cut at {cut} gave {err}");
            }
        }
    }

    #[tokio::test]
    async fn test_should_report_every_bit_flip_as_corrupt() {
        init_tracing();
        let frames = sample_frames();
        let boundaries = frame_boundaries(&frames);
        let body = frames.concat();

        for offset in 0..body.len() {
            let damaged_frame = boundaries
                .iter()
                .position(|end| offset < *end)
                .expect("offset inside body");
            for bit in 0..8 {
                let mut damaged = body.clone();
                damaged[offset] ^= 1 << bit;

                let (events, err) = decode_all(&damaged).await;
                assert_eq!(
                    events.len(),
                    damaged_frame,
                    "flip at byte {offset} bit {bit}"
                );
                let err = err.unwrap_or_else(|| panic!("flip at byte {offset} bit {bit} decoded"));
                assert!(err.is_corrupt_frame(), "flip at byte {offset} bit {bit} gave {err}");
            }
        }
    }

    #[tokio::test]
    async fn test_should_ignore_extra_typed_headers() {
        init_tracing();
        let mut headers = Headers::new();
        headers.insert(":message-type", "event");
        headers.insert(":event-type", "Records");
        headers.insert(":content-type", "application/octet-stream");
        headers.insert("x-flag", true);
        headers.insert("x-byte", 7_i8);
        headers.insert("x-short", -2_i16);
        headers.insert("x-int", 65_536_i32);
        headers.insert("x-long", i64::MIN);
        headers.insert("x-bytes", Bytes::from_static(&[9, 9]));
        headers.insert("x-time", HeaderValue::Timestamp(1_600_000_000_000));
        headers.insert("x-id", HeaderValue::Uuid(Default::default()));
        let body = Message::new(headers, "row\n").encode().expect("encode");

        let (events, err) = decode_all(&body).await;
        assert!(err.is_none());
        assert_eq!(events, vec![SelectObjectContentEventStream::records("row\n")]);
    }

    #[tokio::test]
    async fn test_should_fail_on_unknown_header_type_tag() {
        init_tracing();
        // Header block: name "x", type tag 42.
        let block = [1, b'x', 42];
        let body = ruststack_s3_eventstream::frame::encode_raw_frame(&block, b"").expect("encode");

        let (events, err) = decode_all(&body).await;
        assert!(events.is_empty());
        assert!(matches!(err, Some(EventStreamError::MalformedHeader(_))));
    }

    #[tokio::test]
    async fn test_should_fail_on_prelude_declaring_headers_beyond_frame() {
        init_tracing();
        let mut raw = Vec::new();
        raw.extend_from_slice(&20_u32.to_be_bytes());
        raw.extend_from_slice(&10_u32.to_be_bytes());
        let crc = crc32fast::hash(&raw);
        raw.extend_from_slice(&crc.to_be_bytes());
        raw.extend_from_slice(&[0; 8]);

        let (_, err) = decode_all(&raw).await;
        assert!(err.is_some_and(|e| e.is_corrupt_frame()));
    }
}

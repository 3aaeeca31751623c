//! `SelectObjectContent` binding of the event-stream decoder.
//!
//! Maps `:event-type` names onto [`SelectObjectContentEventStream`] variants:
//! `Records` payloads pass through untouched, `Stats` and `Progress` payloads
//! are parsed as XML, and `Cont` and `End` carry nothing.

use bytes::Bytes;
use ruststack_s3_model::event_stream::{ContinuationEvent, SelectObjectContentEventStream};
use ruststack_s3_model::types::{Progress, Stats};
use ruststack_s3_xml::{from_xml, to_xml};

use crate::config::EventStreamConfig;
use crate::dispatch::{EventStreamModel, Message};
use crate::error::{EventStreamError, EventStreamResult};
use crate::session::EventStreamSession;
use crate::source::ByteSource;

/// Content type of `Records` payloads.
pub const RECORDS_CONTENT_TYPE: &str = "application/octet-stream";

/// Content type of `Stats` and `Progress` payloads.
pub const XML_CONTENT_TYPE: &str = "text/xml";

/// A session decoding a `SelectObjectContent` response body.
pub type SelectEventStream<S> = EventStreamSession<S, SelectObjectContentEventStream>;

impl EventStreamModel for SelectObjectContentEventStream {
    fn from_event(event_type: &str, message: Message) -> EventStreamResult<Self> {
        let event = match event_type {
            Self::RECORDS => Self::records(message.payload),
            Self::STATS => Self::stats(
                from_xml::<Stats>(&message.payload)
                    .map_err(|e| EventStreamError::malformed_payload(event_type, e))?,
            ),
            Self::PROGRESS => Self::progress(
                from_xml::<Progress>(&message.payload)
                    .map_err(|e| EventStreamError::malformed_payload(event_type, e))?,
            ),
            Self::CONT => Self::Cont(ContinuationEvent),
            Self::END => Self::end(),
            _ => Self::Unknown {
                event_type: event_type.to_owned(),
                payload: message.payload,
            },
        };
        Ok(event)
    }

    fn is_end(&self) -> bool {
        SelectObjectContentEventStream::is_end(self)
    }

    fn is_unknown(&self) -> bool {
        SelectObjectContentEventStream::is_unknown(self)
    }
}

/// Open a session over a `SelectObjectContent` response body.
pub fn open_select_stream<S: ByteSource>(source: S) -> SelectEventStream<S> {
    EventStreamSession::open(source)
}

/// Open a session over a `SelectObjectContent` response body with `config`.
pub fn open_select_stream_with_config<S: ByteSource>(
    source: S,
    config: &EventStreamConfig,
) -> SelectEventStream<S> {
    EventStreamSession::open_with_config(source, config)
}

/// Build the `event` message that carries `event` on the wire.
///
/// # Errors
///
/// Returns [`EventStreamError::MalformedPayload`] if `Stats` or `Progress`
/// details cannot be written as XML.
pub fn to_message(event: &SelectObjectContentEventStream) -> EventStreamResult<Message> {
    let event_type = event.event_type();
    let message = match event {
        SelectObjectContentEventStream::Records(records) => {
            Message::event(event_type, Some(RECORDS_CONTENT_TYPE), records.payload.clone())
        }
        SelectObjectContentEventStream::Stats(stats) => {
            let xml = to_xml(event_type, &stats.details)
                .map_err(|e| EventStreamError::malformed_payload(event_type, e))?;
            Message::event(event_type, Some(XML_CONTENT_TYPE), xml)
        }
        SelectObjectContentEventStream::Progress(progress) => {
            let xml = to_xml(event_type, &progress.details)
                .map_err(|e| EventStreamError::malformed_payload(event_type, e))?;
            Message::event(event_type, Some(XML_CONTENT_TYPE), xml)
        }
        SelectObjectContentEventStream::Cont(_) | SelectObjectContentEventStream::End(_) => {
            Message::event(event_type, None, Bytes::new())
        }
        SelectObjectContentEventStream::Unknown { payload, .. } => {
            Message::event(event_type, None, payload.clone())
        }
    };
    Ok(message)
}

/// Encode `event` as a complete frame.
///
/// # Errors
///
/// See [`to_message`] and [`Message::encode`].
pub fn encode_select_event(event: &SelectObjectContentEventStream) -> EventStreamResult<Bytes> {
    to_message(event)?.encode()
}

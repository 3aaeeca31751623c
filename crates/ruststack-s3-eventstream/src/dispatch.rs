//! Message classification and event dispatch.
//!
//! Every frame becomes a [`Message`], which is classified by its
//! `:message-type` header:
//!
//! - `event`: routed by `:event-type` to the [`EventStreamModel`]. Names the
//!   model does not know become its catch-all variant.
//! - `exception` and `error`: converted to an [`S3Error`] that ends the stream.
//!
//! Anything else is a protocol violation and fails the stream.

use std::fmt;

use bytes::Bytes;
use ruststack_s3_model::S3Error;
use tracing::{debug, warn};

use crate::error::{EventStreamError, EventStreamResult};
use crate::frame::{Frame, encode_frame};
use crate::header::Headers;

/// Header naming the kind of message.
pub const MESSAGE_TYPE_HEADER: &str = ":message-type";
/// Header naming the event within an `event` message.
pub const EVENT_TYPE_HEADER: &str = ":event-type";
/// Header describing the payload encoding.
pub const CONTENT_TYPE_HEADER: &str = ":content-type";
/// Error code header of `exception` and `error` messages.
pub const ERROR_CODE_HEADER: &str = ":error-code";
/// Error message header of `exception` and `error` messages.
pub const ERROR_MESSAGE_HEADER: &str = ":error-message";
/// Exception name header, used when `:error-code` is absent.
pub const EXCEPTION_TYPE_HEADER: &str = ":exception-type";
/// Request ID header attached to service errors.
pub const REQUEST_ID_HEADER: &str = ":request-id";

/// Error code used when an exception carries none.
const FALLBACK_ERROR_CODE: &str = "InternalError";

/// The value of the `:message-type` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageType {
    /// A data-bearing event.
    Event,
    /// A modeled service exception.
    Exception,
    /// An unmodeled service error.
    Error,
}

impl MessageType {
    /// Parse a `:message-type` value.
    #[must_use]
    pub fn from_wire(value: &str) -> Option<Self> {
        match value {
            "event" => Some(Self::Event),
            "exception" => Some(Self::Exception),
            "error" => Some(Self::Error),
            _ => None,
        }
    }

    /// The `:message-type` wire value.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Event => "event",
            Self::Exception => "exception",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A frame with its header block decoded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Message {
    /// Decoded headers.
    pub headers: Headers,
    /// Opaque payload.
    pub payload: Bytes,
}

impl Message {
    /// Create a message.
    pub fn new(headers: Headers, payload: impl Into<Bytes>) -> Self {
        Self {
            headers,
            payload: payload.into(),
        }
    }

    /// Decode the header block of `frame`.
    ///
    /// # Errors
    ///
    /// Returns [`EventStreamError::MalformedHeader`] if the header block is malformed.
    pub fn from_frame(frame: Frame) -> EventStreamResult<Self> {
        let headers = frame.decode_headers()?;
        Ok(Self {
            headers,
            payload: frame.payload,
        })
    }

    /// Create an `event` message.
    pub fn event(event_type: &str, content_type: Option<&str>, payload: impl Into<Bytes>) -> Self {
        let mut headers = Headers::new();
        headers.insert(MESSAGE_TYPE_HEADER, MessageType::Event.as_str());
        headers.insert(EVENT_TYPE_HEADER, event_type);
        if let Some(content_type) = content_type {
            headers.insert(CONTENT_TYPE_HEADER, content_type);
        }
        Self::new(headers, payload)
    }

    /// Create an `exception` message carrying `err`.
    #[must_use]
    pub fn exception(err: &S3Error) -> Self {
        let mut headers = Headers::new();
        headers.insert(MESSAGE_TYPE_HEADER, MessageType::Exception.as_str());
        headers.insert(ERROR_CODE_HEADER, err.code.as_str());
        headers.insert(ERROR_MESSAGE_HEADER, err.message.as_str());
        if let Some(request_id) = &err.request_id {
            headers.insert(REQUEST_ID_HEADER, request_id.as_str());
        }
        Self::new(headers, Bytes::new())
    }

    /// Classify this message by its `:message-type` header.
    ///
    /// # Errors
    ///
    /// Returns [`EventStreamError::MalformedHeader`] if the header is missing,
    /// not a string, or names an unknown message type.
    pub fn message_type(&self) -> EventStreamResult<MessageType> {
        let value = self.headers.get_str(MESSAGE_TYPE_HEADER).ok_or_else(|| {
            EventStreamError::malformed_header(format!(
                "missing or non-string {MESSAGE_TYPE_HEADER} header"
            ))
        })?;
        MessageType::from_wire(value).ok_or_else(|| {
            EventStreamError::malformed_header(format!("unknown message type '{value}'"))
        })
    }

    /// The `:event-type` header value, if present as a string.
    #[must_use]
    pub fn event_type(&self) -> Option<&str> {
        self.headers.get_str(EVENT_TYPE_HEADER)
    }

    /// The `:content-type` header value, if present as a string.
    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.headers.get_str(CONTENT_TYPE_HEADER)
    }

    /// Encode this message as a frame.
    ///
    /// # Errors
    ///
    /// See [`encode_frame`].
    pub fn encode(&self) -> EventStreamResult<Bytes> {
        encode_frame(&self.headers, &self.payload)
    }

    /// Build the service error carried by an `exception` or `error` message.
    fn into_service_error(self, message_type: MessageType) -> S3Error {
        let headers = &self.headers;
        let code = headers
            .get_str(ERROR_CODE_HEADER)
            .or_else(|| match message_type {
                MessageType::Exception => headers.get_str(EXCEPTION_TYPE_HEADER),
                _ => None,
            })
            .unwrap_or(FALLBACK_ERROR_CODE);

        let payload_text = (!self.payload.is_empty())
            .then(|| String::from_utf8_lossy(&self.payload).into_owned());
        let text = headers
            .get_str(ERROR_MESSAGE_HEADER)
            .map(str::to_owned)
            .or(payload_text);

        let mut err = S3Error::from_code(code, text.as_deref());
        if let Some(request_id) = headers.get_str(REQUEST_ID_HEADER) {
            err = err.with_request_id(request_id);
        }
        err
    }
}

/// A typed event union that messages can be dispatched into.
pub trait EventStreamModel: Sized + Send + 'static {
    /// Build the event named `event_type` from `message`.
    ///
    /// Names the model does not know must produce its catch-all variant, not
    /// an error.
    ///
    /// # Errors
    ///
    /// Returns [`EventStreamError::MalformedPayload`] if a known event's payload
    /// cannot be interpreted.
    fn from_event(event_type: &str, message: Message) -> EventStreamResult<Self>;

    /// Returns true if no event may follow this one.
    fn is_end(&self) -> bool;

    /// Returns true if this is the catch-all variant.
    fn is_unknown(&self) -> bool;
}

/// Route a message to its typed event.
///
/// # Errors
///
/// Returns [`EventStreamError::Service`] for `exception` and `error` messages,
/// [`EventStreamError::MalformedHeader`] for a missing or unknown message type
/// or a missing `:event-type`, and whatever the model returns for a payload it
/// rejects.
pub fn dispatch<E: EventStreamModel>(message: Message) -> EventStreamResult<E> {
    match message.message_type()? {
        MessageType::Event => {
            let event_type = message
                .event_type()
                .ok_or_else(|| {
                    EventStreamError::malformed_header(format!(
                        "event message without a string {EVENT_TYPE_HEADER} header"
                    ))
                })?
                .to_owned();
            let event = E::from_event(&event_type, message)?;
            if event.is_unknown() {
                warn!(event_type = %event_type, "delivering unrecognized event type");
            } else {
                debug!(event_type = %event_type, "dispatched event");
            }
            Ok(event)
        }
        message_type @ (MessageType::Exception | MessageType::Error) => {
            let err = message.into_service_error(message_type);
            debug!(
                message_type = %message_type,
                code = %err.code,
                "event stream ended by service error"
            );
            Err(EventStreamError::Service(err))
        }
    }
}

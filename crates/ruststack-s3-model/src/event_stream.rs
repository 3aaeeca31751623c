//! The `SelectObjectContent` event union.
//!
//! Every frame of a `SelectObjectContent` response body carries one of the
//! events below, identified on the wire by its `:event-type` header. Event
//! names the model does not know are preserved in
//! [`SelectObjectContentEventStream::Unknown`] so that service-added events
//! reach the caller instead of being dropped.

use bytes::Bytes;

use crate::types::{Progress, Stats};

/// A chunk of query result records.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RecordsEvent {
    /// Raw record bytes, in the output serialization format of the request.
    pub payload: Bytes,
}

/// Statistics about the completed query.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StatsEvent {
    /// The stats details.
    pub details: Stats,
}

/// Progress of a query that is still running.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProgressEvent {
    /// The progress details.
    pub details: Progress,
}

/// Keep-alive sent while the query produces no records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ContinuationEvent;

/// Marks the successful end of the stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EndEvent;

/// One event of a `SelectObjectContent` response stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectObjectContentEventStream {
    /// `Records` event.
    Records(RecordsEvent),
    /// `Stats` event.
    Stats(StatsEvent),
    /// `Progress` event.
    Progress(ProgressEvent),
    /// `Cont` event.
    Cont(ContinuationEvent),
    /// `End` event.
    End(EndEvent),
    /// An event type this model does not know.
    Unknown {
        /// The raw `:event-type` header value.
        event_type: String,
        /// The untouched frame payload.
        payload: Bytes,
    },
}

impl SelectObjectContentEventStream {
    /// Wire name of the `Records` event.
    pub const RECORDS: &str = "Records";
    /// Wire name of the `Stats` event.
    pub const STATS: &str = "Stats";
    /// Wire name of the `Progress` event.
    pub const PROGRESS: &str = "Progress";
    /// Wire name of the `Cont` event.
    pub const CONT: &str = "Cont";
    /// Wire name of the `End` event.
    pub const END: &str = "End";

    /// Every event name this model has a variant for.
    pub const KNOWN_EVENT_TYPES: [&str; 5] = [
        Self::RECORDS,
        Self::STATS,
        Self::PROGRESS,
        Self::CONT,
        Self::END,
    ];

    /// Returns the `:event-type` wire name of this event.
    #[must_use]
    pub fn event_type(&self) -> &str {
        match self {
            Self::Records(_) => Self::RECORDS,
            Self::Stats(_) => Self::STATS,
            Self::Progress(_) => Self::PROGRESS,
            Self::Cont(_) => Self::CONT,
            Self::End(_) => Self::END,
            Self::Unknown { event_type, .. } => event_type,
        }
    }

    /// Returns true if no event may follow this one.
    #[must_use]
    pub fn is_end(&self) -> bool {
        matches!(self, Self::End(_))
    }

    /// Returns true if this event type is not part of the model.
    #[must_use]
    pub fn is_unknown(&self) -> bool {
        matches!(self, Self::Unknown { .. })
    }

    /// Returns true if `event_type` names a variant of this model.
    #[must_use]
    pub fn is_known_event_type(event_type: &str) -> bool {
        Self::KNOWN_EVENT_TYPES.contains(&event_type)
    }

    /// Create a `Records` event.
    #[must_use]
    pub fn records(payload: impl Into<Bytes>) -> Self {
        Self::Records(RecordsEvent {
            payload: payload.into(),
        })
    }

    /// Create a `Stats` event.
    #[must_use]
    pub fn stats(details: Stats) -> Self {
        Self::Stats(StatsEvent { details })
    }

    /// Create a `Progress` event.
    #[must_use]
    pub fn progress(details: Progress) -> Self {
        Self::Progress(ProgressEvent { details })
    }

    /// Create an `End` event.
    #[must_use]
    pub fn end() -> Self {
        Self::End(EndEvent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_report_wire_names() {
        assert_eq!(
            SelectObjectContentEventStream::records("a").event_type(),
            "Records"
        );
        assert_eq!(
            SelectObjectContentEventStream::stats(Stats::default()).event_type(),
            "Stats"
        );
        assert_eq!(
            SelectObjectContentEventStream::Cont(ContinuationEvent).event_type(),
            "Cont"
        );
        assert_eq!(SelectObjectContentEventStream::end().event_type(), "End");

        let unknown = SelectObjectContentEventStream::Unknown {
            event_type: "Telemetry".to_owned(),
            payload: Bytes::new(),
        };
        assert_eq!(unknown.event_type(), "Telemetry");
        assert!(unknown.is_unknown());
    }

    #[test]
    fn test_should_only_treat_end_as_terminal() {
        assert!(SelectObjectContentEventStream::end().is_end());
        assert!(!SelectObjectContentEventStream::records("x").is_end());
        assert!(!SelectObjectContentEventStream::progress(Progress::default()).is_end());
    }

    #[test]
    fn test_should_recognize_known_event_types() {
        for name in SelectObjectContentEventStream::KNOWN_EVENT_TYPES {
            assert!(SelectObjectContentEventStream::is_known_event_type(name));
        }
        assert!(!SelectObjectContentEventStream::is_known_event_type("records"));
        assert!(!SelectObjectContentEventStream::is_known_event_type(""));
    }
}

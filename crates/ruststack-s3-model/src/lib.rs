//! S3 model types for `SelectObjectContent` event streams.
//!
//! Plain value types only: the event union delivered by the event-stream
//! decoder, the `Stats` / `Progress` details carried by those events, and the
//! single [`S3Error`] shape used for every service error code.

pub mod error;
pub mod event_stream;
pub mod types;

pub use error::{S3Error, S3ErrorCode};
pub use event_stream::{
    ContinuationEvent, EndEvent, ProgressEvent, RecordsEvent, SelectObjectContentEventStream,
    StatsEvent,
};
pub use types::{Progress, Stats};

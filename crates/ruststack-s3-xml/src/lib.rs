//! S3 XML payload codec for `RustStack` event streams.
//!
//! `SelectObjectContent` carries its `Stats` and `Progress` details as small
//! XML documents inside event-stream frames. This crate converts between those
//! documents and the model types.
//!
//! # Key components
//!
//! - [`S3Serialize`] trait and [`to_xml`] function for writing event payloads
//! - [`S3Deserialize`] trait and [`from_xml`] function for reading event payloads
//!
//! # S3 XML conventions
//!
//! - Namespace: `http://s3.amazonaws.com/doc/2006-03-01/`
//! - Counters: base-10 signed 64-bit integers
//! - XML declaration: `<?xml version="1.0" encoding="UTF-8"?>`

pub mod deserialize;
pub mod error;
pub mod serialize;

pub use deserialize::{S3Deserialize, from_xml};
pub use error::XmlError;
pub use serialize::{S3_NAMESPACE, S3Serialize, to_xml};

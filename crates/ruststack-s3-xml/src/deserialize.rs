//! S3 XML deserialization: parsing event payload XML into model types.
//!
//! This module provides the [`S3Deserialize`] trait and its implementations for the
//! `Stats` and `Progress` details carried by `SelectObjectContent` events.

use quick_xml::Reader;
use quick_xml::events::Event;
use ruststack_s3_model::types::{Progress, Stats};

use crate::error::XmlError;

/// Trait for deserializing S3 types from XML.
///
/// Implementors parse XML elements from the reader and populate the struct fields.
/// The root element has already been consumed by the caller; the implementation
/// reads child elements until the matching end tag.
pub trait S3Deserialize: Sized {
    /// Deserialize an instance from the given XML reader.
    ///
    /// The reader is positioned just after the opening tag of this element.
    /// The implementation should read all child content and return when
    /// the matching end tag is consumed.
    ///
    /// # Errors
    ///
    /// Returns `XmlError` if the XML is malformed or required fields are missing.
    fn deserialize_xml(reader: &mut Reader<&[u8]>) -> Result<Self, XmlError>;
}

/// Deserialize S3-compatible XML into a typed value.
///
/// Finds the root element and delegates to the type's `S3Deserialize` implementation.
///
/// # Errors
///
/// Returns `XmlError` if the XML is malformed or deserialization fails.
pub fn from_xml<T: S3Deserialize>(xml: &[u8]) -> Result<T, XmlError> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(true);

    // Skip the XML declaration and find the root element.
    loop {
        match reader.read_event()? {
            Event::Start(_) => {
                return T::deserialize_xml(&mut reader);
            }
            Event::Eof => {
                return Err(XmlError::MissingElement("root element".to_string()));
            }
            _ => {}
        }
    }
}

// ---------------------------------------------------------------------------
// Helper functions for reading common XML patterns
// ---------------------------------------------------------------------------

/// Read the text content of the current element and consume its end tag.
fn read_text_content(reader: &mut Reader<&[u8]>) -> Result<String, XmlError> {
    let mut text = String::new();
    loop {
        match reader.read_event()? {
            Event::Text(e) => {
                let decoded = e
                    .decode()
                    .map_err(|err| XmlError::ParseError(err.to_string()))?;
                let unescaped = quick_xml::escape::unescape(&decoded)
                    .map_err(|err| XmlError::ParseError(err.to_string()))?;
                text.push_str(&unescaped);
            }
            Event::End(_) => {
                return Ok(text);
            }
            Event::Eof => {
                return Err(XmlError::UnexpectedElement(
                    "unexpected EOF while reading text content".to_string(),
                ));
            }
            _ => {}
        }
    }
}

/// Skip over an element and all its children.
fn skip_element(reader: &mut Reader<&[u8]>) -> Result<(), XmlError> {
    let mut depth: u32 = 1;
    loop {
        match reader.read_event()? {
            Event::Start(_) => depth += 1,
            Event::End(_) => {
                depth -= 1;
                if depth == 0 {
                    return Ok(());
                }
            }
            Event::Eof => {
                return Err(XmlError::UnexpectedElement(
                    "unexpected EOF while skipping element".to_string(),
                ));
            }
            _ => {}
        }
    }
}

/// Parse an i64 from XML text.
fn parse_i64(s: &str) -> Result<i64, XmlError> {
    s.parse::<i64>()
        .map_err(|e| XmlError::ParseError(format!("invalid i64 '{s}': {e}")))
}

/// The three byte counters shared by `Stats` and `Progress`.
#[derive(Default)]
struct ByteCounters {
    scanned: Option<i64>,
    processed: Option<i64>,
    returned: Option<i64>,
}

fn deserialize_byte_counters(
    reader: &mut Reader<&[u8]>,
    element: &str,
) -> Result<ByteCounters, XmlError> {
    let mut counters = ByteCounters::default();

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                let name = e.name();
                let tag_name = std::str::from_utf8(name.as_ref())
                    .map_err(|e| XmlError::ParseError(e.to_string()))?;
                match tag_name {
                    "BytesScanned" => {
                        counters.scanned = Some(parse_i64(&read_text_content(reader)?)?);
                    }
                    "BytesProcessed" => {
                        counters.processed = Some(parse_i64(&read_text_content(reader)?)?);
                    }
                    "BytesReturned" => {
                        counters.returned = Some(parse_i64(&read_text_content(reader)?)?);
                    }
                    _ => skip_element(reader)?,
                }
            }
            Event::End(_) => break,
            Event::Eof => {
                return Err(XmlError::UnexpectedElement(format!(
                    "unexpected EOF in {element}"
                )));
            }
            _ => {}
        }
    }

    Ok(counters)
}

// ---------------------------------------------------------------------------
// S3Deserialize implementations
// ---------------------------------------------------------------------------

impl S3Deserialize for Stats {
    fn deserialize_xml(reader: &mut Reader<&[u8]>) -> Result<Self, XmlError> {
        let counters = deserialize_byte_counters(reader, "Stats")?;
        Ok(Stats {
            bytes_scanned: counters.scanned,
            bytes_processed: counters.processed,
            bytes_returned: counters.returned,
        })
    }
}

impl S3Deserialize for Progress {
    fn deserialize_xml(reader: &mut Reader<&[u8]>) -> Result<Self, XmlError> {
        let counters = deserialize_byte_counters(reader, "Progress")?;
        Ok(Progress {
            bytes_scanned: counters.scanned,
            bytes_processed: counters.processed,
            bytes_returned: counters.returned,
        })
    }
}

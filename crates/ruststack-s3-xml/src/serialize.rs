//! S3 XML serialization: writing model types as event payload XML.
//!
//! This module provides the [`S3Serialize`] trait and its implementations for the
//! `Stats` and `Progress` details carried by `SelectObjectContent` events.

use std::io::{self, Write};

use quick_xml::Writer;
use quick_xml::events::{BytesText, Event};
use ruststack_s3_model::types::{Progress, Stats};

use crate::error::XmlError;

/// The S3 XML namespace.
pub const S3_NAMESPACE: &str = "http://s3.amazonaws.com/doc/2006-03-01/";

/// Trait for serializing S3 types to XML.
///
/// Implementors write their content as child elements inside the current XML context.
/// The root element name and namespace are handled by the top-level [`to_xml`] function.
///
/// Uses `io::Result` because `quick_xml::Writer` closures require `io::Result<()>`.
pub trait S3Serialize {
    /// Serialize this value as XML child elements into the given writer.
    ///
    /// # Errors
    ///
    /// Returns `io::Error` if writing to the underlying writer fails.
    fn serialize_xml<W: Write>(&self, writer: &mut Writer<W>) -> io::Result<()>;
}

/// Serialize a value as S3-compatible XML with declaration and namespace.
///
/// # Errors
///
/// Returns `XmlError` if serialization fails.
pub fn to_xml<T: S3Serialize>(root_element: &str, value: &T) -> Result<Vec<u8>, XmlError> {
    let mut buf = Vec::with_capacity(256);
    let mut writer = Writer::new(&mut buf);

    writer.write_event(Event::Decl(quick_xml::events::BytesDecl::new(
        "1.0",
        Some("UTF-8"),
        None,
    )))?;

    writer
        .create_element(root_element)
        .with_attribute(("xmlns", S3_NAMESPACE))
        .write_inner_content(|w| value.serialize_xml(w))?;

    Ok(buf)
}

/// Write `<tag>value</tag>` for an optional i64.
fn write_optional_i64<W: Write>(
    writer: &mut Writer<W>,
    tag: &str,
    value: Option<i64>,
) -> io::Result<()> {
    if let Some(v) = value {
        writer
            .create_element(tag)
            .write_text_content(BytesText::new(&v.to_string()))?;
    }
    Ok(())
}

impl S3Serialize for Stats {
    fn serialize_xml<W: Write>(&self, writer: &mut Writer<W>) -> io::Result<()> {
        write_optional_i64(writer, "BytesScanned", self.bytes_scanned)?;
        write_optional_i64(writer, "BytesProcessed", self.bytes_processed)?;
        write_optional_i64(writer, "BytesReturned", self.bytes_returned)?;
        Ok(())
    }
}

impl S3Serialize for Progress {
    fn serialize_xml<W: Write>(&self, writer: &mut Writer<W>) -> io::Result<()> {
        write_optional_i64(writer, "BytesScanned", self.bytes_scanned)?;
        write_optional_i64(writer, "BytesProcessed", self.bytes_processed)?;
        write_optional_i64(writer, "BytesReturned", self.bytes_returned)?;
        Ok(())
    }
}

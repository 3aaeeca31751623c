//! Event-stream header block codec.
//!
//! A header block is a sequence of typed name/value pairs:
//!
//! ```text
//! +----------+------------+----------+---------------------------+
//! | name_len | name bytes | type tag | value (layout by type tag) |
//! |  1 byte  |  name_len  |  1 byte  |                           |
//! +----------+------------+----------+---------------------------+
//! ```
//!
//! | Tag | Type        | Value layout                        |
//! |-----|-------------|-------------------------------------|
//! | 0   | bool true   | none                                |
//! | 1   | bool false  | none                                |
//! | 2   | byte        | 1 byte, signed                      |
//! | 3   | int16       | 2 bytes, big-endian signed          |
//! | 4   | int32       | 4 bytes, big-endian signed          |
//! | 5   | int64       | 8 bytes, big-endian signed          |
//! | 6   | byte array  | u16 BE length, then bytes           |
//! | 7   | string      | u16 BE length, then UTF-8 bytes     |
//! | 8   | timestamp   | 8 bytes, BE signed epoch millis     |
//! | 9   | uuid        | 16 bytes                            |

use std::collections::HashMap;
use std::fmt;

use bytes::{Buf, BufMut, Bytes, BytesMut};
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::{EventStreamError, EventStreamResult};

/// Wire type tag of a header value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum HeaderType {
    /// Boolean `true`, no value bytes.
    BoolTrue = 0,
    /// Boolean `false`, no value bytes.
    BoolFalse = 1,
    /// Signed 8-bit integer.
    Byte = 2,
    /// Signed 16-bit integer.
    Int16 = 3,
    /// Signed 32-bit integer.
    Int32 = 4,
    /// Signed 64-bit integer.
    Int64 = 5,
    /// Length-prefixed opaque bytes.
    ByteArray = 6,
    /// Length-prefixed UTF-8 string.
    String = 7,
    /// Milliseconds since the Unix epoch.
    Timestamp = 8,
    /// 16-byte UUID.
    Uuid = 9,
}

impl HeaderType {
    /// Resolve a wire type tag.
    #[must_use]
    pub fn from_tag(tag: u8) -> Option<Self> {
        let header_type = match tag {
            0 => Self::BoolTrue,
            1 => Self::BoolFalse,
            2 => Self::Byte,
            3 => Self::Int16,
            4 => Self::Int32,
            5 => Self::Int64,
            6 => Self::ByteArray,
            7 => Self::String,
            8 => Self::Timestamp,
            9 => Self::Uuid,
            _ => return None,
        };
        Some(header_type)
    }

    /// The wire type tag.
    #[must_use]
    pub fn tag(self) -> u8 {
        self as u8
    }
}

/// A typed header value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeaderValue {
    /// Boolean (tags 0 and 1).
    Bool(bool),
    /// Signed byte.
    Byte(i8),
    /// Signed 16-bit integer.
    Int16(i16),
    /// Signed 32-bit integer.
    Int32(i32),
    /// Signed 64-bit integer.
    Int64(i64),
    /// Opaque bytes.
    ByteArray(Bytes),
    /// UTF-8 string.
    String(String),
    /// Milliseconds since the Unix epoch.
    Timestamp(i64),
    /// UUID.
    Uuid(Uuid),
}

impl HeaderValue {
    /// The wire type of this value.
    #[must_use]
    pub fn header_type(&self) -> HeaderType {
        match self {
            Self::Bool(true) => HeaderType::BoolTrue,
            Self::Bool(false) => HeaderType::BoolFalse,
            Self::Byte(_) => HeaderType::Byte,
            Self::Int16(_) => HeaderType::Int16,
            Self::Int32(_) => HeaderType::Int32,
            Self::Int64(_) => HeaderType::Int64,
            Self::ByteArray(_) => HeaderType::ByteArray,
            Self::String(_) => HeaderType::String,
            Self::Timestamp(_) => HeaderType::Timestamp,
            Self::Uuid(_) => HeaderType::Uuid,
        }
    }

    /// Returns the string if this is a string value.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the bytes if this is a byte-array value.
    #[must_use]
    pub fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            Self::ByteArray(b) => Some(b),
            _ => None,
        }
    }

    /// Returns the boolean if this is a boolean value.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns any integer value widened to `i64`.
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Byte(v) => Some(i64::from(*v)),
            Self::Int16(v) => Some(i64::from(*v)),
            Self::Int32(v) => Some(i64::from(*v)),
            Self::Int64(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the timestamp as a UTC date-time, if it is representable.
    #[must_use]
    pub fn as_timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Timestamp(millis) => DateTime::from_timestamp_millis(*millis),
            _ => None,
        }
    }

    /// Returns the UUID if this is a UUID value.
    #[must_use]
    pub fn as_uuid(&self) -> Option<Uuid> {
        match self {
            Self::Uuid(u) => Some(*u),
            _ => None,
        }
    }

    /// Encoded size of the type tag and value.
    fn encoded_len(&self) -> usize {
        1 + match self {
            Self::Bool(_) => 0,
            Self::Byte(_) => 1,
            Self::Int16(_) => 2,
            Self::Int32(_) => 4,
            Self::Int64(_) | Self::Timestamp(_) => 8,
            Self::ByteArray(b) => 2 + b.len(),
            Self::String(s) => 2 + s.len(),
            Self::Uuid(_) => 16,
        }
    }
}

impl fmt::Display for HeaderValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(v) => write!(f, "{v}"),
            Self::Byte(v) => write!(f, "{v}"),
            Self::Int16(v) => write!(f, "{v}"),
            Self::Int32(v) => write!(f, "{v}"),
            Self::Int64(v) | Self::Timestamp(v) => write!(f, "{v}"),
            Self::ByteArray(b) => write!(f, "<{} bytes>", b.len()),
            Self::String(s) => f.write_str(s),
            Self::Uuid(u) => write!(f, "{u}"),
        }
    }
}

impl From<&str> for HeaderValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_owned())
    }
}

impl From<String> for HeaderValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<bool> for HeaderValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i8> for HeaderValue {
    fn from(value: i8) -> Self {
        Self::Byte(value)
    }
}

impl From<i16> for HeaderValue {
    fn from(value: i16) -> Self {
        Self::Int16(value)
    }
}

impl From<i32> for HeaderValue {
    fn from(value: i32) -> Self {
        Self::Int32(value)
    }
}

impl From<i64> for HeaderValue {
    fn from(value: i64) -> Self {
        Self::Int64(value)
    }
}

impl From<Bytes> for HeaderValue {
    fn from(value: Bytes) -> Self {
        Self::ByteArray(value)
    }
}

impl From<Uuid> for HeaderValue {
    fn from(value: Uuid) -> Self {
        Self::Uuid(value)
    }
}

impl From<DateTime<Utc>> for HeaderValue {
    fn from(value: DateTime<Utc>) -> Self {
        Self::Timestamp(value.timestamp_millis())
    }
}

/// A decoded header block.
///
/// Lookups are by exact, case-sensitive name. When a name is inserted twice
/// the later value replaces the earlier one in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: Vec<(String, HeaderValue)>,
    index: HashMap<String, usize>,
}

impl Headers {
    /// Create an empty header set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a header, returning the value it replaced.
    pub fn insert(
        &mut self,
        name: impl Into<String>,
        value: impl Into<HeaderValue>,
    ) -> Option<HeaderValue> {
        let name = name.into();
        let value = value.into();
        if let Some(&pos) = self.index.get(&name) {
            return Some(std::mem::replace(&mut self.entries[pos].1, value));
        }
        self.index.insert(name.clone(), self.entries.len());
        self.entries.push((name, value));
        None
    }

    /// Look up a header by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&HeaderValue> {
        self.index.get(name).map(|&pos| &self.entries[pos].1)
    }

    /// Look up a header whose value is a string.
    ///
    /// Returns `None` if the header is absent or has another type.
    #[must_use]
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(HeaderValue::as_str)
    }

    /// Returns true if a header with this name is present.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Number of distinct header names.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if there are no headers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over headers in first-insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &HeaderValue)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v))
    }

    /// Size of the encoded header block.
    #[must_use]
    pub fn encoded_len(&self) -> usize {
        self.entries
            .iter()
            .map(|(name, value)| 1 + name.len() + value.encoded_len())
            .sum()
    }

    /// Encode the header block into `dst`.
    ///
    /// # Errors
    ///
    /// Returns [`EventStreamError::MalformedHeader`] if a name is empty or longer
    /// than 255 bytes, or a byte-array or string value exceeds 65535 bytes.
    pub fn encode_into(&self, dst: &mut BytesMut) -> EventStreamResult<()> {
        dst.reserve(self.encoded_len());
        for (name, value) in &self.entries {
            let name_len = u8::try_from(name.len())
                .ok()
                .filter(|len| *len > 0)
                .ok_or_else(|| {
                    EventStreamError::malformed_header(format!(
                        "header name must be 1 to 255 bytes, got {}",
                        name.len()
                    ))
                })?;
            dst.put_u8(name_len);
            dst.put_slice(name.as_bytes());
            dst.put_u8(value.header_type().tag());
            match value {
                HeaderValue::Bool(_) => {}
                HeaderValue::Byte(v) => dst.put_i8(*v),
                HeaderValue::Int16(v) => dst.put_i16(*v),
                HeaderValue::Int32(v) => dst.put_i32(*v),
                HeaderValue::Int64(v) | HeaderValue::Timestamp(v) => dst.put_i64(*v),
                HeaderValue::ByteArray(b) => put_length_prefixed(dst, name, b)?,
                HeaderValue::String(s) => put_length_prefixed(dst, name, s.as_bytes())?,
                HeaderValue::Uuid(u) => dst.put_slice(u.as_bytes()),
            }
        }
        Ok(())
    }

    /// Encode the header block into a new buffer.
    ///
    /// # Errors
    ///
    /// See [`Headers::encode_into`].
    pub fn encode(&self) -> EventStreamResult<Bytes> {
        let mut buf = BytesMut::with_capacity(self.encoded_len());
        self.encode_into(&mut buf)?;
        Ok(buf.freeze())
    }
}

impl<N, V> FromIterator<(N, V)> for Headers
where
    N: Into<String>,
    V: Into<HeaderValue>,
{
    fn from_iter<I: IntoIterator<Item = (N, V)>>(iter: I) -> Self {
        let mut headers = Self::new();
        for (name, value) in iter {
            headers.insert(name, value);
        }
        headers
    }
}

fn put_length_prefixed(dst: &mut BytesMut, name: &str, value: &[u8]) -> EventStreamResult<()> {
    let len = u16::try_from(value.len()).map_err(|_| {
        EventStreamError::malformed_header(format!(
            "value of header '{name}' is {} bytes, above the 65535 byte limit",
            value.len()
        ))
    })?;
    dst.put_u16(len);
    dst.put_slice(value);
    Ok(())
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

/// Decode a complete header block.
///
/// Byte-array values are zero-copy slices of `block`.
///
/// # Errors
///
/// Returns [`EventStreamError::MalformedHeader`] if a header is truncated, has
/// an empty or non-UTF-8 name, an unknown type tag, or a non-UTF-8 string value.
pub fn decode_headers(block: Bytes) -> EventStreamResult<Headers> {
    let mut buf = block;
    let mut headers = Headers::new();
    while buf.has_remaining() {
        let (name, value) = decode_header(&mut buf)?;
        headers.insert(name, value);
    }
    Ok(headers)
}

fn decode_header(buf: &mut Bytes) -> EventStreamResult<(String, HeaderValue)> {
    let name_len = usize::from(buf.get_u8());
    if name_len == 0 {
        return Err(EventStreamError::malformed_header("header name is empty"));
    }
    ensure_remaining(buf, name_len, "header name")?;
    let raw_name = buf.split_to(name_len);
    let name = std::str::from_utf8(&raw_name)
        .map_err(|e| EventStreamError::malformed_header(format!("header name is not UTF-8: {e}")))?
        .to_owned();

    ensure_remaining(buf, 1, &name)?;
    let tag = buf.get_u8();
    let header_type = HeaderType::from_tag(tag).ok_or_else(|| {
        EventStreamError::malformed_header(format!("unknown type tag {tag} for header '{name}'"))
    })?;

    let value = match header_type {
        HeaderType::BoolTrue => HeaderValue::Bool(true),
        HeaderType::BoolFalse => HeaderValue::Bool(false),
        HeaderType::Byte => {
            ensure_remaining(buf, 1, &name)?;
            HeaderValue::Byte(buf.get_i8())
        }
        HeaderType::Int16 => {
            ensure_remaining(buf, 2, &name)?;
            HeaderValue::Int16(buf.get_i16())
        }
        HeaderType::Int32 => {
            ensure_remaining(buf, 4, &name)?;
            HeaderValue::Int32(buf.get_i32())
        }
        HeaderType::Int64 => {
            ensure_remaining(buf, 8, &name)?;
            HeaderValue::Int64(buf.get_i64())
        }
        HeaderType::Timestamp => {
            ensure_remaining(buf, 8, &name)?;
            HeaderValue::Timestamp(buf.get_i64())
        }
        HeaderType::ByteArray => HeaderValue::ByteArray(split_length_prefixed(buf, &name)?),
        HeaderType::String => {
            let raw = split_length_prefixed(buf, &name)?;
            let value = std::str::from_utf8(&raw).map_err(|e| {
                EventStreamError::malformed_header(format!(
                    "string value of header '{name}' is not UTF-8: {e}"
                ))
            })?;
            HeaderValue::String(value.to_owned())
        }
        HeaderType::Uuid => {
            ensure_remaining(buf, 16, &name)?;
            let mut raw = [0u8; 16];
            buf.copy_to_slice(&mut raw);
            HeaderValue::Uuid(Uuid::from_bytes(raw))
        }
    };

    Ok((name, value))
}

fn split_length_prefixed(buf: &mut Bytes, name: &str) -> EventStreamResult<Bytes> {
    ensure_remaining(buf, 2, name)?;
    let len = usize::from(buf.get_u16());
    ensure_remaining(buf, len, name)?;
    Ok(buf.split_to(len))
}

fn ensure_remaining(buf: &Bytes, needed: usize, context: &str) -> EventStreamResult<()> {
    if buf.remaining() < needed {
        return Err(EventStreamError::malformed_header(format!(
            "'{context}' needs {needed} more bytes but the header block has {}",
            buf.remaining()
        )));
    }
    Ok(())
}

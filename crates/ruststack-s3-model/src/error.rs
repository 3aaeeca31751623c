//! S3 error codes and the S3 error value.
//!
//! Every service error, whether returned in an HTTP error body or delivered
//! mid-stream as an event-stream `exception` message, is represented by one
//! [`S3Error`] carrying an [`S3ErrorCode`].

use std::fmt;

/// Well-known S3 error codes.
///
/// Codes that are not listed here are kept verbatim in [`S3ErrorCode::Custom`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
#[non_exhaustive]
pub enum S3ErrorCode {
    /// Default error code.
    #[default]
    /// InternalError error.
    InternalError,
    /// AccessDenied error.
    AccessDenied,
    /// BusyCsv error.
    BusyCsv,
    /// CastFailed error.
    CastFailed,
    /// CSVParsingError error.
    CSVParsingError,
    /// ExpressionTooLong error.
    ExpressionTooLong,
    /// InvalidArgument error.
    InvalidArgument,
    /// InvalidCompressionFormat error.
    InvalidCompressionFormat,
    /// InvalidDataType error.
    InvalidDataType,
    /// InvalidExpressionType error.
    InvalidExpressionType,
    /// InvalidFileHeaderInfo error.
    InvalidFileHeaderInfo,
    /// InvalidJsonType error.
    InvalidJsonType,
    /// InvalidQuoteFields error.
    InvalidQuoteFields,
    /// InvalidRequest error.
    InvalidRequest,
    /// InvalidTextEncoding error.
    InvalidTextEncoding,
    /// JSONParsingError error.
    JSONParsingError,
    /// MissingRequiredParameter error.
    MissingRequiredParameter,
    /// NoSuchBucket error.
    NoSuchBucket,
    /// NoSuchKey error.
    NoSuchKey,
    /// ObjectSerializationConflict error.
    ObjectSerializationConflict,
    /// OverMaxColumn error.
    OverMaxColumn,
    /// OverMaxRecordSize error.
    OverMaxRecordSize,
    /// ParseSyntaxError error.
    ParseSyntaxError,
    /// SlowDown error.
    SlowDown,
    /// UnsupportedSyntax error.
    UnsupportedSyntax,
    /// A custom error code not in the standard set.
    Custom(String),
}

impl S3ErrorCode {
    /// Resolve an error code string as sent by the service.
    ///
    /// Unrecognized codes are preserved in [`S3ErrorCode::Custom`].
    #[must_use]
    pub fn from_code(code: &str) -> Self {
        match code {
            "InternalError" => Self::InternalError,
            "AccessDenied" => Self::AccessDenied,
            "BusyCsv" => Self::BusyCsv,
            "CastFailed" => Self::CastFailed,
            "CSVParsingError" => Self::CSVParsingError,
            "ExpressionTooLong" => Self::ExpressionTooLong,
            "InvalidArgument" => Self::InvalidArgument,
            "InvalidCompressionFormat" => Self::InvalidCompressionFormat,
            "InvalidDataType" => Self::InvalidDataType,
            "InvalidExpressionType" => Self::InvalidExpressionType,
            "InvalidFileHeaderInfo" => Self::InvalidFileHeaderInfo,
            "InvalidJsonType" => Self::InvalidJsonType,
            "InvalidQuoteFields" => Self::InvalidQuoteFields,
            "InvalidRequest" => Self::InvalidRequest,
            "InvalidTextEncoding" => Self::InvalidTextEncoding,
            "JSONParsingError" => Self::JSONParsingError,
            "MissingRequiredParameter" => Self::MissingRequiredParameter,
            "NoSuchBucket" => Self::NoSuchBucket,
            "NoSuchKey" => Self::NoSuchKey,
            "ObjectSerializationConflict" => Self::ObjectSerializationConflict,
            "OverMaxColumn" => Self::OverMaxColumn,
            "OverMaxRecordSize" => Self::OverMaxRecordSize,
            "ParseSyntaxError" => Self::ParseSyntaxError,
            "SlowDown" => Self::SlowDown,
            "UnsupportedSyntax" => Self::UnsupportedSyntax,
            other => Self::Custom(other.to_owned()),
        }
    }

    /// Returns the error code as a string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::InternalError => "InternalError",
            Self::AccessDenied => "AccessDenied",
            Self::BusyCsv => "BusyCsv",
            Self::CastFailed => "CastFailed",
            Self::CSVParsingError => "CSVParsingError",
            Self::ExpressionTooLong => "ExpressionTooLong",
            Self::InvalidArgument => "InvalidArgument",
            Self::InvalidCompressionFormat => "InvalidCompressionFormat",
            Self::InvalidDataType => "InvalidDataType",
            Self::InvalidExpressionType => "InvalidExpressionType",
            Self::InvalidFileHeaderInfo => "InvalidFileHeaderInfo",
            Self::InvalidJsonType => "InvalidJsonType",
            Self::InvalidQuoteFields => "InvalidQuoteFields",
            Self::InvalidRequest => "InvalidRequest",
            Self::InvalidTextEncoding => "InvalidTextEncoding",
            Self::JSONParsingError => "JSONParsingError",
            Self::MissingRequiredParameter => "MissingRequiredParameter",
            Self::NoSuchBucket => "NoSuchBucket",
            Self::NoSuchKey => "NoSuchKey",
            Self::ObjectSerializationConflict => "ObjectSerializationConflict",
            Self::OverMaxColumn => "OverMaxColumn",
            Self::OverMaxRecordSize => "OverMaxRecordSize",
            Self::ParseSyntaxError => "ParseSyntaxError",
            Self::SlowDown => "SlowDown",
            Self::UnsupportedSyntax => "UnsupportedSyntax",
            Self::Custom(s) => s,
        }
    }

    /// Returns the default message for this error.
    #[must_use]
    pub fn default_message(&self) -> &str {
        match self {
            Self::InternalError => "Internal server error",
            Self::AccessDenied => "Access Denied",
            Self::BusyCsv => "The CSV file is too busy to be processed",
            Self::CastFailed => "Attempt to convert from one data type to another failed",
            Self::CSVParsingError => "Encountered an error parsing the CSV file",
            Self::ExpressionTooLong => "The SQL expression is too long",
            Self::InvalidArgument => "Invalid Argument",
            Self::InvalidCompressionFormat => "The file is not in a supported compression format",
            Self::InvalidDataType => "The SQL expression contains an invalid data type",
            Self::InvalidExpressionType => "The ExpressionType value is not valid",
            Self::InvalidFileHeaderInfo => "The FileHeaderInfo value is not valid",
            Self::InvalidJsonType => "The JsonType value is not valid",
            Self::InvalidQuoteFields => "The QuoteFields value is not valid",
            Self::InvalidRequest => "Invalid Request",
            Self::InvalidTextEncoding => "Invalid encoding type",
            Self::JSONParsingError => "Encountered an error parsing the JSON file",
            Self::MissingRequiredParameter => "The request is missing a required parameter",
            Self::NoSuchBucket => "The specified bucket does not exist",
            Self::NoSuchKey => "The specified key does not exist",
            Self::ObjectSerializationConflict => {
                "InputSerialization specifies more than one format"
            }
            Self::OverMaxColumn => "The number of columns in the result is greater than allowed",
            Self::OverMaxRecordSize => "The length of a record exceeds the maximum allowed",
            Self::ParseSyntaxError => "The SQL expression could not be parsed",
            Self::SlowDown => "Please reduce your request rate",
            Self::UnsupportedSyntax => "The SQL expression contains unsupported syntax",
            Self::Custom(s) => s,
        }
    }
}

impl fmt::Display for S3ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An S3 error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct S3Error {
    /// The error code.
    pub code: S3ErrorCode,
    /// A human-readable error message.
    pub message: String,
    /// The request ID.
    pub request_id: Option<String>,
}

impl fmt::Display for S3Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "S3Error({}): {}", self.code, self.message)
    }
}

impl std::error::Error for S3Error {}

impl S3Error {
    /// Create a new S3Error from an error code.
    #[must_use]
    pub fn new(code: S3ErrorCode) -> Self {
        let message = code.default_message().to_owned();
        Self {
            code,
            message,
            request_id: None,
        }
    }

    /// Create a new S3Error with a custom message.
    #[must_use]
    pub fn with_message(code: S3ErrorCode, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code,
            request_id: None,
        }
    }

    /// Create an S3Error from a wire error code and an optional message.
    ///
    /// Falls back to the code's default message when `message` is absent or empty.
    #[must_use]
    pub fn from_code(code: &str, message: Option<&str>) -> Self {
        let code = S3ErrorCode::from_code(code);
        match message {
            Some(m) if !m.is_empty() => Self::with_message(code, m),
            _ => Self::new(code),
        }
    }

    /// Set the request ID.
    #[must_use]
    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }
}

/// Create an S3Error from an error code.
///
/// # Examples
///
/// ```
/// use ruststack_s3_model::s3_error;
/// use ruststack_s3_model::error::S3ErrorCode;
///
/// let err = s3_error!(NoSuchKey);
/// assert_eq!(err.code, S3ErrorCode::NoSuchKey);
///
/// let err = s3_error!(CSVParsingError, "bad quote at line 3");
/// assert_eq!(err.message, "bad quote at line 3");
/// ```
#[macro_export]
macro_rules! s3_error {
    ($code:ident) => {
        $crate::error::S3Error::new($crate::error::S3ErrorCode::$code)
    };
    ($code:ident, $msg:expr) => {
        $crate::error::S3Error::with_message($crate::error::S3ErrorCode::$code, $msg)
    };
}

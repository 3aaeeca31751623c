//! Shared S3 structures carried inside `SelectObjectContent` events.

use serde::{Deserialize, Serialize};

/// S3 Stats structure.
///
/// Sent once near the end of a `SelectObjectContent` response.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Stats {
    /// The total number of object bytes scanned.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bytes_scanned: Option<i64>,
    /// The total number of uncompressed object bytes processed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bytes_processed: Option<i64>,
    /// The total number of bytes of records payload data returned.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bytes_returned: Option<i64>,
}

/// S3 Progress structure.
///
/// Sent periodically when the request asked for progress reporting.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Progress {
    /// The current number of object bytes scanned.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bytes_scanned: Option<i64>,
    /// The current number of uncompressed object bytes processed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bytes_processed: Option<i64>,
    /// The current number of bytes of records payload data returned.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bytes_returned: Option<i64>,
}

//! Event-stream decoder configuration.
//!
//! Provides [`EventStreamConfig`] for tuning the frame reader and the stream
//! controller. Configuration values are loaded from environment variables.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

use crate::frame::FrameLimits;

/// Default upper bound on a single frame's total length (16 MiB).
pub const DEFAULT_MAX_FRAME_SIZE: usize = 16 * 1024 * 1024;

/// Default upper bound on a single frame's header block (128 KiB).
pub const DEFAULT_MAX_HEADER_BLOCK_SIZE: usize = 128 * 1024;

/// Default number of bytes requested from the byte source per read.
pub const DEFAULT_READ_CHUNK_SIZE: usize = 8 * 1024;

/// Event-stream decoder configuration.
///
/// All fields have defaults suitable for S3 Select response bodies.
/// Configuration can be loaded from environment variables via
/// [`EventStreamConfig::from_env`].
///
/// # Examples
///
/// ```
/// use ruststack_s3_eventstream::config::EventStreamConfig;
///
/// let config = EventStreamConfig::default();
/// assert_eq!(config.max_frame_size, 16 * 1024 * 1024);
/// assert!(!config.require_end_event);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, TypedBuilder)]
#[serde(rename_all = "camelCase")]
pub struct EventStreamConfig {
    /// Largest accepted frame total length, in bytes.
    #[builder(default = DEFAULT_MAX_FRAME_SIZE)]
    pub max_frame_size: usize,

    /// Largest accepted header block, in bytes.
    #[builder(default = DEFAULT_MAX_HEADER_BLOCK_SIZE)]
    pub max_header_block_size: usize,

    /// Upper bound on the bytes requested from the source in one read.
    #[builder(default = DEFAULT_READ_CHUNK_SIZE)]
    pub read_chunk_size: usize,

    /// Per-read timeout in milliseconds. `None` waits indefinitely.
    #[builder(default, setter(strip_option))]
    pub read_timeout_ms: Option<u64>,

    /// Whether a clean end of input without an `End` event is an error.
    #[builder(default = false)]
    pub require_end_event: bool,

    /// Log level filter string (e.g. `"info"`, `"debug"`).
    #[builder(default = String::from("info"))]
    pub log_level: String,
}

impl Default for EventStreamConfig {
    fn default() -> Self {
        Self {
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
            max_header_block_size: DEFAULT_MAX_HEADER_BLOCK_SIZE,
            read_chunk_size: DEFAULT_READ_CHUNK_SIZE,
            read_timeout_ms: None,
            require_end_event: false,
            log_level: String::from("info"),
        }
    }
}

impl EventStreamConfig {
    /// Load configuration from environment variables.
    ///
    /// Reads the following environment variables (falling back to defaults):
    ///
    /// | Variable | Default |
    /// |----------|---------|
    /// | `EVENTSTREAM_MAX_FRAME_SIZE` | `16777216` |
    /// | `EVENTSTREAM_MAX_HEADER_SIZE` | `131072` |
    /// | `EVENTSTREAM_READ_CHUNK_SIZE` | `8192` |
    /// | `EVENTSTREAM_READ_TIMEOUT_MS` | unset (no timeout) |
    /// | `EVENTSTREAM_REQUIRE_END_EVENT` | `false` |
    /// | `LOG_LEVEL` | `info` |
    ///
    /// Values that fail to parse, and zero sizes, are ignored.
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(n) = env_usize("EVENTSTREAM_MAX_FRAME_SIZE") {
            config.max_frame_size = n;
        }
        if let Some(n) = env_usize("EVENTSTREAM_MAX_HEADER_SIZE") {
            config.max_header_block_size = n;
        }
        if let Some(n) = env_usize("EVENTSTREAM_READ_CHUNK_SIZE") {
            config.read_chunk_size = n;
        }
        if let Ok(v) = std::env::var("EVENTSTREAM_READ_TIMEOUT_MS") {
            if let Ok(ms) = v.parse::<u64>() {
                config.read_timeout_ms = Some(ms);
            }
        }
        if let Ok(v) = std::env::var("EVENTSTREAM_REQUIRE_END_EVENT") {
            config.require_end_event = parse_bool(&v);
        }
        if let Ok(v) = std::env::var("LOG_LEVEL") {
            config.log_level = v;
        }

        config
    }

    /// The per-read timeout, if one is configured.
    #[must_use]
    pub fn read_timeout(&self) -> Option<Duration> {
        self.read_timeout_ms.map(Duration::from_millis)
    }

    /// The frame size limits enforced by the frame reader.
    #[must_use]
    pub fn limits(&self) -> FrameLimits {
        FrameLimits {
            max_frame_size: self.max_frame_size,
            max_header_block_size: self.max_header_block_size,
        }
    }
}

/// Read a positive size from the environment.
fn env_usize(key: &str) -> Option<usize> {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<usize>().ok())
        .filter(|n| *n > 0)
}

/// Parse a string as a boolean, accepting `"1"` and `"true"` (case-insensitive).
fn parse_bool(value: &str) -> bool {
    value == "1" || value.eq_ignore_ascii_case("true")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_create_default_config() {
        let config = EventStreamConfig::default();
        assert_eq!(config.max_frame_size, 16_777_216);
        assert_eq!(config.max_header_block_size, 131_072);
        assert_eq!(config.read_chunk_size, 8192);
        assert!(config.read_timeout_ms.is_none());
        assert!(config.read_timeout().is_none());
        assert!(!config.require_end_event);
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn test_should_load_from_env() {
        let config = EventStreamConfig::from_env();
        assert!(config.max_frame_size > 0);
        assert!(config.read_chunk_size > 0);
    }

    #[test]
    fn test_should_build_with_typed_builder() {
        let config = EventStreamConfig::builder()
            .max_frame_size(1024)
            .max_header_block_size(256)
            .read_chunk_size(7)
            .read_timeout_ms(250)
            .require_end_event(true)
            .log_level("debug".into())
            .build();

        assert_eq!(config.max_frame_size, 1024);
        assert_eq!(config.max_header_block_size, 256);
        assert_eq!(config.read_chunk_size, 7);
        assert_eq!(config.read_timeout(), Some(Duration::from_millis(250)));
        assert!(config.require_end_event);
        assert_eq!(config.log_level, "debug");
    }

    #[test]
    fn test_should_derive_frame_limits() {
        let config = EventStreamConfig::builder()
            .max_frame_size(4096)
            .max_header_block_size(512)
            .build();
        let limits = config.limits();
        assert_eq!(limits.max_frame_size, 4096);
        assert_eq!(limits.max_header_block_size, 512);
    }

    #[test]
    fn test_should_serialize_to_camel_case_json() {
        let config = EventStreamConfig::default();
        let json = serde_json::to_string(&config).expect("test serialization");
        assert!(json.contains("maxFrameSize"));
        assert!(json.contains("requireEndEvent"));
    }

    #[test]
    fn test_should_parse_bool_values() {
        assert!(parse_bool("1"));
        assert!(parse_bool("true"));
        assert!(parse_bool("TRUE"));
        assert!(!parse_bool("0"));
        assert!(!parse_bool("false"));
        assert!(!parse_bool(""));
    }
}

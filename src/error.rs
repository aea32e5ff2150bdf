//! Error types for the AIN monitor
//!
//! This module defines all error types used throughout the library.

use thiserror::Error;

/// Result type alias for monitor operations
pub type Result<T> = std::result::Result<T, MonitorError>;

/// Main error type for monitor operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MonitorError {
    /// Request body could not be read as a flat key/value object
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// A single configuration field carried an unusable value
    #[error("Invalid value for '{key}': {reason}")]
    InvalidField { key: String, reason: String },

    /// Payload could not be rendered
    #[error("Payload error: {0}")]
    Payload(String),

    /// Persisted configuration record error
    #[error("Config record error: {0}")]
    Record(#[from] RecordError),

    /// Config store I/O error
    #[error("Storage error: {0}")]
    Storage(String),
}

impl MonitorError {
    /// Shorthand for a rejected configuration field
    pub fn invalid_field(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidField {
            key: key.into(),
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for MonitorError {
    fn from(err: serde_json::Error) -> Self {
        Self::Payload(err.to_string())
    }
}

/// Errors while decoding a persisted configuration record
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RecordError {
    /// Buffer too short
    #[error("Buffer too short: need at least {needed} bytes, got {available}")]
    BufferTooShort { needed: usize, available: usize },

    /// Wrong magic bytes
    #[error("Invalid magic bytes")]
    InvalidMagic,

    /// Unknown record format version
    #[error("Unsupported record version: {0}")]
    UnsupportedVersion(u16),

    /// Body length does not match header
    #[error("Length mismatch: header says {declared} bytes, found {actual}")]
    LengthMismatch { declared: usize, actual: usize },

    /// Invalid checksum
    #[error("Invalid checksum: expected {expected:08x}, got {actual:08x}")]
    InvalidChecksum { expected: u32, actual: u32 },

    /// Body decoded but is not a usable configuration
    #[error("Malformed record: {0}")]
    Malformed(String),
}

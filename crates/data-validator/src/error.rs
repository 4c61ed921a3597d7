//! Validation Error Types

use thiserror::Error;

/// Errors raised by malformed samples, channels, or windows
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    /// Phase channels do not share one length
    #[error("Channel length mismatch: R={r}, S={s}, T={t}")]
    ChannelLengthMismatch { r: usize, s: usize, t: usize },

    /// Timestamps do not line up with the channels
    #[error("Timestamp count {timestamps} does not match channel length {samples}")]
    TimestampMismatch { samples: usize, timestamps: usize },

    /// Value out of allowed range
    #[error("{field} value {value} at index {index} is out of range [{min}, {max}]")]
    OutOfRange {
        field: &'static str,
        index: usize,
        value: f64,
        min: f64,
        max: f64,
    },

    /// Value is NaN or infinite
    #[error("{field} contains a non-finite value at index {index}")]
    NonFinite { field: &'static str, index: usize },

    /// Not enough samples for the requested operation
    #[error("Insufficient samples: need at least {required}, got {actual}")]
    InsufficientSamples { required: usize, actual: usize },

    /// Vector length differs from the expected dimension
    #[error("Dimension mismatch for {field}: expected {expected}, got {actual}")]
    DimensionMismatch {
        field: &'static str,
        expected: usize,
        actual: usize,
    },

    /// Missing required field
    #[error("Missing required field: {0}")]
    MissingField(&'static str),
}

/// Invalid windowing or batching configuration. Fatal before any stage starts.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("Window size must be positive")]
    ZeroWindowSize,

    #[error("Overlap ratio {0} is outside [0, 1)")]
    OverlapOutOfRange(f64),

    /// step = floor(window_size * (1 - overlap_ratio)) came out below one sample
    #[error("Step size for window {window_size} with overlap {overlap_ratio} is not a positive integer")]
    NonPositiveStep {
        window_size: usize,
        overlap_ratio: f64,
    },

    #[error("Windows per batch must be positive")]
    ZeroWindowsPerBatch,

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

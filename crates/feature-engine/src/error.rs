//! Feature Extraction Error Types

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum FeatureError {
    /// Assembled vector length differs from the schema target
    #[error("Schema mismatch: expected {expected} features, assembled {actual}")]
    SchemaMismatch { expected: usize, actual: usize },

    /// Schema names a field the extractor never produces
    #[error("Schema field {group}.{field} is not produced by the extractor")]
    UndeclaredField { group: &'static str, field: String },

    #[error("Window is empty")]
    EmptyWindow,

    #[error("Phase channel lengths differ: A={a}, B={b}, C={c}")]
    ChannelLengthMismatch { a: usize, b: usize, c: usize },

    #[error("Invalid filter band {low_hz}-{high_hz} Hz at sample rate {sample_rate} Hz")]
    InvalidBand {
        low_hz: f64,
        high_hz: f64,
        sample_rate: f64,
    },

    #[error("Unsupported filter order {0}: must be a positive even number")]
    UnsupportedOrder(usize),

    #[error("Feature {group}.{field} is not finite")]
    NonFinite { group: &'static str, field: String },
}

//! Inference Engine
//!
//! One abstract predictive-model capability shared by the autoencoder and the
//! two temporal forecasters, the process-wide load-once artifact cache, and
//! the construction of fixed-length temporal sequences.

mod cache;
mod forecast;
mod mock;
mod model;
mod sequence;

pub use cache::{ArtifactLoader, FileArtifactLoader, ModelArtifacts, ModelCache};
pub use forecast::{Forecast, ForecastMetadata, RollingForecaster};
pub use mock::{MockAutoencoder, MockForecaster};
pub use model::{
    Component, ComponentOutput, ModelInput, ModelKind, ModelOutput, PredictiveModel,
    Reconstruction,
};
pub use sequence::{Sequence, SequenceBuilder, SequenceStrategy, SEQUENCE_LENGTH};

use data_validator::ValidationError;
use thiserror::Error;

/// Errors during inference
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InferenceError {
    #[error("Model load failed: {0}")]
    ModelLoadError(String),
    #[error("Inference failed: {0}")]
    InferenceFailed(String),
    #[error("Invalid input shape: expected {expected}, got {actual}")]
    InvalidInputShape { expected: usize, actual: usize },
    #[error("{model} returned an unexpected output, expected {expected}")]
    UnexpectedOutput {
        model: ModelKind,
        expected: &'static str,
    },
    #[error("Normalization failed: {0}")]
    Normalization(#[from] ValidationError),
}

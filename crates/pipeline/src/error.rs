//! Pipeline Error Taxonomy

use anomaly_scoring::ScoringError;
use data_validator::{ConfigError, ValidationError};
use feature_engine::FeatureError;
use inference_engine::InferenceError;
use serde::{Deserialize, Serialize};
use storage::StorageError;
use thiserror::Error;

/// Error class recorded on failed stages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Malformed sample or window shape
    Validation,
    /// Assembled vector has the wrong length
    SchemaMismatch,
    /// Invalid windowing or settings; fatal to the run
    Config,
    /// Model call failed
    Inference,
    /// Result store write failed
    Persistence,
    /// Ingestion source unreachable
    Connection,
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Feature(#[from] FeatureError),
    #[error(transparent)]
    Inference(#[from] InferenceError),
    #[error(transparent)]
    Scoring(#[from] ScoringError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("Settings error: {0}")]
    Settings(#[from] config::ConfigError),
    #[error("No valid feature vectors")]
    NoValidVectors,
    #[error("No sequences could be built from {windows} windows")]
    NoSequences { windows: usize },
}

impl PipelineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PipelineError::Validation(_) => ErrorKind::Validation,
            PipelineError::Config(_) | PipelineError::Settings(_) => ErrorKind::Config,
            PipelineError::Feature(FeatureError::SchemaMismatch { .. })
            | PipelineError::Feature(FeatureError::UndeclaredField { .. }) => ErrorKind::SchemaMismatch,
            PipelineError::Feature(_) => ErrorKind::Validation,
            PipelineError::Inference(_) | PipelineError::Scoring(_) => ErrorKind::Inference,
            PipelineError::Storage(_) => ErrorKind::Persistence,
            PipelineError::NoValidVectors | PipelineError::NoSequences { .. } => ErrorKind::SchemaMismatch,
        }
    }

    /// Whether the error ends the run before any stage executes
    pub fn is_fatal(&self) -> bool {
        self.kind() == ErrorKind::Config
    }
}

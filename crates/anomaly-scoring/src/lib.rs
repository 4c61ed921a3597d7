//! Anomaly Scoring
//!
//! Turns one deterministic and several stochastic autoencoder passes into
//! per-component verdicts (error, confidence, uncertainty, attention
//! statistics) and a system-level health state.

mod config;
mod scorer;
mod verdict;

pub use config::{ComponentWeights, ScoringConfig, MONTE_CARLO_SAMPLES};
pub use inference_engine::Component;
pub use scorer::AnomalyScorer;
pub use verdict::{AnomalyVerdict, ComponentVerdict, FeatureContribution, HealthState, SystemVerdict};

use thiserror::Error;

/// Errors while scoring a model output
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScoringError {
    #[error("No threshold configured for {0}")]
    MissingThreshold(Component),
    #[error("Model output has no {0} component")]
    MissingComponent(Component),
    #[error("{component} reconstruction has {actual} values, expected {expected}")]
    LengthMismatch {
        component: Component,
        expected: usize,
        actual: usize,
    },
    #[error("Input vector has {actual} features, expected {expected}")]
    InputMismatch { expected: usize, actual: usize },
    #[error("Inference failed: {0}")]
    Inference(#[from] inference_engine::InferenceError),
}

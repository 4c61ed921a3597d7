//! Scoring Configuration

use crate::{Component, ScoringError};
use inference_engine::ModelArtifacts;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Stochastic passes per scored vector
pub const MONTE_CARLO_SAMPLES: usize = 5;

/// Per-component weights for the system aggregate
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComponentWeights {
    pub bearing: f64,
    pub eccentricity: f64,
    pub rotor: f64,
    pub stator: f64,
}

impl Default for ComponentWeights {
    fn default() -> Self {
        Self {
            bearing: 1.2,
            eccentricity: 1.0,
            rotor: 1.1,
            stator: 1.3,
        }
    }
}

impl ComponentWeights {
    pub fn weight(&self, component: Component) -> f64 {
        match component {
            Component::Bearing => self.bearing,
            Component::Eccentricity => self.eccentricity,
            Component::Rotor => self.rotor,
            Component::Stator => self.stator,
        }
    }

    pub fn total(&self) -> f64 {
        Component::ALL.iter().map(|c| self.weight(*c)).sum()
    }
}

/// Thresholds, weights and pass count. Read-only once a scorer is built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringConfig {
    pub thresholds: BTreeMap<Component, f64>,
    #[serde(default)]
    pub weights: ComponentWeights,
    #[serde(default = "default_samples")]
    pub monte_carlo_samples: usize,
}

fn default_samples() -> usize {
    MONTE_CARLO_SAMPLES
}

impl ScoringConfig {
    pub fn new(thresholds: BTreeMap<Component, f64>) -> Self {
        Self {
            thresholds,
            weights: ComponentWeights::default(),
            monte_carlo_samples: MONTE_CARLO_SAMPLES,
        }
    }

    /// Thresholds from the loaded model artifacts
    pub fn from_artifacts(artifacts: &ModelArtifacts) -> Self {
        Self::new(artifacts.thresholds.clone())
    }

    pub fn with_weights(mut self, weights: ComponentWeights) -> Self {
        self.weights = weights;
        self
    }

    pub fn threshold(&self, component: Component) -> Result<f64, ScoringError> {
        self.thresholds
            .get(&component)
            .copied()
            .ok_or(ScoringError::MissingThreshold(component))
    }
}

//! Reference Models
//!
//! Lightweight stand-ins for the trained networks. They honour the
//! `PredictiveModel` contract (deterministic without `stochastic`, fresh
//! randomness per stochastic call) so the pipeline can run end to end
//! without model weights.

use crate::model::{
    Component, ComponentOutput, ModelInput, ModelKind, ModelOutput, PredictiveModel,
    Reconstruction,
};
use crate::InferenceError;
use feature_engine::{FeatureGroup, FeatureSchema};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::ops::Range;
use std::sync::Mutex;
use tracing::info;

/// Reconstruction gain applied to every target feature
const RECONSTRUCTION_GAIN: f64 = 0.9;

/// Default amplitude of stochastic perturbations
const DEFAULT_NOISE: f64 = 0.05;

fn softmax(logits: &[f64]) -> Vec<f64> {
    let max = logits.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let exp: Vec<f64> = logits.iter().map(|l| (l - max).exp()).collect();
    let sum: f64 = exp.iter().sum();
    if sum > 0.0 {
        exp.iter().map(|e| e / sum).collect()
    } else {
        vec![1.0 / logits.len() as f64; logits.len()]
    }
}

/// Autoencoder stand-in: reconstructs each component slice with a fixed
/// gain and attends over the common features in proportion to their
/// magnitude.
pub struct MockAutoencoder {
    dimension: usize,
    common: Range<usize>,
    components: Vec<(Component, Range<usize>)>,
    noise: f64,
    rng: Mutex<StdRng>,
}

impl MockAutoencoder {
    /// Create a mock over the primary schema
    pub fn mock() -> Self {
        Self::with_seed(rand::random())
    }

    /// Reproducible stochastic passes
    pub fn with_seed(seed: u64) -> Self {
        info!("Creating mock autoencoder");
        let schema = FeatureSchema::primary();
        let components = Component::ALL
            .iter()
            .filter_map(|c| c.range(&schema).map(|r| (*c, r)))
            .collect();
        Self {
            dimension: schema.target_len(),
            common: schema.group_range(FeatureGroup::Common).unwrap_or(0..0),
            components,
            noise: DEFAULT_NOISE,
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    pub fn with_noise(mut self, noise: f64) -> Self {
        self.noise = noise;
        self
    }

    fn reconstruct(&self, vector: &[f64], stochastic: bool) -> Result<Reconstruction, InferenceError> {
        let mut rng = self
            .rng
            .lock()
            .map_err(|_| InferenceError::InferenceFailed("rng lock poisoned".into()))?;
        let mut jitter = |scale: f64| {
            if stochastic && scale > 0.0 {
                rng.gen_range(-scale..scale)
            } else {
                0.0
            }
        };

        let common = &vector[self.common.clone()];
        let mut reconstruction = Reconstruction::default();
        for (i, (component, range)) in self.components.iter().enumerate() {
            let target = &vector[range.clone()];
            let values = target
                .iter()
                .map(|x| x * RECONSTRUCTION_GAIN + jitter(self.noise))
                .collect();

            let bias = 1.0 + 0.1 * i as f64;
            let logits: Vec<f64> = common
                .iter()
                .map(|x| x.abs() * bias + jitter(self.noise))
                .collect();

            reconstruction.components.insert(
                *component,
                ComponentOutput {
                    reconstruction: values,
                    attention: softmax(&logits),
                },
            );
        }
        Ok(reconstruction)
    }
}

impl PredictiveModel for MockAutoencoder {
    fn kind(&self) -> ModelKind {
        ModelKind::Autoencoder
    }

    fn input_dimension(&self) -> usize {
        self.dimension
    }

    fn predict(&self, input: ModelInput<'_>, stochastic: bool) -> Result<ModelOutput, InferenceError> {
        match input {
            ModelInput::Vector(vector) => {
                if vector.len() != self.dimension {
                    return Err(InferenceError::InvalidInputShape {
                        expected: self.dimension,
                        actual: vector.len(),
                    });
                }
                self.reconstruct(vector, stochastic)
                    .map(ModelOutput::Reconstruction)
            }
            ModelInput::Sequence(_) => Err(InferenceError::InferenceFailed(
                "autoencoder scores single vectors".into(),
            )),
        }
    }
}

/// Temporal model stand-in: damped linear extrapolation of the last two
/// rows. Models with fewer outputs than inputs (the hybrid model's context
/// columns) predict only the leading `output_dimension` features.
pub struct MockForecaster {
    kind: ModelKind,
    input_dimension: usize,
    output_dimension: usize,
    damping: f64,
}

impl MockForecaster {
    pub fn new(kind: ModelKind, input_dimension: usize, output_dimension: usize) -> Self {
        info!("Creating mock {} forecaster", kind);
        Self {
            kind,
            input_dimension,
            output_dimension: output_dimension.min(input_dimension),
            damping: 0.5,
        }
    }

    /// Dual-LSTM stand-in over the primary schema
    pub fn mock() -> Self {
        let dimension = FeatureSchema::primary().target_len();
        Self::new(ModelKind::DualLstm, dimension, dimension)
    }
}

impl PredictiveModel for MockForecaster {
    fn kind(&self) -> ModelKind {
        self.kind
    }

    fn input_dimension(&self) -> usize {
        self.input_dimension
    }

    fn output_dimension(&self) -> usize {
        self.output_dimension
    }

    fn predict(&self, input: ModelInput<'_>, _stochastic: bool) -> Result<ModelOutput, InferenceError> {
        let sequence = match input {
            ModelInput::Sequence(s) => s,
            ModelInput::Vector(_) => {
                return Err(InferenceError::InferenceFailed(format!(
                    "{} forecaster expects a sequence",
                    self.kind
                )))
            }
        };
        if sequence.ncols() != self.input_dimension {
            return Err(InferenceError::InvalidInputShape {
                expected: self.input_dimension,
                actual: sequence.ncols(),
            });
        }
        let rows = sequence.nrows();
        if rows == 0 {
            return Err(InferenceError::InferenceFailed("empty sequence".into()));
        }

        let last = sequence.row(rows - 1);
        let next = (0..self.output_dimension)
            .map(|j| {
                let trend = if rows > 1 {
                    last[j] - sequence[[rows - 2, j]]
                } else {
                    0.0
                };
                last[j] + self.damping * trend
            })
            .collect();
        Ok(ModelOutput::NextStep(next))
    }
}

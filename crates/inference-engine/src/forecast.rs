//! Multi-step Rolling Forecast

use crate::model::{ModelKind, PredictiveModel};
use crate::InferenceError;
use data_validator::{NormalizationStats, Normalizer};
use ndarray::{s, Array2, ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastMetadata {
    pub model: ModelKind,
    pub steps: usize,
    pub features_per_step: usize,
    pub sequence_length: usize,
    pub elapsed_ms: f64,
}

/// Predicted rows in original feature units, one per step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Forecast {
    pub values: Vec<Vec<f64>>,
    pub metadata: ForecastMetadata,
}

/// Turns a one-step temporal model into an n-step forecaster by feeding
/// each prediction back as the newest row.
pub struct RollingForecaster {
    model: Arc<dyn PredictiveModel>,
    input: Normalizer,
    output: Normalizer,
}

impl RollingForecaster {
    /// `stats` must cover the model's input features; predictions are
    /// de-normalized with the leading `output_dimension` entries.
    pub fn new(model: Arc<dyn PredictiveModel>, stats: NormalizationStats) -> Result<Self, InferenceError> {
        let input = Normalizer::new(stats)?;
        if input.dimension() != model.input_dimension() {
            return Err(InferenceError::InvalidInputShape {
                expected: model.input_dimension(),
                actual: input.dimension(),
            });
        }
        let width = model.output_dimension();
        if width > input.dimension() {
            return Err(InferenceError::InvalidInputShape {
                expected: input.dimension(),
                actual: width,
            });
        }
        let output = Normalizer::new(NormalizationStats {
            mean: input.stats().mean[..width].to_vec(),
            std: input.stats().std[..width].to_vec(),
        })?;
        Ok(Self { model, input, output })
    }

    pub fn model_kind(&self) -> ModelKind {
        self.model.kind()
    }

    pub fn forecast(&self, sequence: ArrayView2<'_, f64>, steps: usize) -> Result<Forecast, InferenceError> {
        let start = Instant::now();
        let (rows, cols) = sequence.dim();
        if cols != self.input.dimension() {
            return Err(InferenceError::InvalidInputShape {
                expected: self.input.dimension(),
                actual: cols,
            });
        }

        let mut current = Array2::zeros((rows, cols));
        for (t, row) in sequence.outer_iter().enumerate() {
            let normalized = self.input.normalize(&row.to_vec())?;
            current.row_mut(t).assign(&ArrayView1::from(&normalized[..]));
        }

        let width = self.output.dimension();
        let mut values = Vec::with_capacity(steps);
        for _ in 0..steps {
            let predicted = self.model.next_step(current.view())?;
            if predicted.len() != width {
                return Err(InferenceError::InvalidInputShape {
                    expected: width,
                    actual: predicted.len(),
                });
            }
            values.push(self.output.denormalize(&predicted)?);

            if rows > 0 {
                // carry context columns forward from the newest row
                let mut next = current.row(rows - 1).to_owned();
                next.slice_mut(s![..width])
                    .assign(&ArrayView1::from(&predicted[..]));
                let shifted = current.slice(s![1.., ..]).to_owned();
                current.slice_mut(s![..rows - 1, ..]).assign(&shifted);
                current.row_mut(rows - 1).assign(&next);
            }
        }

        let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;
        debug!(
            "{} forecast of {} steps completed in {:.1}ms",
            self.model.kind(),
            steps,
            elapsed_ms
        );

        Ok(Forecast {
            values,
            metadata: ForecastMetadata {
                model: self.model.kind(),
                steps,
                features_per_step: width,
                sequence_length: rows,
                elapsed_ms,
            },
        })
    }
}

//! Z-score Normalization with Fixed Statistics
//!
//! The statistics come from a training artifact; nothing here updates them.

use crate::error::ValidationError;
use serde::{Deserialize, Serialize};

/// Standard deviations below this are treated as 1
const STD_EPSILON: f64 = 1e-10;

/// Per-feature mean and standard deviation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizationStats {
    pub mean: Vec<f64>,
    pub std: Vec<f64>,
}

impl NormalizationStats {
    /// Identity statistics (mean 0, std 1)
    pub fn identity(dimension: usize) -> Self {
        Self {
            mean: vec![0.0; dimension],
            std: vec![1.0; dimension],
        }
    }

    pub fn dimension(&self) -> usize {
        self.mean.len()
    }
}

/// Normalizer applying (x - mean) / std per feature
#[derive(Debug, Clone)]
pub struct Normalizer {
    stats: NormalizationStats,
}

impl Normalizer {
    /// Create a normalizer, rejecting stats whose vectors disagree in length
    pub fn new(stats: NormalizationStats) -> Result<Self, ValidationError> {
        if stats.mean.len() != stats.std.len() {
            return Err(ValidationError::DimensionMismatch {
                field: "std",
                expected: stats.mean.len(),
                actual: stats.std.len(),
            });
        }
        Ok(Self { stats })
    }

    pub fn dimension(&self) -> usize {
        self.stats.dimension()
    }

    pub fn stats(&self) -> &NormalizationStats {
        &self.stats
    }

    fn scale(&self, i: usize) -> f64 {
        let std = self.stats.std[i];
        if std.abs() > STD_EPSILON {
            std
        } else {
            1.0
        }
    }

    fn check(&self, values: &[f64]) -> Result<(), ValidationError> {
        if values.len() != self.dimension() {
            return Err(ValidationError::DimensionMismatch {
                field: "feature_vector",
                expected: self.dimension(),
                actual: values.len(),
            });
        }
        Ok(())
    }

    /// Normalize one vector
    pub fn normalize(&self, values: &[f64]) -> Result<Vec<f64>, ValidationError> {
        self.check(values)?;
        Ok(values
            .iter()
            .enumerate()
            .map(|(i, v)| (v - self.stats.mean[i]) / self.scale(i))
            .collect())
    }

    /// Undo `normalize`
    pub fn denormalize(&self, values: &[f64]) -> Result<Vec<f64>, ValidationError> {
        self.check(values)?;
        Ok(values
            .iter()
            .enumerate()
            .map(|(i, v)| v * self.scale(i) + self.stats.mean[i])
            .collect())
    }
}

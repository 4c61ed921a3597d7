//! Temporal Sequence Construction
//!
//! Arranges per-window feature vectors into fixed-length sequences for the
//! temporal models. With enough windows, every contiguous run of
//! `SEQUENCE_LENGTH` windows becomes one sequence. With too few, each of the
//! first windows is expanded into a synthetic sequence by a small
//! deterministic sinusoidal modulation.

use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use tracing::{debug, warn};

/// Rows per sequence
pub const SEQUENCE_LENGTH: usize = 10;

/// Windows expanded by the intra-window strategy
const MAX_INTRA_WINDOWS: usize = 5;

/// Relative amplitude of the intra-window modulation
const INTRA_MODULATION: f64 = 0.01;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SequenceStrategy {
    /// Sliding view over consecutive windows
    InterWindow,
    /// Synthetic steps derived from a single window
    IntraWindow,
}

/// One model input, `length x features`
#[derive(Debug, Clone, PartialEq)]
pub struct Sequence {
    /// First contributing window
    pub window_index: usize,
    pub strategy: SequenceStrategy,
    pub data: Array2<f64>,
}

#[derive(Debug, Clone, Copy)]
pub struct SequenceBuilder {
    length: usize,
    feature_dimension: usize,
}

impl SequenceBuilder {
    pub fn new(feature_dimension: usize) -> Self {
        Self {
            length: SEQUENCE_LENGTH,
            feature_dimension,
        }
    }

    pub fn length(&self) -> usize {
        self.length
    }

    pub fn strategy_for(&self, window_count: usize) -> SequenceStrategy {
        if window_count >= self.length {
            SequenceStrategy::InterWindow
        } else {
            SequenceStrategy::IntraWindow
        }
    }

    /// Build every sequence for the given window vectors. Returns an empty
    /// list if any contributing vector has the wrong length.
    pub fn build(&self, vectors: &[Vec<f64>]) -> Vec<Sequence> {
        if vectors.is_empty() {
            return Vec::new();
        }
        let strategy = self.strategy_for(vectors.len());
        let contributing = match strategy {
            SequenceStrategy::InterWindow => vectors,
            SequenceStrategy::IntraWindow => &vectors[..vectors.len().min(MAX_INTRA_WINDOWS)],
        };

        if let Some(bad) = contributing.iter().position(|v| v.len() != self.feature_dimension) {
            warn!(
                "Window {} has {} features, expected {}; no sequences built",
                bad,
                contributing[bad].len(),
                self.feature_dimension
            );
            return Vec::new();
        }

        let sequences: Vec<Sequence> = match strategy {
            SequenceStrategy::InterWindow => (0..=vectors.len() - self.length)
                .map(|start| Sequence {
                    window_index: start,
                    strategy,
                    data: self.stack(&vectors[start..start + self.length]),
                })
                .collect(),
            SequenceStrategy::IntraWindow => contributing
                .iter()
                .enumerate()
                .map(|(index, vector)| Sequence {
                    window_index: index,
                    strategy,
                    data: self.modulate(vector),
                })
                .collect(),
        };
        debug!(
            "Built {} {:?} sequences from {} windows",
            sequences.len(),
            strategy,
            vectors.len()
        );
        sequences
    }

    fn stack(&self, rows: &[Vec<f64>]) -> Array2<f64> {
        Array2::from_shape_fn((rows.len(), self.feature_dimension), |(t, j)| rows[t][j])
    }

    fn modulate(&self, vector: &[f64]) -> Array2<f64> {
        let length = self.length as f64;
        Array2::from_shape_fn((self.length, self.feature_dimension), |(t, j)| {
            vector[j] * (1.0 + INTRA_MODULATION * (2.0 * PI * t as f64 / length).sin())
        })
    }
}

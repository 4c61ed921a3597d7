//! Three-Phase Sample Buffer
//!
//! Holds incoming current samples per channel and slices them into
//! fixed-size overlapping windows.

mod buffer;
mod window;

pub use buffer::ChannelBuffer;
pub use window::{Window, WindowSegmenter, Windows};

use data_validator::ValidationError;
use serde::{Deserialize, Serialize};

/// One three-phase current measurement
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    #[serde(rename = "current_R")]
    pub current_r: f64,
    #[serde(rename = "current_S")]
    pub current_s: f64,
    #[serde(rename = "current_T")]
    pub current_t: f64,
    /// Seconds since the start of the feed
    pub timestamp: f64,
}

impl Sample {
    pub fn new(current_r: f64, current_s: f64, current_t: f64, timestamp: f64) -> Self {
        Self {
            current_r,
            current_s,
            current_t,
            timestamp,
        }
    }
}

/// Owned, equal-length phase channels
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PhaseCurrents {
    pub r: Vec<f64>,
    pub s: Vec<f64>,
    pub t: Vec<f64>,
}

impl PhaseCurrents {
    /// Build from three channels, rejecting unequal lengths
    pub fn new(r: Vec<f64>, s: Vec<f64>, t: Vec<f64>) -> Result<Self, ValidationError> {
        if r.len() != s.len() || s.len() != t.len() {
            return Err(ValidationError::ChannelLengthMismatch {
                r: r.len(),
                s: s.len(),
                t: t.len(),
            });
        }
        Ok(Self { r, s, t })
    }

    /// Split samples into channels, preserving arrival order
    pub fn from_samples(samples: &[Sample]) -> Self {
        let mut currents = Self {
            r: Vec::with_capacity(samples.len()),
            s: Vec::with_capacity(samples.len()),
            t: Vec::with_capacity(samples.len()),
        };
        for sample in samples {
            currents.r.push(sample.current_r);
            currents.s.push(sample.current_s);
            currents.t.push(sample.current_t);
        }
        currents
    }

    /// Samples per channel
    pub fn len(&self) -> usize {
        self.r.len()
    }

    pub fn is_empty(&self) -> bool {
        self.r.is_empty()
    }
}

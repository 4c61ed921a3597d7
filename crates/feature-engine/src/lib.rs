//! Feature Engineering Engine
//!
//! Computes five groups of physical diagnostic features (common, rotor,
//! stator, bearing, eccentricity) from a window of three-phase motor
//! current, and flattens them into a fixed-order model input vector.

mod bearing;
mod common;
mod eccentricity;
mod error;
mod features;
mod fft;
mod filter;
mod motor;
mod rotor;
mod schema;
mod statistics;
mod stator;

pub use common::SHORT_NAMES as COMMON_SHORT_NAMES;
pub use error::FeatureError;
pub use features::{ExtractorConfig, FeatureExtractor, FeatureGroup, FeatureGroups, FeatureMap};
pub use fft::{hann_periodic, hann_symmetric, unwrap_phase, Spectrum, SpectrumAnalyzer, StftPower};
pub use filter::BandPassFilter;
pub use motor::{MotorFrequencies, MotorParameters};
pub use schema::{FeatureSchema, FEATURE_DIMENSION};
pub use statistics::{pearson, ratio, StatisticalFeatures, EPSILON};

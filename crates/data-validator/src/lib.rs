//! Data Validation and Normalization
//!
//! Shape checks for three-phase current channels, windowing configuration
//! checks, and z-score normalization against externally supplied statistics.

mod error;
mod normalizer;
mod validator;
mod windowing;

pub use error::{ConfigError, ValidationError};
pub use normalizer::{NormalizationStats, Normalizer};
pub use validator::{ValidationConfig, Validator};
pub use windowing::WindowingConfig;

//! Channel Validator for Shape and Range Checking

use crate::error::ValidationError;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Validation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationConfig {
    /// Valid phase current range (A)
    pub current_range: (f64, f64),
    /// Reject NaN and infinite samples
    pub require_finite: bool,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            current_range: (-1000.0, 1000.0),
            require_finite: true,
        }
    }
}

/// Validator for three-phase current channels
pub struct Validator {
    config: ValidationConfig,
}

impl Validator {
    /// Create a new validator with given config
    pub fn new(config: ValidationConfig) -> Self {
        Self { config }
    }

    /// Validate a single value against a range
    pub fn validate_range(
        &self,
        field: &'static str,
        index: usize,
        value: f64,
        range: (f64, f64),
    ) -> Result<(), ValidationError> {
        if value < range.0 || value > range.1 {
            Err(ValidationError::OutOfRange {
                field,
                index,
                value,
                min: range.0,
                max: range.1,
            })
        } else {
            Ok(())
        }
    }

    /// Validate one phase channel
    pub fn validate_channel(&self, field: &'static str, values: &[f64]) -> Result<(), ValidationError> {
        for (index, &value) in values.iter().enumerate() {
            if !value.is_finite() {
                if self.config.require_finite {
                    return Err(ValidationError::NonFinite { field, index });
                }
                continue;
            }
            self.validate_range(field, index, value, self.config.current_range)?;
        }
        Ok(())
    }

    /// Validate three phase channels and return their common length
    pub fn validate_channels(&self, r: &[f64], s: &[f64], t: &[f64]) -> Result<usize, ValidationError> {
        if r.len() != s.len() || s.len() != t.len() {
            return Err(ValidationError::ChannelLengthMismatch {
                r: r.len(),
                s: s.len(),
                t: t.len(),
            });
        }

        self.validate_channel("current_R", r)?;
        self.validate_channel("current_S", s)?;
        self.validate_channel("current_T", t)?;

        debug!("Validated {} samples per phase", r.len());
        Ok(r.len())
    }

    /// Validate that a vector has the expected dimension and finite values
    pub fn validate_vector(
        &self,
        field: &'static str,
        values: &[f64],
        expected: usize,
    ) -> Result<(), ValidationError> {
        if values.len() != expected {
            return Err(ValidationError::DimensionMismatch {
                field,
                expected,
                actual: values.len(),
            });
        }
        if let Some(index) = values.iter().position(|v| !v.is_finite()) {
            return Err(ValidationError::NonFinite { field, index });
        }
        Ok(())
    }
}

impl Default for Validator {
    fn default() -> Self {
        Self::new(ValidationConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_channels() {
        let validator = Validator::default();
        let r = vec![1.0, 2.0, 3.0];
        let s = vec![-1.0, 0.5, 2.5];
        let t = vec![0.0, 0.0, 0.0];
        assert_eq!(validator.validate_channels(&r, &s, &t).unwrap(), 3);
    }

    #[test]
    fn test_length_mismatch() {
        let validator = Validator::default();
        let err = validator
            .validate_channels(&[1.0, 2.0], &[1.0], &[1.0, 2.0])
            .unwrap_err();
        assert_eq!(err, ValidationError::ChannelLengthMismatch { r: 2, s: 1, t: 2 });
    }

    #[test]
    fn test_non_finite_rejected() {
        let validator = Validator::default();
        let err = validator
            .validate_channels(&[1.0, f64::NAN], &[1.0, 1.0], &[1.0, 1.0])
            .unwrap_err();
        assert_eq!(err, ValidationError::NonFinite { field: "current_R", index: 1 });
    }

    #[test]
    fn test_out_of_range() {
        let validator = Validator::default();
        assert!(validator.validate_channel("current_T", &[0.0, 5000.0]).is_err());
        assert!(validator.validate_channel("current_T", &[-1000.0, 1000.0]).is_ok());
    }

    #[test]
    fn test_vector_dimension() {
        let validator = Validator::default();
        assert!(validator.validate_vector("mean", &[0.0; 4], 4).is_ok());
        assert!(matches!(
            validator.validate_vector("mean", &[0.0; 3], 4),
            Err(ValidationError::DimensionMismatch { expected: 4, actual: 3, .. })
        ));
    }
}

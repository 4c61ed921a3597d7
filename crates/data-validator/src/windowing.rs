//! Windowing and Batching Configuration

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};

/// Window geometry for segmentation and streaming dispatch
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowingConfig {
    /// Samples per window
    pub window_size: usize,
    /// Fraction of a window shared with the next one, in [0, 1)
    pub overlap_ratio: f64,
}

impl Default for WindowingConfig {
    fn default() -> Self {
        Self {
            window_size: 16384,
            overlap_ratio: 0.75,
        }
    }
}

impl WindowingConfig {
    pub fn new(window_size: usize, overlap_ratio: f64) -> Self {
        Self {
            window_size,
            overlap_ratio,
        }
    }

    /// Check window size and overlap, returning the step size
    pub fn validate(&self) -> Result<usize, ConfigError> {
        if self.window_size == 0 {
            return Err(ConfigError::ZeroWindowSize);
        }
        if !(0.0..1.0).contains(&self.overlap_ratio) {
            return Err(ConfigError::OverlapOutOfRange(self.overlap_ratio));
        }
        self.step()
    }

    /// step = floor(window_size * (1 - overlap_ratio))
    pub fn step(&self) -> Result<usize, ConfigError> {
        let step = (self.window_size as f64 * (1.0 - self.overlap_ratio)).floor();
        if !step.is_finite() || step < 1.0 {
            return Err(ConfigError::NonPositiveStep {
                window_size: self.window_size,
                overlap_ratio: self.overlap_ratio,
            });
        }
        Ok(step as usize)
    }

    /// Number of full windows that fit in `samples`
    pub fn window_count(&self, samples: usize) -> Result<usize, ConfigError> {
        let step = self.validate()?;
        if samples < self.window_size {
            return Ok(0);
        }
        Ok((samples - self.window_size) / step + 1)
    }

    /// Samples needed to produce exactly `windows_per_batch` windows
    pub fn required_buffer_size(&self, windows_per_batch: usize) -> Result<usize, ConfigError> {
        if windows_per_batch == 0 {
            return Err(ConfigError::ZeroWindowsPerBatch);
        }
        let step = self.validate()?;
        Ok((windows_per_batch - 1) * step + self.window_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_default_required_buffer_size() {
        let config = WindowingConfig::new(16384, 0.75);
        assert_eq!(config.step().unwrap(), 4096);
        assert_eq!(config.required_buffer_size(20).unwrap(), 93248);
    }

    #[test]
    fn test_step_floors() {
        let config = WindowingConfig::new(10, 0.33);
        assert_eq!(config.step().unwrap(), 6);
    }

    #[test]
    fn test_invalid_configs() {
        assert_eq!(
            WindowingConfig::new(0, 0.5).validate(),
            Err(ConfigError::ZeroWindowSize)
        );
        assert_eq!(
            WindowingConfig::new(100, 1.0).validate(),
            Err(ConfigError::OverlapOutOfRange(1.0))
        );
        assert!(matches!(
            WindowingConfig::new(4, 0.9).validate(),
            Err(ConfigError::NonPositiveStep { .. })
        ));
        assert_eq!(
            WindowingConfig::default().required_buffer_size(0),
            Err(ConfigError::ZeroWindowsPerBatch)
        );
    }

    #[test]
    fn test_window_count_short_signal() {
        let config = WindowingConfig::new(100, 0.5);
        assert_eq!(config.window_count(99).unwrap(), 0);
        assert_eq!(config.window_count(100).unwrap(), 1);
        assert_eq!(config.window_count(149).unwrap(), 1);
        assert_eq!(config.window_count(150).unwrap(), 2);
    }

    proptest! {
        #[test]
        fn required_buffer_yields_exact_window_count(
            window_size in 1usize..4096,
            overlap in 0.0f64..0.95,
            windows in 1usize..32,
        ) {
            let config = WindowingConfig::new(window_size, overlap);
            if let Ok(required) = config.required_buffer_size(windows) {
                prop_assert_eq!(config.window_count(required).unwrap(), windows);
            }
        }
    }
}

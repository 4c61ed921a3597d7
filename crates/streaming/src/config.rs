//! Session Configuration

use crate::StreamError;
use data_validator::WindowingConfig;
use pipeline::PipelineSettings;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    pub windowing: WindowingConfig,
    /// Windows per dispatched batch
    pub windows_per_batch: usize,
    pub forecast_steps: usize,
    /// First reconnect delay in milliseconds; doubles per consecutive failure
    pub retry_backoff_ms: u64,
    /// Upper bound on the reconnect delay
    pub max_backoff_ms: u64,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            windowing: WindowingConfig::default(),
            windows_per_batch: 20,
            forecast_steps: 5,
            retry_backoff_ms: 500,
            max_backoff_ms: 5000,
        }
    }
}

impl StreamConfig {
    /// Take windowing and batching from pipeline settings
    pub fn from_settings(settings: &PipelineSettings) -> Self {
        Self {
            windowing: settings.windowing,
            windows_per_batch: settings.windows_per_batch,
            forecast_steps: settings.forecast_steps,
            ..Self::default()
        }
    }

    pub fn step(&self) -> Result<usize, StreamError> {
        Ok(self.windowing.step()?)
    }

    /// `(windows_per_batch - 1) * step + window_size`
    pub fn required_buffer_size(&self) -> Result<usize, StreamError> {
        Ok(self.windowing.required_buffer_size(self.windows_per_batch)?)
    }

    /// Delay before reconnect attempt `attempt` (1-based)
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        let delay = self.retry_backoff_ms.saturating_mul(1u64 << exponent);
        Duration::from_millis(delay.min(self.max_backoff_ms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use data_validator::ConfigError;

    #[test]
    fn test_default_required_size() {
        let config = StreamConfig::default();
        assert_eq!(config.step().unwrap(), 4096);
        assert_eq!(config.required_buffer_size().unwrap(), 93248);
    }

    #[test]
    fn test_invalid_windowing() {
        let mut config = StreamConfig::default();
        config.windows_per_batch = 0;
        assert_eq!(
            config.required_buffer_size(),
            Err(StreamError::Config(ConfigError::ZeroWindowsPerBatch))
        );
    }

    #[test]
    fn test_backoff_is_bounded() {
        let config = StreamConfig::default();
        assert_eq!(config.backoff(1), Duration::from_millis(500));
        assert_eq!(config.backoff(2), Duration::from_millis(1000));
        assert_eq!(config.backoff(4), Duration::from_millis(4000));
        assert_eq!(config.backoff(5), Duration::from_millis(5000));
        assert_eq!(config.backoff(u32::MAX), Duration::from_millis(5000));
    }
}

//! Batch Requests

use data_validator::WindowingConfig;
use sample_buffer::{PhaseCurrents, Sample};

/// One orchestrator invocation over a block of three-phase current
#[derive(Debug, Clone)]
pub struct BatchRequest {
    pub batch_id: String,
    pub currents: PhaseCurrents,
    /// Segment into overlapping windows; otherwise the whole signal is one
    /// pseudo-window
    pub use_windowing: bool,
    /// Overrides the orchestrator's windowing
    pub windowing: Option<WindowingConfig>,
    /// Overrides the orchestrator's forecast horizon
    pub forecast_steps: Option<usize>,
}

impl BatchRequest {
    pub fn new(batch_id: impl Into<String>, currents: PhaseCurrents) -> Self {
        Self {
            batch_id: batch_id.into(),
            currents,
            use_windowing: true,
            windowing: None,
            forecast_steps: None,
        }
    }

    pub fn from_samples(batch_id: impl Into<String>, samples: &[Sample]) -> Self {
        Self::new(batch_id, PhaseCurrents::from_samples(samples))
    }

    pub fn without_windowing(mut self) -> Self {
        self.use_windowing = false;
        self
    }

    pub fn with_windowing(mut self, windowing: WindowingConfig) -> Self {
        self.windowing = Some(windowing);
        self
    }

    pub fn with_forecast_steps(mut self, steps: usize) -> Self {
        self.forecast_steps = Some(steps);
        self
    }
}

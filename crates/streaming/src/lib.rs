//! Streaming Ingestion
//!
//! Each session owns one task that pulls sample batches from a
//! [`SampleSource`], buffers them per channel and hands exactly
//! `required_buffer_size` samples to the pipeline whenever that many are
//! buffered. Runs within a session are strictly sequential.

mod buffer;
mod config;
mod error;
mod manager;
mod source;

pub use buffer::{SessionStats, StreamBufferManager};
pub use config::StreamConfig;
pub use error::StreamError;
pub use manager::{StreamManager, StreamStatus};
pub use source::{ChannelSource, SampleSource, SourceBatch, SyntheticConfig, SyntheticSource};

#[cfg(test)]
pub(crate) mod test_support {
    use data_validator::WindowingConfig;
    use inference_engine::{MockAutoencoder, MockForecaster};
    use pipeline::{Models, PipelineOrchestrator, PipelineSettings};
    use std::sync::Arc;
    use storage::Repository;

    /// Small windows: step 512, four windows per batch, 2560 samples
    pub fn settings() -> PipelineSettings {
        let mut settings = PipelineSettings::default();
        settings.windowing = WindowingConfig::new(1024, 0.5);
        settings.windows_per_batch = 4;
        settings.forecast_steps = 2;
        settings
    }

    pub fn orchestrator(settings: &PipelineSettings) -> Arc<PipelineOrchestrator> {
        let artifacts = settings.artifacts.loader(119).load().unwrap();
        let models = Models {
            autoencoder: Arc::new(MockAutoencoder::with_seed(21)),
            forecaster: Arc::new(MockForecaster::mock()),
        };
        Arc::new(PipelineOrchestrator::new(settings, &artifacts, models, Arc::new(Repository::new())).unwrap())
    }
}

//! Stream Buffer Manager

use crate::{StreamConfig, StreamError};
use metrics::counter;
use pipeline::{BatchRequest, OverallStatus, PipelineOrchestrator, PipelineRun, RunOutcome, StageName};
use sample_buffer::{ChannelBuffer, Sample};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, info};

/// Cumulative counters for one session
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionStats {
    pub features_processed: usize,
    pub anomaly_processed: usize,
    pub forecast_processed: usize,
    /// Successful runs without anomalous windows
    pub healthy_batches: usize,
    /// Runs with at least one anomalous window
    pub anomalous_batches: usize,
    /// Runs whose overall status is not success
    pub failed_batches: usize,
}

impl SessionStats {
    fn record(&mut self, outcome: &RunOutcome) {
        for stage in outcome.run.stages.iter().filter(|s| s.success) {
            let items = stage.items_processed.unwrap_or(0);
            match stage.stage {
                StageName::FeatureExtraction => self.features_processed += items,
                StageName::AnomalyDetection => self.anomaly_processed += items,
                StageName::ForecastAnalysis => self.forecast_processed += items,
            }
        }

        let anomalous = outcome.run.summary.anomalous_windows > 0;
        let succeeded = outcome.run.overall_status == OverallStatus::Success;
        if anomalous {
            self.anomalous_batches += 1;
        }
        if succeeded && !anomalous {
            self.healthy_batches += 1;
        }
        if !succeeded {
            self.failed_batches += 1;
        }
    }
}

/// Buffers one session's samples and dispatches full batches to the
/// pipeline
///
/// Whenever at least `required_buffer_size` samples are buffered, exactly
/// that many are copied off the front, run through the orchestrator, and
/// then removed. The remainder stays buffered for the next batch.
pub struct StreamBufferManager {
    session_id: String,
    config: StreamConfig,
    required: usize,
    buffer: ChannelBuffer,
    processed_batches: usize,
    stats: SessionStats,
    orchestrator: Arc<PipelineOrchestrator>,
}

impl StreamBufferManager {
    pub fn new(
        session_id: impl Into<String>,
        config: StreamConfig,
        orchestrator: Arc<PipelineOrchestrator>,
    ) -> Result<Self, StreamError> {
        let required = config.required_buffer_size()?;
        Ok(Self {
            session_id: session_id.into(),
            config,
            required,
            buffer: ChannelBuffer::new(),
            processed_batches: 0,
            stats: SessionStats::default(),
            orchestrator,
        })
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn config(&self) -> &StreamConfig {
        &self.config
    }

    pub fn required_buffer_size(&self) -> usize {
        self.required
    }

    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    pub fn processed_batches(&self) -> usize {
        self.processed_batches
    }

    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    /// Append a batch and dispatch every full batch now buffered
    pub fn ingest(&mut self, samples: &[Sample]) -> Result<Vec<PipelineRun>, StreamError> {
        self.buffer.extend(samples);

        let mut runs = Vec::new();
        while self.buffer.len() >= self.required {
            if let Some(run) = self.dispatch()? {
                runs.push(run);
            }
        }
        Ok(runs)
    }

    fn dispatch(&mut self) -> Result<Option<PipelineRun>, StreamError> {
        let batch_id = format!("{}_batch_{}", self.session_id, self.processed_batches + 1);
        let currents = self.buffer.snapshot_front(self.required)?;
        info!("Dispatching batch {} ({} samples)", batch_id, self.required);

        let request = BatchRequest::new(batch_id.as_str(), currents)
            .with_windowing(self.config.windowing)
            .with_forecast_steps(self.config.forecast_steps);
        let result = self.orchestrator.run(&request);

        self.buffer.consume_front(self.required)?;
        self.processed_batches += 1;
        counter!("stream_batches_dispatched_total").increment(1);
        debug!(
            "Buffer for session {} trimmed, {} samples remain",
            self.session_id,
            self.buffer.len()
        );

        match result {
            Ok(outcome) => {
                self.stats.record(&outcome);
                Ok(Some(outcome.run))
            }
            Err(e) => {
                error!("Pipeline rejected batch {}: {}", batch_id, e);
                self.stats.failed_batches += 1;
                Ok(None)
            }
        }
    }

    /// Drop buffered samples
    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{orchestrator, settings};

    fn samples(n: usize) -> Vec<Sample> {
        (0..n)
            .map(|i| {
                let t = i as f64 / 25600.0;
                let angle = 2.0 * std::f64::consts::PI * 50.0 * t;
                Sample::new(
                    3.0 * angle.sin(),
                    3.0 * (angle - 2.0944).sin(),
                    3.0 * (angle - 4.1888).sin(),
                    t,
                )
            })
            .collect()
    }

    fn manager() -> StreamBufferManager {
        let settings = settings();
        StreamBufferManager::new(
            "stream_u1_0",
            StreamConfig::from_settings(&settings),
            orchestrator(&settings),
        )
        .unwrap()
    }

    #[test]
    fn test_dispatch_at_threshold() {
        let mut manager = manager();
        assert_eq!(manager.required_buffer_size(), 2560);

        assert!(manager.ingest(&samples(2000)).unwrap().is_empty());
        assert_eq!(manager.buffered(), 2000);

        let runs = manager.ingest(&samples(1000)).unwrap();
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].batch_id, "stream_u1_0_batch_1");
        assert_eq!(runs[0].summary.data_length, 2560);
        assert_eq!(runs[0].summary.window_count, 4);
        assert_eq!(manager.buffered(), 440);
        assert_eq!(manager.processed_batches(), 1);
        assert_eq!(manager.stats().features_processed, 4);
    }

    #[test]
    fn test_large_ingest_dispatches_every_full_batch() {
        let mut manager = manager();
        let runs = manager.ingest(&samples(2 * 2560 + 10)).unwrap();
        assert_eq!(runs.len(), 2);
        assert_eq!(runs[1].batch_id, "stream_u1_0_batch_2");
        assert_eq!(manager.buffered(), 10);

        let stats = manager.stats();
        assert_eq!(stats.features_processed, 8);
        assert_eq!(stats.anomaly_processed, 8);
        assert_eq!(stats.failed_batches, 0);
        assert_eq!(stats.healthy_batches + stats.anomalous_batches, 2);
    }

    #[test]
    fn test_stats_classification() {
        let mut stats = SessionStats::default();
        let settings = settings();
        let pipeline = orchestrator(&settings);
        let mut outcome = pipeline
            .run(&BatchRequest::from_samples("classify", &samples(2560)))
            .unwrap();

        outcome.run.overall_status = OverallStatus::Success;
        outcome.run.summary.anomalous_windows = 0;
        stats.record(&outcome);
        outcome.run.summary.anomalous_windows = 2;
        stats.record(&outcome);
        outcome.run.overall_status = OverallStatus::PartialFailure;
        outcome.run.summary.anomalous_windows = 0;
        stats.record(&outcome);

        assert_eq!(stats.healthy_batches, 1);
        assert_eq!(stats.anomalous_batches, 1);
        assert_eq!(stats.failed_batches, 1);
    }

    #[test]
    fn test_clear_drops_buffered_samples() {
        let mut manager = manager();
        manager.ingest(&samples(100)).unwrap();
        manager.clear();
        assert_eq!(manager.buffered(), 0);
    }
}

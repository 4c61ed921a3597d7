//! Ingestion Sources

use crate::StreamError;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sample_buffer::Sample;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::future::Future;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info};

/// What a source yields per receive: a batch, or a connection failure
pub type SourceBatch = Result<Vec<Sample>, StreamError>;

/// Ordered feed of sample batches
pub trait SampleSource: Send {
    /// Next batch in arrival order. `Ok(None)` ends the feed;
    /// `Err(ConnectionFailure)` asks the session to back off and reconnect.
    fn next_batch(&mut self) -> impl Future<Output = Result<Option<Vec<Sample>>, StreamError>> + Send;

    /// Re-establish the feed after a connection failure
    fn reconnect(&mut self) -> impl Future<Output = Result<(), StreamError>> + Send {
        async { Ok(()) }
    }
}

/// Feed driven through an `mpsc` channel
pub struct ChannelSource {
    rx: mpsc::Receiver<SourceBatch>,
}

impl ChannelSource {
    pub fn new(rx: mpsc::Receiver<SourceBatch>) -> Self {
        Self { rx }
    }

    /// Create a source and the sender that feeds it
    pub fn channel(capacity: usize) -> (mpsc::Sender<SourceBatch>, Self) {
        let (tx, rx) = mpsc::channel(capacity);
        (tx, Self::new(rx))
    }
}

impl SampleSource for ChannelSource {
    async fn next_batch(&mut self) -> Result<Option<Vec<Sample>>, StreamError> {
        match self.rx.recv().await {
            Some(Ok(batch)) => Ok(Some(batch)),
            Some(Err(e)) => Err(e),
            None => Ok(None),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyntheticConfig {
    pub sample_rate: f64,
    /// Supply frequency (Hz)
    pub frequency: f64,
    /// Peak current (A)
    pub amplitude: f64,
    /// Standard deviation of additive noise (A)
    pub noise_level: f64,
    /// Relative amplitude deficit of phases S and T
    pub imbalance: f64,
    pub batch_size: usize,
    /// Sleep for each batch's duration before yielding it
    pub realtime: bool,
    /// End the feed after this many samples
    pub max_samples: Option<usize>,
    pub seed: Option<u64>,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            sample_rate: 25600.0,
            frequency: 50.0,
            amplitude: 3.0,
            noise_level: 0.05,
            imbalance: 0.02,
            batch_size: 2560,
            realtime: false,
            max_samples: None,
            seed: None,
        }
    }
}

/// Generated three-phase current
pub struct SyntheticSource {
    config: SyntheticConfig,
    rng: StdRng,
    /// Samples emitted so far
    position: usize,
}

impl SyntheticSource {
    pub fn new(config: SyntheticConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        info!(
            "Synthetic source: {} Hz supply, {} A, {} samples per batch",
            config.frequency, config.amplitude, config.batch_size
        );
        Self {
            config,
            rng,
            position: 0,
        }
    }

    pub fn position(&self) -> usize {
        self.position
    }

    /// Box-Muller standard normal
    fn gaussian(&mut self) -> f64 {
        let u1: f64 = 1.0 - self.rng.gen::<f64>();
        let u2: f64 = self.rng.gen();
        (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos()
    }

    fn sample(&mut self, n: usize) -> Sample {
        let c = &self.config;
        let t = n as f64 / c.sample_rate;
        let angle = 2.0 * PI * c.frequency * t;
        let (amplitude, noise, weak) = (c.amplitude, c.noise_level, c.amplitude * (1.0 - c.imbalance));

        let r = amplitude * angle.sin() + noise * self.gaussian();
        let s = weak * (angle - 2.0 * PI / 3.0).sin() + noise * self.gaussian();
        let t_phase = weak * (angle - 4.0 * PI / 3.0).sin() + noise * self.gaussian();
        Sample::new(r, s, t_phase, t)
    }

    /// Generate the next batch without pacing
    pub fn generate(&mut self) -> Option<Vec<Sample>> {
        let remaining = match self.config.max_samples {
            Some(max) => max.saturating_sub(self.position),
            None => usize::MAX,
        };
        let count = self.config.batch_size.min(remaining);
        if count == 0 {
            return None;
        }

        let start = self.position;
        let batch: Vec<Sample> = (start..start + count).map(|n| self.sample(n)).collect();
        self.position += count;
        Some(batch)
    }
}

impl SampleSource for SyntheticSource {
    async fn next_batch(&mut self) -> Result<Option<Vec<Sample>>, StreamError> {
        let batch = self.generate();
        if self.config.realtime {
            if let Some(batch) = &batch {
                let seconds = batch.len() as f64 / self.config.sample_rate;
                tokio::time::sleep(Duration::from_secs_f64(seconds)).await;
            }
        }
        if batch.is_none() {
            debug!("Synthetic source exhausted after {} samples", self.position);
        }
        Ok(batch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batches_and_limit() {
        let mut source = SyntheticSource::new(SyntheticConfig {
            batch_size: 1000,
            max_samples: Some(2500),
            seed: Some(1),
            ..SyntheticConfig::default()
        });
        assert_eq!(source.generate().unwrap().len(), 1000);
        assert_eq!(source.generate().unwrap().len(), 1000);
        assert_eq!(source.generate().unwrap().len(), 500);
        assert!(source.generate().is_none());
        assert_eq!(source.position(), 2500);
    }

    #[test]
    fn test_waveform_shape() {
        let mut source = SyntheticSource::new(SyntheticConfig {
            noise_level: 0.0,
            batch_size: 25600,
            seed: Some(2),
            ..SyntheticConfig::default()
        });
        let batch = source.generate().unwrap();
        let peak = |f: fn(&Sample) -> f64| batch.iter().map(f).fold(0.0f64, |m, v| m.max(v.abs()));

        assert!((peak(|s| s.current_r) - 3.0).abs() < 1e-3);
        assert!((peak(|s| s.current_s) - 2.94).abs() < 1e-3);
        // balanced phases sum to about zero apart from the imbalance
        let sum = batch[100].current_r + batch[100].current_s + batch[100].current_t;
        assert!(sum.abs() < 0.1);
        assert!((batch[1].timestamp - 1.0 / 25600.0).abs() < 1e-12);
    }

    #[test]
    fn test_seeded_noise_is_reproducible() {
        let config = SyntheticConfig {
            batch_size: 64,
            seed: Some(9),
            ..SyntheticConfig::default()
        };
        let a = SyntheticSource::new(config.clone()).generate().unwrap();
        let b = SyntheticSource::new(config).generate().unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn test_channel_source() {
        let (tx, mut source) = ChannelSource::channel(4);
        tx.send(Ok(vec![Sample::new(1.0, 2.0, 3.0, 0.0)])).await.unwrap();
        tx.send(Err(StreamError::ConnectionFailure("reset".into()))).await.unwrap();
        drop(tx);

        assert_eq!(source.next_batch().await.unwrap().unwrap().len(), 1);
        assert!(matches!(
            source.next_batch().await,
            Err(StreamError::ConnectionFailure(_))
        ));
        assert_eq!(source.next_batch().await.unwrap(), None);
    }
}

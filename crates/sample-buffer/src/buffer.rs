//! Append-only Channel Buffer with Front Trimming

use crate::{PhaseCurrents, Sample};
use data_validator::ValidationError;
use tracing::debug;

/// Unbounded per-channel sample buffer
///
/// Samples are appended at the back in arrival order and removed from the
/// front only in whole dispatch-sized chunks, so the four vectors always
/// share one length.
#[derive(Debug, Default, Clone)]
pub struct ChannelBuffer {
    r: Vec<f64>,
    s: Vec<f64>,
    t: Vec<f64>,
    timestamps: Vec<f64>,
    /// Total samples appended since creation or the last clear
    total_appended: usize,
}

impl ChannelBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one sample
    pub fn push(&mut self, sample: &Sample) {
        self.r.push(sample.current_r);
        self.s.push(sample.current_s);
        self.t.push(sample.current_t);
        self.timestamps.push(sample.timestamp);
        self.total_appended += 1;
    }

    /// Append a batch of samples
    pub fn extend(&mut self, samples: &[Sample]) {
        self.r.reserve(samples.len());
        self.s.reserve(samples.len());
        self.t.reserve(samples.len());
        self.timestamps.reserve(samples.len());
        for sample in samples {
            self.push(sample);
        }
    }

    /// Samples currently buffered
    pub fn len(&self) -> usize {
        self.r.len()
    }

    pub fn is_empty(&self) -> bool {
        self.r.is_empty()
    }

    pub fn total_appended(&self) -> usize {
        self.total_appended
    }

    /// Timestamps of the buffered samples
    pub fn timestamps(&self) -> &[f64] {
        &self.timestamps
    }

    /// Copy the oldest `count` samples out as phase channels
    pub fn snapshot_front(&self, count: usize) -> Result<PhaseCurrents, ValidationError> {
        self.ensure(count)?;
        Ok(PhaseCurrents {
            r: self.r[..count].to_vec(),
            s: self.s[..count].to_vec(),
            t: self.t[..count].to_vec(),
        })
    }

    /// Remove exactly `count` samples from the front of every channel
    pub fn consume_front(&mut self, count: usize) -> Result<(), ValidationError> {
        self.ensure(count)?;
        self.r.drain(..count);
        self.s.drain(..count);
        self.t.drain(..count);
        self.timestamps.drain(..count);
        debug!("Trimmed {} samples, {} remain buffered", count, self.len());
        Ok(())
    }

    /// Drop all buffered samples and reset counters
    pub fn clear(&mut self) {
        self.r.clear();
        self.s.clear();
        self.t.clear();
        self.timestamps.clear();
        self.total_appended = 0;
    }

    fn ensure(&self, count: usize) -> Result<(), ValidationError> {
        if count > self.len() {
            return Err(ValidationError::InsufficientSamples {
                required: count,
                actual: self.len(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(start: usize, count: usize) -> Vec<Sample> {
        (start..start + count)
            .map(|i| Sample::new(i as f64, i as f64 + 0.5, -(i as f64), i as f64 * 1e-3))
            .collect()
    }

    #[test]
    fn test_extend_and_snapshot() {
        let mut buffer = ChannelBuffer::new();
        buffer.extend(&ramp(0, 10));

        assert_eq!(buffer.len(), 10);
        let front = buffer.snapshot_front(4).unwrap();
        assert_eq!(front.r, vec![0.0, 1.0, 2.0, 3.0]);
        assert_eq!(front.t, vec![0.0, -1.0, -2.0, -3.0]);
        // snapshot does not consume
        assert_eq!(buffer.len(), 10);
    }

    #[test]
    fn test_consume_exact_count() {
        let mut buffer = ChannelBuffer::new();
        buffer.extend(&ramp(0, 10));
        buffer.consume_front(6).unwrap();

        assert_eq!(buffer.len(), 4);
        assert_eq!(buffer.timestamps().len(), 4);
        let rest = buffer.snapshot_front(4).unwrap();
        assert_eq!(rest.r, vec![6.0, 7.0, 8.0, 9.0]);
        assert_eq!(buffer.total_appended(), 10);
    }

    #[test]
    fn test_overdraw_rejected() {
        let mut buffer = ChannelBuffer::new();
        buffer.extend(&ramp(0, 3));
        assert_eq!(
            buffer.consume_front(4),
            Err(ValidationError::InsufficientSamples { required: 4, actual: 3 })
        );
        assert_eq!(buffer.len(), 3);
    }

    #[test]
    fn test_clear() {
        let mut buffer = ChannelBuffer::new();
        buffer.extend(&ramp(0, 5));
        buffer.clear();
        assert!(buffer.is_empty());
        assert_eq!(buffer.total_appended(), 0);
    }
}

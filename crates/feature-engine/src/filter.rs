//! Zero-phase Butterworth Band-pass Filter
//!
//! Designed as cascaded second-order sections through the bilinear
//! transform, applied forward and backward with odd-extension padding and
//! steady-state initial conditions.

use crate::error::FeatureError;
use rustfft::num_complex::Complex;
use std::f64::consts::PI;

/// One second-order section, `a[0]` normalized to 1
#[derive(Debug, Clone, Copy, PartialEq)]
struct Biquad {
    b: [f64; 3],
    a: [f64; 3],
}

impl Biquad {
    /// Steady-state delay values for a unit step input
    fn step_state(&self) -> [f64; 2] {
        let [b0, b1, b2] = self.b;
        let [_, a1, a2] = self.a;
        let r0 = b1 - a1 * b0;
        let r1 = b2 - a2 * b0;
        let z0 = (r0 + r1) / (1.0 + a1 + a2);
        [z0, r1 - a2 * z0]
    }

    fn dc_gain(&self) -> f64 {
        self.b.iter().sum::<f64>() / self.a.iter().sum::<f64>()
    }
}

/// Butterworth band-pass filter in second-order sections
#[derive(Debug, Clone)]
pub struct BandPassFilter {
    sections: Vec<Biquad>,
    /// Cascade step-response state, scaled per run by the first input
    zi: Vec<[f64; 2]>,
}

impl BandPassFilter {
    /// Design a band-pass filter of the given (even) prototype order
    pub fn butterworth(
        order: usize,
        low_hz: f64,
        high_hz: f64,
        sample_rate: f64,
    ) -> Result<Self, FeatureError> {
        if order == 0 || order % 2 != 0 {
            return Err(FeatureError::UnsupportedOrder(order));
        }
        let nyquist = sample_rate / 2.0;
        if !(low_hz > 0.0 && low_hz < high_hz && high_hz < nyquist) {
            return Err(FeatureError::InvalidBand {
                low_hz,
                high_hz,
                sample_rate,
            });
        }

        // Pre-warped analog edges for a bilinear transform at fs = 2
        let fs2 = 4.0;
        let w1 = fs2 * (PI * (low_hz / nyquist) / 2.0).tan();
        let w2 = fs2 * (PI * (high_hz / nyquist) / 2.0).tan();
        let bw = w2 - w1;
        let wo2 = w1 * w2;

        // Analog low-pass prototype poles, then low-pass to band-pass
        let mut analog = Vec::with_capacity(2 * order);
        for m in (0..order).map(|i| 2 * i as i64 - order as i64 + 1) {
            let p = -Complex::from_polar(1.0, PI * m as f64 / (2 * order) as f64);
            let p_lp = p * (bw / 2.0);
            let root = (p_lp * p_lp - wo2).sqrt();
            analog.push(p_lp + root);
            analog.push(p_lp - root);
        }

        // order zeros at s = 0 plus order zeros at infinity
        let mut denominator = Complex::new(1.0, 0.0);
        for &p in &analog {
            denominator *= fs2 - p;
        }
        let gain = (Complex::new(bw.powi(order as i32) * fs2.powi(order as i32), 0.0)
            / denominator)
            .re;

        let mut sections: Vec<Biquad> = analog
            .iter()
            .map(|&p| (fs2 + p) / (fs2 - p))
            .filter(|z| z.im > 0.0)
            .map(|z| Biquad {
                b: [1.0, 0.0, -1.0],
                a: [1.0, -2.0 * z.re, z.norm_sqr()],
            })
            .collect();

        if sections.len() != order {
            return Err(FeatureError::InvalidBand {
                low_hz,
                high_hz,
                sample_rate,
            });
        }
        for coeff in sections[0].b.iter_mut() {
            *coeff *= gain;
        }

        let mut zi = Vec::with_capacity(sections.len());
        let mut scale = 1.0;
        for section in &sections {
            let [z0, z1] = section.step_state();
            zi.push([scale * z0, scale * z1]);
            scale *= section.dc_gain();
        }

        Ok(Self { sections, zi })
    }

    /// Number of second-order sections
    pub fn sections(&self) -> usize {
        self.sections.len()
    }

    /// Samples of odd extension added at each end by `filtfilt`
    pub fn pad_len(&self) -> usize {
        3 * (2 * self.sections.len() + 1)
    }

    /// Single forward pass with initial state `zi * x0`
    fn run(&self, signal: &[f64], x0: f64) -> Vec<f64> {
        let mut state: Vec<[f64; 2]> = self.zi.iter().map(|z| [z[0] * x0, z[1] * x0]).collect();
        signal
            .iter()
            .map(|&x| {
                let mut value = x;
                for (section, z) in self.sections.iter().zip(state.iter_mut()) {
                    let [b0, b1, b2] = section.b;
                    let [_, a1, a2] = section.a;
                    let y = b0 * value + z[0];
                    z[0] = b1 * value - a1 * y + z[1];
                    z[1] = b2 * value - a2 * y;
                    value = y;
                }
                value
            })
            .collect()
    }

    /// Forward-backward (zero phase) filtering
    pub fn filtfilt(&self, signal: &[f64]) -> Vec<f64> {
        let n = signal.len();
        if n < 2 {
            return signal.to_vec();
        }
        let pad = self.pad_len().min(n - 1);

        let first = signal[0];
        let last = signal[n - 1];
        let mut extended = Vec::with_capacity(n + 2 * pad);
        extended.extend((1..=pad).rev().map(|i| 2.0 * first - signal[i]));
        extended.extend_from_slice(signal);
        extended.extend((1..=pad).map(|i| 2.0 * last - signal[n - 1 - i]));

        let forward = self.run(&extended, extended[0]);
        let mut reversed: Vec<f64> = forward.into_iter().rev().collect();
        let start = reversed[0];
        reversed = self.run(&reversed, start);
        reversed.reverse();

        reversed[pad..pad + n].to_vec()
    }
}

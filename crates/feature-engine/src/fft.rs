//! FFT-based Frequency Analysis
//!
//! Full complex spectra with signed bin frequencies, the FFT Hilbert
//! transform, and a zero-padded one-sided STFT.

use ndarray::{Array2, Axis};
use rustfft::{num_complex::Complex, FftPlanner};
use std::f64::consts::PI;

/// Symmetric Hann window, `0.5 - 0.5cos(2πn/(N-1))`
pub fn hann_symmetric(n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![1.0],
        _ => (0..n)
            .map(|i| 0.5 - 0.5 * (2.0 * PI * i as f64 / (n - 1) as f64).cos())
            .collect(),
    }
}

/// Periodic Hann window, `0.5 - 0.5cos(2πn/N)`
pub fn hann_periodic(n: usize) -> Vec<f64> {
    (0..n)
        .map(|i| 0.5 - 0.5 * (2.0 * PI * i as f64 / n as f64).cos())
        .collect()
}

/// Bin frequency `k / (n * d)` with `d = 1 / sample_rate`
#[inline]
fn bin_frequency(k: f64, n: usize, sample_rate: f64) -> f64 {
    k * (1.0 / (n as f64 * (1.0 / sample_rate)))
}

/// Nearest of the bins `0..=max_bin` to `target`; ties go to the lower bin
fn nearest_positive_bin(target: f64, n: usize, sample_rate: f64, max_bin: usize) -> usize {
    let resolution = bin_frequency(1.0, n, sample_rate);
    let estimate = (target / resolution).floor();
    if !estimate.is_finite() || estimate < 0.0 {
        return 0;
    }
    let lo = (estimate as usize).min(max_bin);
    if lo == max_bin {
        return lo;
    }
    let d_lo = (bin_frequency(lo as f64, n, sample_rate) - target).abs();
    let d_hi = (bin_frequency((lo + 1) as f64, n, sample_rate) - target).abs();
    if d_hi < d_lo {
        lo + 1
    } else {
        lo
    }
}

/// Full (two-sided) complex spectrum of a real signal
#[derive(Debug, Clone)]
pub struct Spectrum {
    bins: Vec<Complex<f64>>,
    sample_rate: f64,
}

impl Spectrum {
    pub fn len(&self) -> usize {
        self.bins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bins.is_empty()
    }

    /// Signed frequency of bin `k`, laid out like a standard FFT
    pub fn frequency(&self, k: usize) -> f64 {
        let n = self.bins.len();
        let signed = if k <= (n - 1) / 2 {
            k as f64
        } else {
            k as f64 - n as f64
        };
        bin_frequency(signed, n, self.sample_rate)
    }

    /// Nearest bin to a non-negative target frequency
    pub fn nearest_bin(&self, target: f64) -> usize {
        if self.bins.is_empty() {
            return 0;
        }
        let max_bin = (self.bins.len() - 1) / 2;
        nearest_positive_bin(target, self.bins.len(), self.sample_rate, max_bin)
    }

    /// Unnormalized magnitude of bin `k`
    pub fn magnitude(&self, k: usize) -> f64 {
        self.bins.get(k).map(|c| c.norm()).unwrap_or(0.0)
    }

    /// Magnitude of the bin nearest to `target`
    pub fn magnitude_at(&self, target: f64) -> f64 {
        self.magnitude(self.nearest_bin(target))
    }

    /// Σ|X|² over both halves
    pub fn total_energy(&self) -> f64 {
        self.bins.iter().map(|c| c.norm_sqr()).sum()
    }

    /// Σ|X|² over bins with `low <= |f| <= high`
    pub fn band_energy(&self, low: f64, high: f64) -> f64 {
        self.band(low, high).map(|c| c.norm_sqr()).sum()
    }

    /// sqrt(mean |X|²) over bins with `low <= |f| <= high`, 0 when the band is empty
    pub fn band_rms(&self, low: f64, high: f64) -> f64 {
        let (count, energy) = self
            .band(low, high)
            .fold((0usize, 0.0), |(n, e), c| (n + 1, e + c.norm_sqr()));
        if count == 0 {
            0.0
        } else {
            (energy / count as f64).sqrt()
        }
    }

    fn band(&self, low: f64, high: f64) -> impl Iterator<Item = &Complex<f64>> + '_ {
        self.bins.iter().enumerate().filter_map(move |(k, c)| {
            let f = self.frequency(k).abs();
            (f >= low && f <= high).then_some(c)
        })
    }
}

/// One-sided STFT power, rows are frequency bins and columns are frames
#[derive(Debug, Clone)]
pub struct StftPower {
    pub psd: Array2<f64>,
    pub segment: usize,
    sample_rate: f64,
}

impl StftPower {
    /// Power averaged over frames, one value per bin
    pub fn mean_psd(&self) -> Vec<f64> {
        self.psd
            .mean_axis(Axis(1))
            .map(|m| m.to_vec())
            .unwrap_or_default()
    }

    /// Total power per frame
    pub fn frame_energy(&self) -> Vec<f64> {
        self.psd.sum_axis(Axis(0)).to_vec()
    }

    pub fn nearest_bin(&self, target: f64) -> usize {
        let max_bin = self.psd.nrows().saturating_sub(1);
        nearest_positive_bin(target, self.segment, self.sample_rate, max_bin)
    }
}

/// FFT Analyzer for spectra, analytic signals and STFTs
pub struct SpectrumAnalyzer {
    /// FFT planner for efficient computation
    planner: FftPlanner<f64>,
    /// Sampling frequency (Hz)
    sample_rate: f64,
}

impl SpectrumAnalyzer {
    /// Create a new spectrum analyzer
    pub fn new(sample_rate: f64) -> Self {
        Self {
            planner: FftPlanner::new(),
            sample_rate,
        }
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    fn forward(&mut self, buffer: &mut [Complex<f64>]) {
        if buffer.is_empty() {
            return;
        }
        let fft = self.planner.plan_fft_forward(buffer.len());
        fft.process(buffer);
    }

    fn inverse(&mut self, buffer: &mut [Complex<f64>]) {
        if buffer.is_empty() {
            return;
        }
        let n = buffer.len() as f64;
        let fft = self.planner.plan_fft_inverse(buffer.len());
        fft.process(buffer);
        for c in buffer.iter_mut() {
            *c /= n;
        }
    }

    /// Spectrum of the signal without windowing
    pub fn spectrum(&mut self, signal: &[f64]) -> Spectrum {
        let mut bins: Vec<Complex<f64>> = signal.iter().map(|&v| Complex::new(v, 0.0)).collect();
        self.forward(&mut bins);
        Spectrum {
            bins,
            sample_rate: self.sample_rate,
        }
    }

    /// Spectrum of the signal after a symmetric Hann window
    pub fn hann_spectrum(&mut self, signal: &[f64]) -> Spectrum {
        let window = hann_symmetric(signal.len());
        let mut bins: Vec<Complex<f64>> = signal
            .iter()
            .zip(&window)
            .map(|(&v, &w)| Complex::new(v * w, 0.0))
            .collect();
        self.forward(&mut bins);
        Spectrum {
            bins,
            sample_rate: self.sample_rate,
        }
    }

    /// Analytic signal `x + jH{x}` via the FFT
    pub fn analytic(&mut self, signal: &[f64]) -> Vec<Complex<f64>> {
        let n = signal.len();
        let mut buffer: Vec<Complex<f64>> = signal.iter().map(|&v| Complex::new(v, 0.0)).collect();
        if n == 0 {
            return buffer;
        }
        self.forward(&mut buffer);

        // h = [1, 2, ..., 2, (1 at n/2 for even n), 0, ..., 0]
        let half = n / 2;
        for (k, c) in buffer.iter_mut().enumerate() {
            let h = if k == 0 || (n % 2 == 0 && k == half) {
                1.0
            } else if (n % 2 == 0 && k < half) || (n % 2 == 1 && k <= half) {
                2.0
            } else {
                0.0
            };
            *c *= h;
        }

        self.inverse(&mut buffer);
        buffer
    }

    /// Hilbert envelope `|analytic(x)|`
    pub fn envelope(&mut self, signal: &[f64]) -> Vec<f64> {
        self.analytic(signal).iter().map(|c| c.norm()).collect()
    }

    /// Instantaneous phase `arg(analytic(x))`, wrapped to (-π, π]
    pub fn instantaneous_phase(&mut self, signal: &[f64]) -> Vec<f64> {
        self.analytic(signal).iter().map(|c| c.arg()).collect()
    }

    /// One-sided STFT power with a periodic Hann window, half-segment zero
    /// padding at both ends, trailing zero padding to a whole number of hops,
    /// and 1/Σwindow scaling
    pub fn stft_power(&mut self, signal: &[f64], segment: usize, hop: usize) -> StftPower {
        let segment = segment.max(1);
        let hop = hop.max(1);
        let n_freq = segment / 2 + 1;

        let pad = segment / 2;
        let mut padded = vec![0.0; pad];
        padded.extend_from_slice(signal);
        padded.extend(std::iter::repeat(0.0).take(pad));
        let extra = if padded.len() < segment {
            segment - padded.len()
        } else {
            (hop - (padded.len() - segment) % hop) % hop
        };
        padded.extend(std::iter::repeat(0.0).take(extra));

        let window = hann_periodic(segment);
        let scale = 1.0 / window.iter().sum::<f64>();
        let n_frames = (padded.len() - segment) / hop + 1;

        let fft = self.planner.plan_fft_forward(segment);
        let mut psd = Array2::zeros((n_freq, n_frames));
        let mut buffer = vec![Complex::new(0.0, 0.0); segment];

        for frame in 0..n_frames {
            let start = frame * hop;
            for (i, slot) in buffer.iter_mut().enumerate() {
                *slot = Complex::new(padded[start + i] * window[i], 0.0);
            }
            fft.process(&mut buffer);
            for bin in 0..n_freq {
                psd[[bin, frame]] = (buffer[bin] * scale).norm_sqr();
            }
        }

        StftPower {
            psd,
            segment,
            sample_rate: self.sample_rate,
        }
    }
}

/// Unwrap phase jumps larger than π
pub fn unwrap_phase(phases: &[f64]) -> Vec<f64> {
    let mut out = Vec::with_capacity(phases.len());
    let Some(&first) = phases.first() else {
        return out;
    };
    out.push(first);

    let mut correction = 0.0;
    for pair in phases.windows(2) {
        let dd = pair[1] - pair[0];
        let mut ddmod = (dd + PI).rem_euclid(2.0 * PI) - PI;
        if ddmod == -PI && dd > 0.0 {
            ddmod = PI;
        }
        if dd.abs() >= PI {
            correction += ddmod - dd;
        }
        out.push(pair[1] + correction);
    }
    out
}

//! Stator Features: sequence asymmetry, harmonic distortion, phase
//! displacement and band energy distribution

use crate::features::{FeatureMap, WindowContext, PHASES};
use crate::fft::{unwrap_phase, SpectrumAnalyzer};
use crate::statistics::{ratio, StatisticalFeatures};
use rustfft::num_complex::Complex;
use std::f64::consts::PI;

pub const FIELDS: &[&str] = &[
    "k2_asymmetry",
    "thd_A",
    "thd_B",
    "thd_C",
    "h3_ratio_A",
    "h5_ratio_A",
    "h7_ratio_A",
    "h3_ratio_B",
    "h5_ratio_B",
    "h7_ratio_B",
    "h3_ratio_C",
    "h5_ratio_C",
    "h7_ratio_C",
    "phase_deviation_ab",
    "phase_deviation_bc",
    "phase_deviation_ca",
    "modulation_coeff_A",
    "modulation_coeff_B",
    "modulation_coeff_C",
    "rel_energy_low_band_A",
    "rel_energy_medium_band_A",
    "rel_energy_high_band_A",
    "rel_energy_low_band_B",
    "rel_energy_medium_band_B",
    "rel_energy_high_band_B",
    "rel_energy_low_band_C",
    "rel_energy_medium_band_C",
    "rel_energy_high_band_C",
];

/// Inclusive |f| bands (Hz) for relative energy
const ENERGY_BANDS: [(&str, f64, f64); 3] = [
    ("low", 0.0, 25.0),
    ("medium", 25.0, 100.0),
    ("high", 100.0, 500.0),
];

pub(crate) fn extract(ctx: &WindowContext<'_>, analyzer: &mut SpectrumAnalyzer) -> FeatureMap {
    let mut out = FeatureMap::new();
    let f = ctx.freqs;
    let nyquist = f.nyquist();

    // Negative-to-positive sequence ratio of the channel means
    let a = Complex::from_polar(1.0, 2.0 * PI / 3.0);
    let means: Vec<Complex<f64>> = ctx
        .signals
        .iter()
        .map(|s| Complex::new(StatisticalFeatures::compute(s).mean, 0.0))
        .collect();
    let positive = (means[0] + a * means[1] + a * a * means[2]) / 3.0;
    let negative = (means[0] + a * a * means[1] + a * means[2]) / 3.0;
    out.insert("k2_asymmetry".into(), ratio(negative.norm(), positive.norm()));

    for (i, phase) in PHASES.iter().enumerate() {
        let spectrum = &ctx.spectra[i];
        let fundamental = spectrum.magnitude_at(f.supply);

        let harmonic_power: f64 = (2..=10)
            .map(|h| f.supply * h as f64)
            .filter(|&hf| hf < nyquist)
            .map(|hf| spectrum.magnitude_at(hf).powi(2))
            .sum();
        out.insert(format!("thd_{phase}"), ratio(harmonic_power.sqrt(), fundamental));

        for h in [3u32, 5, 7] {
            let hf = f.supply * h as f64;
            let value = if hf < nyquist {
                ratio(spectrum.magnitude_at(hf), fundamental)
            } else {
                0.0
            };
            out.insert(format!("h{h}_ratio_{phase}"), value);
        }
    }

    let phases: Vec<Vec<f64>> = ctx
        .signals
        .iter()
        .map(|s| analyzer.instantaneous_phase(s))
        .collect();
    let ideal = 2.0 * PI / 3.0;
    for (name, x, y) in [("ab", 0, 1), ("bc", 1, 2), ("ca", 2, 0)] {
        let diff: Vec<f64> = phases[x].iter().zip(&phases[y]).map(|(p, q)| p - q).collect();
        let unwrapped = unwrap_phase(&diff);
        let mean = StatisticalFeatures::compute(&unwrapped).mean;
        out.insert(format!("phase_deviation_{name}"), (mean - ideal).abs());
    }

    for (i, phase) in PHASES.iter().enumerate() {
        let envelope = StatisticalFeatures::compute(&analyzer.envelope(ctx.signals[i]));
        out.insert(
            format!("modulation_coeff_{phase}"),
            ratio(envelope.std_dev, envelope.mean),
        );
    }

    for (i, phase) in PHASES.iter().enumerate() {
        let spectrum = &ctx.spectra[i];
        let total = spectrum.total_energy();
        for (band, low, high) in ENERGY_BANDS {
            out.insert(
                format!("rel_energy_{band}_band_{phase}"),
                ratio(spectrum.band_energy(low, high), total),
            );
        }
    }

    out
}

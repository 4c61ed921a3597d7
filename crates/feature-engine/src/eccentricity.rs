//! Eccentricity Features: inter-phase level and correlation spread,
//! rotor-frequency sidebands and envelope modulation

use crate::features::{FeatureMap, WindowContext, PHASES};
use crate::fft::SpectrumAnalyzer;
use crate::statistics::{pearson, ratio, StatisticalFeatures, EPSILON};

pub const FIELDS: &[&str] = &[
    "ecc_current_asymmetry",
    "ecc_max_deviation",
    "ecc_rms_variance",
    "ecc_max_min_ratio",
    "ecc_corr_ab",
    "ecc_corr_bc",
    "ecc_corr_ca",
    "ecc_mean_correlation",
    "ecc_correlation_variance",
    "ecc_min_correlation",
    "ecc_main_1_lower_amp_A",
    "ecc_main_1_lower_ratio_A",
    "ecc_main_1_upper_amp_A",
    "ecc_main_1_upper_ratio_A",
    "ecc_main_1_lower_amp_B",
    "ecc_main_1_upper_amp_B",
    "ecc_main_1_lower_amp_C",
    "ecc_main_1_upper_amp_C",
    "ecc_main_2_lower_ratio_A",
    "ecc_rotor_freq_modulation_A",
    "ecc_2rotor_freq_modulation_A",
    "ecc_envelope_modulation_A",
    "ecc_rotor_freq_modulation_B",
    "ecc_envelope_modulation_B",
    "ecc_rotor_freq_modulation_C",
    "ecc_harmonic_ratio_A",
    "ecc_total_harmonic_energy_A",
    "ecc_harmonic_ratio_B",
    "ecc_harmonic_ratio_C",
];

pub(crate) fn extract(ctx: &WindowContext<'_>, analyzer: &mut SpectrumAnalyzer) -> FeatureMap {
    let mut out = FeatureMap::new();
    let f = ctx.freqs;

    let rms: Vec<f64> = ctx
        .signals
        .iter()
        .map(|s| StatisticalFeatures::compute(s).rms)
        .collect();
    let spread = StatisticalFeatures::compute(&rms);
    let mean_rms = spread.mean;

    let (asymmetry, max_deviation, rms_variance) = if mean_rms > EPSILON {
        let squared: f64 = rms.iter().map(|r| (r - mean_rms).powi(2)).sum();
        let deviation = rms.iter().fold(0.0_f64, |acc, r| acc.max((r - mean_rms).abs()));
        (
            squared.sqrt() / mean_rms,
            deviation / mean_rms,
            spread.variance / (mean_rms * mean_rms),
        )
    } else {
        (0.0, 0.0, 0.0)
    };
    out.insert("ecc_current_asymmetry".into(), asymmetry);
    out.insert("ecc_max_deviation".into(), max_deviation);
    out.insert("ecc_rms_variance".into(), rms_variance);
    out.insert("ecc_max_min_ratio".into(), ratio(spread.max, spread.min));

    let [a, b, c] = ctx.signals;
    let correlations = [pearson(a, b), pearson(b, c), pearson(c, a)];
    out.insert("ecc_corr_ab".into(), correlations[0]);
    out.insert("ecc_corr_bc".into(), correlations[1]);
    out.insert("ecc_corr_ca".into(), correlations[2]);
    let corr = StatisticalFeatures::compute(&correlations);
    out.insert("ecc_mean_correlation".into(), corr.mean);
    out.insert("ecc_correlation_variance".into(), corr.variance);
    out.insert("ecc_min_correlation".into(), corr.min);

    for (i, phase) in PHASES.iter().enumerate() {
        let spectrum = &ctx.spectra[i];
        let main = spectrum.magnitude_at(f.supply);

        let lower = if f.ecc_main_1_lower > 0.0 {
            spectrum.magnitude_at(f.ecc_main_1_lower)
        } else {
            0.0
        };
        let upper = spectrum.magnitude_at(f.ecc_main_1_upper);
        out.insert(format!("ecc_main_1_lower_amp_{phase}"), lower);
        out.insert(format!("ecc_main_1_upper_amp_{phase}"), upper);

        if *phase == "A" {
            out.insert("ecc_main_1_lower_ratio_A".into(), ratio(lower, main));
            out.insert("ecc_main_1_upper_ratio_A".into(), ratio(upper, main));
            let second = if f.ecc_main_2_lower > 0.0 {
                ratio(spectrum.magnitude_at(f.ecc_main_2_lower), main)
            } else {
                0.0
            };
            out.insert("ecc_main_2_lower_ratio_A".into(), second);
        }
    }

    for (i, phase) in PHASES.iter().enumerate() {
        let envelope = analyzer.envelope(ctx.signals[i]);
        let envelope_spectrum = analyzer.spectrum(&envelope);

        out.insert(
            format!("ecc_rotor_freq_modulation_{phase}"),
            envelope_spectrum.magnitude_at(f.rotor),
        );
        if *phase == "A" {
            out.insert(
                "ecc_2rotor_freq_modulation_A".into(),
                envelope_spectrum.magnitude_at(2.0 * f.rotor),
            );
        }
        if *phase != "C" {
            let stats = StatisticalFeatures::compute(&envelope);
            out.insert(
                format!("ecc_envelope_modulation_{phase}"),
                ratio(stats.std_dev, stats.mean),
            );
        }
    }

    let components = [f.ecc_main_1_lower, f.ecc_main_1_upper, f.ecc_main_2_lower];
    for (i, phase) in PHASES.iter().enumerate() {
        let spectrum = &ctx.spectra[i];
        let fundamental = spectrum.magnitude_at(f.supply);
        let energy: f64 = components
            .iter()
            .filter(|&&freq| freq > 0.0 && freq < f.nyquist())
            .map(|&freq| spectrum.magnitude_at(freq).powi(2))
            .sum();

        let harmonic_ratio = if fundamental > EPSILON {
            energy / (fundamental * fundamental)
        } else {
            0.0
        };
        out.insert(format!("ecc_harmonic_ratio_{phase}"), harmonic_ratio);
        if *phase == "A" {
            out.insert("ecc_total_harmonic_energy_A".into(), energy);
        }
    }

    out
}

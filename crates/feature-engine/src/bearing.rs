//! Bearing Features: characteristic defect frequencies, band-passed
//! envelope statistics and high-frequency energy

use crate::features::{FeatureMap, WindowContext, PHASES};
use crate::fft::SpectrumAnalyzer;
use crate::statistics::{ratio, StatisticalFeatures};

pub const FIELDS: &[&str] = &[
    "bearing_bpfo_amp_A",
    "bearing_bpfi_amp_A",
    "bearing_bpfo_amp_B",
    "bearing_bpfi_amp_B",
    "bearing_bpfo_amp_C",
    "bearing_bpfi_amp_C",
    "bearing_bsf_amp_A",
    "bearing_ftf_amp_A",
    "bearing_bpfo_2h_amp_A",
    "bearing_bpfi_2h_amp_A",
    "bearing_bpfo_band_rms_A",
    "bearing_bpfi_band_rms_A",
    "bearing_env_kurtosis_A",
    "bearing_env_rms_A",
    "bearing_env_peak_factor_A",
    "bearing_env_bpfo_A",
    "bearing_env_bpfi_A",
    "bearing_hf_energy_A",
    "bearing_crest_factor_A",
    "bearing_env_kurtosis_B",
    "bearing_env_rms_B",
    "bearing_env_peak_factor_B",
    "bearing_hf_energy_B",
    "bearing_crest_factor_B",
    "bearing_env_kurtosis_C",
    "bearing_env_rms_C",
    "bearing_env_peak_factor_C",
    "bearing_hf_energy_C",
    "bearing_env_kurtosis_max",
    "bearing_hf_energy_max",
];

/// High-frequency band (Hz) for the energy ratio
const HF_BAND: (f64, f64) = (1000.0, 5000.0);

/// Half-width of the defect-frequency bands, relative to the frequency
const BAND_HALF_WIDTH: f64 = 0.1;

pub(crate) fn extract(ctx: &WindowContext<'_>, analyzer: &mut SpectrumAnalyzer) -> FeatureMap {
    let mut out = FeatureMap::new();
    let f = ctx.freqs;
    let defects = [("bpfo", f.bpfo), ("bpfi", f.bpfi)];

    for (i, phase) in PHASES.iter().enumerate() {
        for (name, freq) in defects {
            out.insert(
                format!("bearing_{name}_amp_{phase}"),
                ctx.spectra[i].magnitude_at(freq),
            );
        }
    }

    let spectrum_a = &ctx.spectra[0];
    out.insert("bearing_bsf_amp_A".into(), spectrum_a.magnitude_at(f.bsf));
    out.insert("bearing_ftf_amp_A".into(), spectrum_a.magnitude_at(f.ftf));

    for (name, freq) in defects {
        let harmonic = 2.0 * freq;
        let value = if harmonic < f.nyquist() {
            spectrum_a.magnitude_at(harmonic)
        } else {
            0.0
        };
        out.insert(format!("bearing_{name}_2h_amp_A"), value);

        let half_width = BAND_HALF_WIDTH * freq;
        out.insert(
            format!("bearing_{name}_band_rms_A"),
            spectrum_a.band_rms(freq - half_width, freq + half_width),
        );
    }

    let mut kurtosis_max = f64::MIN;
    let mut hf_max = f64::MIN;

    for (i, phase) in PHASES.iter().enumerate() {
        let signal = ctx.signals[i];

        let (kurtosis, env_rms, peak_factor) = match ctx.envelope_filter {
            Some(filter) => {
                let envelope = analyzer.envelope(&filter.filtfilt(signal));
                let stats = StatisticalFeatures::compute(&envelope);

                if *phase == "A" {
                    let envelope_spectrum = analyzer.spectrum(&envelope);
                    for (name, freq) in defects {
                        out.insert(
                            format!("bearing_env_{name}_A"),
                            envelope_spectrum.magnitude_at(freq),
                        );
                    }
                }
                (stats.kurtosis, stats.rms, ratio(stats.max, stats.rms))
            }
            None => {
                if *phase == "A" {
                    out.insert("bearing_env_bpfo_A".into(), 0.0);
                    out.insert("bearing_env_bpfi_A".into(), 0.0);
                }
                (0.0, 0.0, 0.0)
            }
        };
        out.insert(format!("bearing_env_kurtosis_{phase}"), kurtosis);
        out.insert(format!("bearing_env_rms_{phase}"), env_rms);
        out.insert(format!("bearing_env_peak_factor_{phase}"), peak_factor);
        kurtosis_max = kurtosis_max.max(kurtosis);

        let spectrum = &ctx.spectra[i];
        let hf = ratio(spectrum.band_energy(HF_BAND.0, HF_BAND.1), spectrum.total_energy());
        out.insert(format!("bearing_hf_energy_{phase}"), hf);
        hf_max = hf_max.max(hf);

        if *phase != "C" {
            let stats = StatisticalFeatures::compute(signal);
            out.insert(
                format!("bearing_crest_factor_{phase}"),
                ratio(stats.peak, stats.rms),
            );
        }
    }

    out.insert("bearing_env_kurtosis_max".into(), kurtosis_max);
    out.insert("bearing_hf_energy_max".into(), hf_max);

    out
}

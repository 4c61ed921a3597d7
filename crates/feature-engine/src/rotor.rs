//! Rotor Features: broken-bar slip sidebands around the supply frequency

use crate::features::{FeatureMap, WindowContext, PHASES};
use crate::fft::SpectrumAnalyzer;
use crate::statistics::{ratio, variance, EPSILON};

pub const FIELDS: &[&str] = &[
    "rotor_sb1_lower_ratio_A",
    "rotor_sb1_upper_ratio_A",
    "rotor_sb2_lower_ratio_A",
    "rotor_sb1_lower_amp_A",
    "rotor_sb1_upper_amp_A",
    "rotor_sb1_lower_ratio_B",
    "rotor_sb1_upper_ratio_B",
    "rotor_sb1_upper_ratio_C",
    "rotor_sb1_lower_ratio_combined",
    "rotor_stft_ratio_A",
    "rotor_stft_main_energy_A",
    "rotor_stft_sb1_energy_A",
    "rotor_stft_energy_var_A",
    "rotor_stft_ratio_B",
    "rotor_stft_ratio_C",
];

pub(crate) fn extract(ctx: &WindowContext<'_>, analyzer: &mut SpectrumAnalyzer) -> FeatureMap {
    let mut out = FeatureMap::new();
    let f = ctx.freqs;

    let mut combined = 0.0;
    for (i, phase) in PHASES.iter().enumerate() {
        let spectrum = &ctx.spectra[i];
        let main = spectrum.magnitude_at(f.supply);

        // all sideband values are zeroed when the fundamental is absent
        let (sb1_lower, sb1_upper, sb2_lower) = if main > EPSILON {
            (
                spectrum.magnitude_at(f.sb1_lower),
                spectrum.magnitude_at(f.sb1_upper),
                spectrum.magnitude_at(f.sb2_lower),
            )
        } else {
            (0.0, 0.0, 0.0)
        };
        let lower_ratio = ratio(sb1_lower, main);
        let upper_ratio = ratio(sb1_upper, main);
        combined += lower_ratio;

        match *phase {
            "A" => {
                out.insert("rotor_sb1_lower_ratio_A".into(), lower_ratio);
                out.insert("rotor_sb1_upper_ratio_A".into(), upper_ratio);
                out.insert("rotor_sb2_lower_ratio_A".into(), ratio(sb2_lower, main));
                out.insert("rotor_sb1_lower_amp_A".into(), sb1_lower);
                out.insert("rotor_sb1_upper_amp_A".into(), sb1_upper);
            }
            "B" => {
                out.insert("rotor_sb1_lower_ratio_B".into(), lower_ratio);
                out.insert("rotor_sb1_upper_ratio_B".into(), upper_ratio);
            }
            _ => {
                out.insert("rotor_sb1_upper_ratio_C".into(), upper_ratio);
            }
        }
    }
    out.insert("rotor_sb1_lower_ratio_combined".into(), combined / 3.0);

    let (segment, hop) = ctx.config.stft_geometry(ctx.signals[0].len());
    for (i, phase) in PHASES.iter().enumerate() {
        let stft = analyzer.stft_power(ctx.signals[i], segment, hop);
        let mean_psd = stft.mean_psd();
        let at = |target: f64| mean_psd.get(stft.nearest_bin(target)).copied().unwrap_or(0.0);

        let main = at(f.supply);
        let sidebands = at(f.sb1_lower) + at(f.sb1_upper);
        out.insert(format!("rotor_stft_ratio_{phase}"), ratio(sidebands, main));

        if *phase == "A" {
            out.insert("rotor_stft_main_energy_A".into(), main);
            out.insert("rotor_stft_sb1_energy_A".into(), sidebands);
            out.insert("rotor_stft_energy_var_A".into(), variance(&stft.frame_energy()));
        }
    }

    out
}

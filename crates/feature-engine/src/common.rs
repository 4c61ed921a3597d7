//! Common Features: per-phase level statistics, imbalance and Park vector

use crate::features::{FeatureMap, WindowContext, PHASES};
use crate::statistics::{ratio, StatisticalFeatures, EPSILON};

pub const FIELDS: &[&str] = &[
    "rms_A",
    "mean_A",
    "std_A",
    "rms_B",
    "mean_B",
    "std_B",
    "rms_C",
    "mean_C",
    "std_C",
    "total_imbalance",
    "rms_imbalance",
    "imbalance_ab",
    "imbalance_bc",
    "imbalance_ca",
    "park_ellipticity",
    "park_mag_mean",
    "park_mag_std",
];

/// Short labels of [`FIELDS`], used when reporting attention weights
pub const SHORT_NAMES: &[&str] = &[
    "rms_A",
    "mean_A",
    "std_A",
    "rms_B",
    "mean_B",
    "std_B",
    "rms_C",
    "mean_C",
    "std_C",
    "total_imb",
    "rms_imb",
    "imb_ab",
    "imb_bc",
    "imb_ca",
    "park_ell",
    "park_mean",
    "park_std",
];

pub(crate) fn extract(ctx: &WindowContext<'_>) -> FeatureMap {
    let mut out = FeatureMap::new();

    let mut rms = [0.0; 3];
    for (i, phase) in PHASES.iter().enumerate() {
        let stats = StatisticalFeatures::compute(ctx.signals[i]);
        out.insert(format!("rms_{phase}"), stats.rms);
        out.insert(format!("mean_{phase}"), stats.mean);
        out.insert(format!("std_{phase}"), stats.std_dev);
        rms[i] = stats.rms;
    }

    let [a, b, c] = rms;
    let total = a + b + c;
    let imbalance = if total > EPSILON {
        ((a - b).abs() + (b - c).abs() + (c - a).abs()) / total
    } else {
        0.0
    };
    out.insert("total_imbalance".into(), imbalance);
    out.insert("rms_imbalance".into(), imbalance);

    let pair = |x: f64, y: f64| {
        if total > EPSILON {
            ratio((x - y).abs(), x + y)
        } else {
            0.0
        }
    };
    out.insert("imbalance_ab".into(), pair(a, b));
    out.insert("imbalance_bc".into(), pair(b, c));
    out.insert("imbalance_ca".into(), pair(c, a));

    // Park transform: i_d = 2/3(a - b/2 - c/2), i_q = (b - c)/√3
    let [ia, ib, ic] = ctx.signals;
    let magnitude: Vec<f64> = ia
        .iter()
        .zip(ib)
        .zip(ic)
        .map(|((&a, &b), &c)| {
            let i_d = (2.0 / 3.0) * (a - 0.5 * b - 0.5 * c);
            let i_q = (b - c) / 3f64.sqrt();
            (i_d * i_d + i_q * i_q).sqrt()
        })
        .collect();
    let park = StatisticalFeatures::compute(&magnitude);
    out.insert("park_ellipticity".into(), ratio(park.std_dev, park.mean));
    out.insert("park_mag_mean".into(), park.mean);
    out.insert("park_mag_std".into(), park.std_dev);

    out
}

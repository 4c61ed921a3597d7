//! Statistical Features Computation

/// Denominators at or below this produce a zero ratio
pub const EPSILON: f64 = 1e-10;

/// `num / den`, or 0 when `den` is not above [`EPSILON`]
#[inline]
pub fn ratio(num: f64, den: f64) -> f64 {
    if den > EPSILON {
        num / den
    } else {
        0.0
    }
}

/// Statistical features for a signal
#[derive(Debug, Clone, Default)]
pub struct StatisticalFeatures {
    /// Mean value
    pub mean: f64,
    /// Population standard deviation
    pub std_dev: f64,
    /// Population variance
    pub variance: f64,
    /// Root mean square
    pub rms: f64,
    /// Excess kurtosis (0 for flat signals)
    pub kurtosis: f64,
    /// Minimum value
    pub min: f64,
    /// Maximum value
    pub max: f64,
    /// Largest absolute value
    pub peak: f64,
}

impl StatisticalFeatures {
    /// Compute statistical features from a slice of values
    pub fn compute(values: &[f64]) -> Self {
        if values.is_empty() {
            return Self::default();
        }

        let n = values.len() as f64;

        let mean = values.iter().sum::<f64>() / n;
        let rms = (values.iter().map(|v| v * v).sum::<f64>() / n).sqrt();

        let min = values.iter().cloned().fold(f64::MAX, f64::min);
        let max = values.iter().cloned().fold(f64::MIN, f64::max);
        let peak = values.iter().fold(0.0_f64, |acc, v| acc.max(v.abs()));

        let mut m2 = 0.0;
        for &v in values {
            let d = v - mean;
            m2 += d * d;
        }
        let variance = m2 / n;
        let std_dev = variance.sqrt();

        // E[((X-μ)/σ)⁴] - 3
        let kurtosis = if std_dev < EPSILON {
            0.0
        } else {
            values
                .iter()
                .map(|&v| ((v - mean) / std_dev).powi(4))
                .sum::<f64>()
                / n
                - 3.0
        };

        Self {
            mean,
            std_dev,
            variance,
            rms,
            kurtosis,
            min,
            max,
            peak,
        }
    }
}

/// Population variance
pub fn variance(values: &[f64]) -> f64 {
    StatisticalFeatures::compute(values).variance
}

/// Pearson correlation, 0 when either signal is flat
pub fn pearson(a: &[f64], b: &[f64]) -> f64 {
    let n = a.len().min(b.len());
    if n == 0 {
        return 0.0;
    }
    let (a, b) = (&a[..n], &b[..n]);
    let mean_a = a.iter().sum::<f64>() / n as f64;
    let mean_b = b.iter().sum::<f64>() / n as f64;

    let mut cov = 0.0;
    let mut var_a = 0.0;
    let mut var_b = 0.0;
    for (&x, &y) in a.iter().zip(b) {
        let dx = x - mean_a;
        let dy = y - mean_b;
        cov += dx * dy;
        var_a += dx * dx;
        var_b += dy * dy;
    }
    let n = n as f64;
    ratio(cov / n, ((var_a / n) * (var_b / n)).sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean_and_rms() {
        let values = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        let stats = StatisticalFeatures::compute(&values);
        assert!((stats.mean - 3.0).abs() < 1e-12);
        assert!((stats.rms - 11.0_f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_std_dev_computation() {
        let values = vec![2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        let stats = StatisticalFeatures::compute(&values);
        assert!((stats.std_dev - 2.0).abs() < 1e-12);
        assert!((stats.variance - 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_kurtosis_of_two_level_signal() {
        // symmetric two-point distribution has kurtosis 1, excess -2
        let values = vec![1.0, -1.0, 1.0, -1.0];
        let stats = StatisticalFeatures::compute(&values);
        assert!((stats.kurtosis + 2.0).abs() < 1e-12);
        assert_eq!(stats.peak, 1.0);
    }

    #[test]
    fn test_flat_signal_guards() {
        let stats = StatisticalFeatures::compute(&[3.0; 16]);
        assert_eq!(stats.kurtosis, 0.0);
        assert_eq!(pearson(&[3.0; 16], &[1.0; 16]), 0.0);
    }

    #[test]
    fn test_pearson() {
        let a = vec![1.0, 2.0, 3.0, 4.0];
        let b: Vec<f64> = a.iter().map(|v| -2.0 * v + 1.0).collect();
        assert!((pearson(&a, &a) - 1.0).abs() < 1e-12);
        assert!((pearson(&a, &b) + 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_ratio_epsilon() {
        assert_eq!(ratio(1.0, 1e-10), 0.0);
        assert_eq!(ratio(1.0, 0.0), 0.0);
        assert_eq!(ratio(1.0, 2.0), 0.5);
    }

    #[test]
    fn test_empty_values() {
        let stats = StatisticalFeatures::compute(&[]);
        assert_eq!(stats.mean, 0.0);
        assert_eq!(stats.rms, 0.0);
    }
}

//! Anomaly Scorer
//!
//! Per component: reconstruction error against a fixed threshold, a
//! threshold-distance confidence blended with an uncertainty confidence from
//! the spread of stochastic errors, and stability/focus statistics of the
//! attention over the common features. Components are then aggregated with
//! fixed weights into a system health state.

use crate::config::ScoringConfig;
use crate::verdict::{AnomalyVerdict, ComponentVerdict, FeatureContribution, HealthState, SystemVerdict};
use crate::{Component, ScoringError};
use feature_engine::{FeatureSchema, COMMON_SHORT_NAMES};
use inference_engine::{PredictiveModel, Reconstruction};
use std::collections::BTreeMap;
use std::ops::Range;
use tracing::debug;

/// Weight of the baseline confidence in the composite
const BASELINE_WEIGHT: f64 = 0.7;
/// Weight of the uncertainty confidence in the composite
const UNCERTAINTY_WEIGHT: f64 = 0.3;
/// Scale of uncertainty in `1 / (1 + k * uncertainty)`
const UNCERTAINTY_SCALE: f64 = 20.0;
/// Entropy log offset
const ENTROPY_EPSILON: f64 = 1e-8;
/// Number of reported top features
const TOP_FEATURES: usize = 3;

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

/// Population standard deviation
fn std_dev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    (values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64).sqrt()
}

fn mean_squared_error(target: &[f64], reconstruction: &[f64]) -> f64 {
    let squared: Vec<f64> = target
        .iter()
        .zip(reconstruction)
        .map(|(t, r)| (t - r).powi(2))
        .collect();
    mean(&squared)
}

pub struct AnomalyScorer {
    config: ScoringConfig,
    dimension: usize,
    ranges: Vec<(Component, Range<usize>)>,
}

impl AnomalyScorer {
    /// Build a scorer for vectors laid out by `schema`. Every component needs
    /// a threshold and a slice in the schema.
    pub fn new(config: ScoringConfig, schema: &FeatureSchema) -> Result<Self, ScoringError> {
        let mut ranges = Vec::with_capacity(Component::ALL.len());
        for component in Component::ALL {
            config.threshold(component)?;
            let range = component
                .range(schema)
                .ok_or(ScoringError::MissingComponent(component))?;
            ranges.push((component, range));
        }
        Ok(Self {
            config,
            dimension: schema.target_len(),
            ranges,
        })
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    /// Run one deterministic and `monte_carlo_samples` stochastic passes of
    /// `model` over a normalized vector, then score them
    pub fn evaluate(&self, model: &dyn PredictiveModel, normalized: &[f64]) -> Result<AnomalyVerdict, ScoringError> {
        let deterministic = model.score(normalized, false)?;
        let stochastic = (0..self.config.monte_carlo_samples)
            .map(|_| model.score(normalized, true))
            .collect::<Result<Vec<_>, _>>()?;
        self.score(normalized, &deterministic, &stochastic)
    }

    /// Score precomputed model outputs
    pub fn score(
        &self,
        normalized: &[f64],
        deterministic: &Reconstruction,
        stochastic: &[Reconstruction],
    ) -> Result<AnomalyVerdict, ScoringError> {
        if normalized.len() != self.dimension {
            return Err(ScoringError::InputMismatch {
                expected: self.dimension,
                actual: normalized.len(),
            });
        }

        let mut components = BTreeMap::new();
        for (component, range) in &self.ranges {
            let verdict = self.score_component(
                *component,
                &normalized[range.clone()],
                deterministic,
                stochastic,
            )?;
            components.insert(*component, verdict);
        }

        let system = self.aggregate(&components);
        debug!(
            "Scored vector: {} ({} anomalous components, error {:.6})",
            system.health_state, system.anomaly_count, system.aggregated_error
        );
        Ok(AnomalyVerdict { components, system })
    }

    fn reconstruction<'a>(
        component: Component,
        output: &'a Reconstruction,
        expected: usize,
    ) -> Result<&'a inference_engine::ComponentOutput, ScoringError> {
        let out = output
            .component(component)
            .ok_or(ScoringError::MissingComponent(component))?;
        if out.reconstruction.len() != expected {
            return Err(ScoringError::LengthMismatch {
                component,
                expected,
                actual: out.reconstruction.len(),
            });
        }
        Ok(out)
    }

    fn score_component(
        &self,
        component: Component,
        target: &[f64],
        deterministic: &Reconstruction,
        stochastic: &[Reconstruction],
    ) -> Result<ComponentVerdict, ScoringError> {
        let threshold = self.config.threshold(component)?;
        let base = Self::reconstruction(component, deterministic, target.len())?;
        let error = mean_squared_error(target, &base.reconstruction);

        let is_anomaly = error > threshold;
        let baseline_confidence = if is_anomaly {
            (1.0 - (error - threshold) / threshold).max(0.1)
        } else {
            ((threshold - error) / threshold).min(0.9)
        };

        let mut mc_errors = Vec::with_capacity(stochastic.len());
        let mut attention = Vec::with_capacity(stochastic.len());
        for pass in stochastic {
            let out = Self::reconstruction(component, pass, target.len())?;
            mc_errors.push(mean_squared_error(target, &out.reconstruction));
            attention.push(out.attention.as_slice());
        }
        if attention.is_empty() {
            attention.push(base.attention.as_slice());
        }

        let uncertainty = std_dev(&mc_errors);
        let uncertainty_confidence = 1.0 / (1.0 + UNCERTAINTY_SCALE * uncertainty);
        let confidence = BASELINE_WEIGHT * baseline_confidence + UNCERTAINTY_WEIGHT * uncertainty_confidence;

        let width = attention[0].len();
        if let Some(bad) = attention.iter().find(|a| a.len() != width) {
            return Err(ScoringError::LengthMismatch {
                component,
                expected: width,
                actual: bad.len(),
            });
        }

        let mut spread = Vec::with_capacity(width);
        let mut mean_attention = Vec::with_capacity(width);
        for j in 0..width {
            let column: Vec<f64> = attention.iter().map(|a| a[j]).collect();
            spread.push(std_dev(&column));
            mean_attention.push(mean(&column));
        }
        let attention_stability = 1.0 - mean(&spread);

        let entropy: f64 = -mean_attention
            .iter()
            .map(|p| p * (p + ENTROPY_EPSILON).ln())
            .sum::<f64>();
        let attention_focus = if width > 1 {
            1.0 - entropy / (width as f64).ln()
        } else {
            0.0
        };

        let severity = if is_anomaly { error / threshold } else { 0.0 };

        Ok(ComponentVerdict {
            reconstruction_error: error,
            threshold,
            is_anomaly,
            baseline_confidence,
            confidence,
            uncertainty,
            attention_stability,
            attention_focus,
            severity,
            top_features: top_features(&mean_attention),
        })
    }

    fn aggregate(&self, components: &BTreeMap<Component, ComponentVerdict>) -> SystemVerdict {
        let weights = &self.config.weights;
        let total = weights.total();
        let (mut error, mut confidence) = (0.0, 0.0);
        let mut anomalous = Vec::new();
        let mut most_uncertain = (Component::Bearing, f64::INFINITY);
        let mut highest_error = (Component::Bearing, f64::NEG_INFINITY);

        for component in Component::ALL {
            let Some(verdict) = components.get(&component) else {
                continue;
            };
            let w = weights.weight(component);
            error += w * verdict.reconstruction_error;
            confidence += w * verdict.confidence;
            if verdict.is_anomaly {
                anomalous.push(component);
            }
            if verdict.confidence < most_uncertain.1 {
                most_uncertain = (component, verdict.confidence);
            }
            if verdict.reconstruction_error > highest_error.1 {
                highest_error = (component, verdict.reconstruction_error);
            }
        }

        let (aggregated_error, aggregated_confidence) = if total > 0.0 {
            (error / total, confidence / total)
        } else {
            (0.0, 0.0)
        };
        let health_state = HealthState::from_anomalies(&anomalous);

        SystemVerdict {
            health_state,
            system_is_anomaly: health_state.is_anomaly(),
            aggregated_error,
            aggregated_confidence,
            anomaly_count: anomalous.len(),
            most_uncertain_component: most_uncertain.0,
            highest_error_component: highest_error.0,
        }
    }
}

/// Three highest-weighted attended features, descending
fn top_features(weights: &[f64]) -> Vec<FeatureContribution> {
    let mut order: Vec<usize> = (0..weights.len()).collect();
    order.sort_by(|a, b| weights[*b].total_cmp(&weights[*a]));
    order
        .into_iter()
        .take(TOP_FEATURES)
        .map(|j| FeatureContribution {
            name: COMMON_SHORT_NAMES
                .get(j)
                .map(|s| s.to_string())
                .unwrap_or_else(|| format!("feature_{j}")),
            weight: weights[j],
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use inference_engine::{ComponentOutput, MockAutoencoder};
    use proptest::prelude::*;

    fn config(threshold: f64) -> ScoringConfig {
        ScoringConfig::new(Component::ALL.iter().map(|c| (*c, threshold)).collect())
    }

    fn uniform_attention() -> Vec<f64> {
        vec![1.0 / 17.0; 17]
    }

    /// Reconstruction of a zero target with a constant offset per component
    fn offsets(schema: &FeatureSchema, offset: impl Fn(Component) -> f64) -> Reconstruction {
        let mut r = Reconstruction::default();
        for c in Component::ALL {
            let len = c.range(schema).unwrap().len();
            r.components.insert(
                c,
                ComponentOutput {
                    reconstruction: vec![offset(c); len],
                    attention: uniform_attention(),
                },
            );
        }
        r
    }

    #[test]
    fn test_boundary_error_equal_threshold() {
        let schema = FeatureSchema::primary();
        let scorer = AnomalyScorer::new(config(0.25), &schema).unwrap();
        let zeros = vec![0.0; 119];
        let det = offsets(&schema, |_| 0.5);
        let verdict = scorer.score(&zeros, &det, &[det.clone(), det.clone()]).unwrap();

        for c in Component::ALL {
            let v = verdict.component(c).unwrap();
            assert_eq!(v.reconstruction_error, 0.25);
            assert!(!v.is_anomaly);
            assert_eq!(v.baseline_confidence, 0.0);
            assert_eq!(v.severity, 0.0);
            assert_eq!(v.uncertainty, 0.0);
            // 0.7 * 0 + 0.3 * 1
            assert!((v.confidence - 0.3).abs() < 1e-12);
        }
        assert_eq!(verdict.system.health_state, HealthState::Healthy);
    }

    #[test]
    fn test_confidence_branches() {
        let schema = FeatureSchema::primary();
        let scorer = AnomalyScorer::new(config(0.25), &schema).unwrap();
        let zeros = vec![0.0; 119];

        // error 1.0 = 4 x threshold
        let high = offsets(&schema, |_| 1.0);
        let v = scorer.score(&zeros, &high, &[]).unwrap();
        let bearing = v.component(Component::Bearing).unwrap();
        assert!(bearing.is_anomaly);
        assert_eq!(bearing.baseline_confidence, 0.1);
        assert_eq!(bearing.severity, 4.0);

        // error 0.0 is capped at 0.9
        let exact = offsets(&schema, |_| 0.0);
        let v = scorer.score(&zeros, &exact, &[]).unwrap();
        assert_eq!(v.component(Component::Rotor).unwrap().baseline_confidence, 0.9);

        // error 0.0625 = threshold / 4
        let low = offsets(&schema, |_| 0.25);
        let v = scorer.score(&zeros, &low, &[]).unwrap();
        assert!((v.component(Component::Stator).unwrap().baseline_confidence - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_anomaly_count_all_flag_combinations() {
        let schema = FeatureSchema::primary();
        let scorer = AnomalyScorer::new(config(0.25), &schema).unwrap();
        let zeros = vec![0.0; 119];

        for mask in 0u8..16 {
            let flagged = |c: Component| {
                let i = Component::ALL.iter().position(|x| *x == c).unwrap();
                mask & (1 << i) != 0
            };
            let det = offsets(&schema, |c| if flagged(c) { 1.0 } else { 0.1 });
            let verdict = scorer.score(&zeros, &det, &[]).unwrap();

            let count = mask.count_ones() as usize;
            let critical = flagged(Component::Bearing) || flagged(Component::Stator);
            assert_eq!(verdict.system.anomaly_count, count);
            assert_eq!(
                verdict.system.health_state,
                HealthState::classify(count, critical)
            );
            assert_eq!(
                verdict.system.system_is_anomaly,
                matches!(verdict.system.health_state, HealthState::Anomalous | HealthState::Critical)
            );
        }
    }

    #[test]
    fn test_weighted_aggregation() {
        let schema = FeatureSchema::primary();
        let scorer = AnomalyScorer::new(config(10.0), &schema).unwrap();
        let zeros = vec![0.0; 119];
        let det = offsets(&schema, |c| match c {
            Component::Bearing => 1.0,
            Component::Eccentricity => 2.0,
            Component::Rotor => 0.0,
            Component::Stator => 0.0,
        });
        let v = scorer.score(&zeros, &det, &[]).unwrap();
        // (1.2 * 1 + 1.0 * 4) / 4.6
        assert!((v.system.aggregated_error - 5.2 / 4.6).abs() < 1e-12);
        assert_eq!(v.system.highest_error_component, Component::Eccentricity);
        assert_eq!(v.system.most_uncertain_component, Component::Eccentricity);
    }

    #[test]
    fn test_uncertainty_and_attention() {
        let schema = FeatureSchema::primary();
        let scorer = AnomalyScorer::new(config(1.0), &schema).unwrap();
        let zeros = vec![0.0; 119];
        let det = offsets(&schema, |_| 0.0);

        let mut peaked = offsets(&schema, |_| 0.0);
        let mut focused = vec![0.0; 17];
        focused[4] = 0.7;
        focused[2] = 0.2;
        focused[9] = 0.1;
        for out in peaked.components.values_mut() {
            out.attention = focused.clone();
        }
        let spread = offsets(&schema, |_| (2.0f64).sqrt());

        let v = scorer.score(&zeros, &det, &[peaked.clone(), spread]).unwrap();
        let rotor = v.component(Component::Rotor).unwrap();
        // stochastic errors 0 and 2, population std 1
        assert!((rotor.uncertainty - 1.0).abs() < 1e-12);
        assert!(rotor.attention_stability < 1.0);

        let v = scorer.score(&zeros, &det, &[peaked.clone(), peaked]).unwrap();
        let rotor = v.component(Component::Rotor).unwrap();
        assert_eq!(rotor.attention_stability, 1.0);
        assert!(rotor.attention_focus > 0.5);
        let names: Vec<&str> = rotor.top_features.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec![COMMON_SHORT_NAMES[4], COMMON_SHORT_NAMES[2], COMMON_SHORT_NAMES[9]]);
        assert_eq!(rotor.top_features[0].weight, 0.7);
    }

    #[test]
    fn test_uniform_attention_has_no_focus() {
        let schema = FeatureSchema::primary();
        let scorer = AnomalyScorer::new(config(1.0), &schema).unwrap();
        let det = offsets(&schema, |_| 0.0);
        let v = scorer.score(&vec![0.0; 119], &det, &[det.clone()]).unwrap();
        assert!(v.component(Component::Bearing).unwrap().attention_focus.abs() < 1e-6);
    }

    #[test]
    fn test_shape_errors() {
        let schema = FeatureSchema::primary();
        let scorer = AnomalyScorer::new(config(1.0), &schema).unwrap();
        let det = offsets(&schema, |_| 0.0);
        assert_eq!(
            scorer.score(&[0.0; 10], &det, &[]),
            Err(ScoringError::InputMismatch { expected: 119, actual: 10 })
        );

        let mut missing = det.clone();
        missing.components.remove(&Component::Stator);
        assert_eq!(
            scorer.score(&vec![0.0; 119], &missing, &[]),
            Err(ScoringError::MissingComponent(Component::Stator))
        );

        let mut short = det.clone();
        short.components.get_mut(&Component::Rotor).unwrap().reconstruction.pop();
        assert!(matches!(
            scorer.score(&vec![0.0; 119], &short, &[]),
            Err(ScoringError::LengthMismatch { component: Component::Rotor, .. })
        ));

        let mut thresholds = config(1.0);
        thresholds.thresholds.remove(&Component::Eccentricity);
        assert!(matches!(
            AnomalyScorer::new(thresholds, &schema),
            Err(ScoringError::MissingThreshold(Component::Eccentricity))
        ));
    }

    #[test]
    fn test_evaluate_with_reference_model() {
        let schema = FeatureSchema::primary();
        let scorer = AnomalyScorer::new(config(1.0), &schema).unwrap();
        let model = MockAutoencoder::with_seed(3);
        let vector: Vec<f64> = (0..119).map(|i| ((i % 7) as f64 - 3.0) * 0.2).collect();
        let verdict = scorer.evaluate(&model, &vector).unwrap();

        assert_eq!(verdict.components.len(), 4);
        for v in verdict.components.values() {
            assert!(v.uncertainty > 0.0);
            assert!(v.confidence > 0.0 && v.confidence <= 1.0);
            assert_eq!(v.top_features.len(), 3);
        }
        assert_eq!(verdict.system.health_state, HealthState::Healthy);
    }

    proptest! {
        #[test]
        fn prop_confidence_is_bounded(threshold in 0.01f64..10.0, offset in 0.0f64..5.0, jitter in 0.0f64..1.0) {
            let schema = FeatureSchema::primary();
            let scorer = AnomalyScorer::new(config(threshold), &schema).unwrap();
            let det = offsets(&schema, |_| offset);
            let noisy = offsets(&schema, |_| offset + jitter);
            let verdict = scorer.score(&vec![0.0; 119], &det, &[det.clone(), noisy]).unwrap();

            for v in verdict.components.values() {
                prop_assert!(v.confidence >= 0.0 && v.confidence < 1.0);
                prop_assert_eq!(v.is_anomaly, v.severity > 1.0);
            }
        }
    }
}

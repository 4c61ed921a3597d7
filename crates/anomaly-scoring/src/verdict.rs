//! Verdict Types and Health Rules

use crate::Component;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// System-level categorical verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum HealthState {
    Healthy,
    Monitor,
    Anomalous,
    Critical,
}

impl HealthState {
    /// Health rule over the number of anomalous components and whether a
    /// critical component (bearing or stator) is among them
    pub fn classify(anomaly_count: usize, critical: bool) -> Self {
        match anomaly_count {
            0 => HealthState::Healthy,
            1 if !critical => HealthState::Monitor,
            1 | 2 => HealthState::Anomalous,
            _ => HealthState::Critical,
        }
    }

    /// Health state for a set of anomalous components
    pub fn from_anomalies(anomalous: &[Component]) -> Self {
        let critical = anomalous
            .iter()
            .any(|c| matches!(c, Component::Bearing | Component::Stator));
        Self::classify(anomalous.len(), critical)
    }

    pub fn is_anomaly(&self) -> bool {
        matches!(self, HealthState::Anomalous | HealthState::Critical)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HealthState::Healthy => "Healthy",
            HealthState::Monitor => "Monitor",
            HealthState::Anomalous => "Anomalous",
            HealthState::Critical => "Critical",
        }
    }
}

impl fmt::Display for HealthState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One attended input feature and its mean attention weight
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureContribution {
    pub name: String,
    pub weight: f64,
}

impl fmt::Display for FeatureContribution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({:.3})", self.name, self.weight)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentVerdict {
    pub reconstruction_error: f64,
    pub threshold: f64,
    pub is_anomaly: bool,
    /// Threshold-distance confidence before uncertainty weighting
    pub baseline_confidence: f64,
    /// Blend of baseline and uncertainty confidence
    pub confidence: f64,
    pub uncertainty: f64,
    pub attention_stability: f64,
    pub attention_focus: f64,
    pub severity: f64,
    pub top_features: Vec<FeatureContribution>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemVerdict {
    pub health_state: HealthState,
    pub system_is_anomaly: bool,
    pub aggregated_error: f64,
    pub aggregated_confidence: f64,
    pub anomaly_count: usize,
    pub most_uncertain_component: Component,
    pub highest_error_component: Component,
}

/// Scoring result for one feature vector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyVerdict {
    pub components: BTreeMap<Component, ComponentVerdict>,
    pub system: SystemVerdict,
}

impl AnomalyVerdict {
    pub fn component(&self, component: Component) -> Option<&ComponentVerdict> {
        self.components.get(&component)
    }

    pub fn anomalous_components(&self) -> Vec<Component> {
        self.components
            .iter()
            .filter(|(_, v)| v.is_anomaly)
            .map(|(c, _)| *c)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_table_all_flag_combinations() {
        for mask in 0u8..16 {
            let anomalous: Vec<Component> = Component::ALL
                .iter()
                .enumerate()
                .filter(|(i, _)| mask & (1 << i) != 0)
                .map(|(_, c)| *c)
                .collect();
            let bearing = mask & 0b0001 != 0;
            let stator = mask & 0b1000 != 0;
            let count = mask.count_ones() as usize;

            let expected = if count == 0 {
                HealthState::Healthy
            } else if count == 1 && !(bearing || stator) {
                HealthState::Monitor
            } else if count <= 2 {
                HealthState::Anomalous
            } else {
                HealthState::Critical
            };

            assert_eq!(anomalous.len(), count, "mask {mask:04b}");
            assert_eq!(HealthState::from_anomalies(&anomalous), expected, "mask {mask:04b}");
        }
    }

    #[test]
    fn test_health_examples() {
        assert_eq!(HealthState::from_anomalies(&[Component::Rotor]), HealthState::Monitor);
        assert_eq!(HealthState::from_anomalies(&[Component::Eccentricity]), HealthState::Monitor);
        assert_eq!(HealthState::from_anomalies(&[Component::Bearing]), HealthState::Anomalous);
        assert_eq!(HealthState::from_anomalies(&[Component::Stator]), HealthState::Anomalous);
        assert_eq!(
            HealthState::from_anomalies(&[Component::Rotor, Component::Eccentricity]),
            HealthState::Anomalous
        );
        assert_eq!(
            HealthState::from_anomalies(&[Component::Rotor, Component::Eccentricity, Component::Stator]),
            HealthState::Critical
        );
    }

    #[test]
    fn test_is_anomaly() {
        assert!(!HealthState::Healthy.is_anomaly());
        assert!(!HealthState::Monitor.is_anomaly());
        assert!(HealthState::Anomalous.is_anomaly());
        assert!(HealthState::Critical.is_anomaly());
    }

    #[test]
    fn test_contribution_display() {
        let c = FeatureContribution {
            name: "rms_A".into(),
            weight: 0.12345,
        };
        assert_eq!(c.to_string(), "rms_A(0.123)");
    }
}

//! Predictive Model Capability

use crate::InferenceError;
use feature_engine::{FeatureGroup, FeatureSchema};
use ndarray::ArrayView2;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::ops::Range;

/// Model family behind a `PredictiveModel`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    /// Multi-head autoencoder scoring one feature vector
    Autoencoder,
    /// Two-channel LSTM predicting the next feature vector
    DualLstm,
    /// LSTM with cross-attention over context features
    HybridLstm,
}

impl ModelKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelKind::Autoencoder => "autoencoder",
            ModelKind::DualLstm => "dual_lstm",
            ModelKind::HybridLstm => "hybrid_lstm",
        }
    }

    /// Whether the model consumes sequences rather than single vectors
    pub fn is_temporal(&self) -> bool {
        !matches!(self, ModelKind::Autoencoder)
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Independently scored motor subsystem
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Component {
    Bearing,
    Eccentricity,
    Rotor,
    Stator,
}

impl Component {
    /// Scoring order
    pub const ALL: [Component; 4] = [
        Component::Bearing,
        Component::Eccentricity,
        Component::Rotor,
        Component::Stator,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Component::Bearing => "bearing",
            Component::Eccentricity => "eccentricity",
            Component::Rotor => "rotor",
            Component::Stator => "stator",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.name() == name)
    }

    /// Feature group the component reconstructs
    pub fn group(&self) -> FeatureGroup {
        match self {
            Component::Bearing => FeatureGroup::Bearing,
            Component::Eccentricity => FeatureGroup::Eccentricity,
            Component::Rotor => FeatureGroup::Rotor,
            Component::Stator => FeatureGroup::Stator,
        }
    }

    /// Position of the component's target slice in a schema's vector
    pub fn range(&self, schema: &FeatureSchema) -> Option<Range<usize>> {
        schema.group_range(self.group())
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Input handed to a model call
#[derive(Debug, Clone, Copy)]
pub enum ModelInput<'a> {
    /// One normalized feature vector
    Vector(&'a [f64]),
    /// Normalized sequence, one row per time step
    Sequence(ArrayView2<'a, f64>),
}

impl ModelInput<'_> {
    /// Number of features per row
    pub fn width(&self) -> usize {
        match self {
            ModelInput::Vector(v) => v.len(),
            ModelInput::Sequence(s) => s.ncols(),
        }
    }
}

/// Reconstruction and attention for one component
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentOutput {
    pub reconstruction: Vec<f64>,
    pub attention: Vec<f64>,
}

/// Per-component autoencoder output
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Reconstruction {
    pub components: BTreeMap<Component, ComponentOutput>,
}

impl Reconstruction {
    pub fn component(&self, component: Component) -> Option<&ComponentOutput> {
        self.components.get(&component)
    }
}

/// Output of a model call
#[derive(Debug, Clone, PartialEq)]
pub enum ModelOutput {
    Reconstruction(Reconstruction),
    /// Next normalized row of a sequence
    NextStep(Vec<f64>),
}

/// A loaded predictive model. Implementations are shared read-only across
/// runs and sessions.
pub trait PredictiveModel: Send + Sync {
    fn kind(&self) -> ModelKind;

    /// Features per input row
    fn input_dimension(&self) -> usize;

    /// Features per predicted row; equals the input dimension for the
    /// autoencoder
    fn output_dimension(&self) -> usize {
        self.input_dimension()
    }

    /// Run the model. `stochastic` enables dropout-style sampling; calls
    /// with `stochastic == false` are deterministic.
    fn predict(&self, input: ModelInput<'_>, stochastic: bool) -> Result<ModelOutput, InferenceError>;

    /// Autoencoder scoring call
    fn score(&self, normalized: &[f64], stochastic: bool) -> Result<Reconstruction, InferenceError> {
        match self.predict(ModelInput::Vector(normalized), stochastic)? {
            ModelOutput::Reconstruction(r) => Ok(r),
            ModelOutput::NextStep(_) => Err(InferenceError::UnexpectedOutput {
                model: self.kind(),
                expected: "reconstruction",
            }),
        }
    }

    /// One-step temporal prediction
    fn next_step(&self, sequence: ArrayView2<'_, f64>) -> Result<Vec<f64>, InferenceError> {
        match self.predict(ModelInput::Sequence(sequence), false)? {
            ModelOutput::NextStep(row) => Ok(row),
            ModelOutput::Reconstruction(_) => Err(InferenceError::UnexpectedOutput {
                model: self.kind(),
                expected: "next step",
            }),
        }
    }
}

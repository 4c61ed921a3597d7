//! Pipeline Settings
//!
//! Layered as defaults, then an optional file, then `MOTOR_`-prefixed
//! environment variables (`MOTOR_WINDOWS_PER_BATCH`,
//! `MOTOR_WINDOWING__OVERLAP_RATIO`, ...).

use anomaly_scoring::{Component, ComponentWeights, MONTE_CARLO_SAMPLES};
use data_validator::{NormalizationStats, ValidationConfig, WindowingConfig};
use feature_engine::ExtractorConfig;
use inference_engine::{ArtifactLoader, FileArtifactLoader, InferenceError, ModelArtifacts};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Environment prefix for pipeline settings
pub const ENV_PREFIX: &str = "MOTOR";

/// When the forecast stage is attempted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ForecastGate {
    /// Only after anomaly detection succeeded
    #[default]
    AfterDetection,
    /// Whenever feature extraction succeeded
    FeaturesOnly,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringSettings {
    pub weights: ComponentWeights,
    pub monte_carlo_samples: usize,
}

impl Default for ScoringSettings {
    fn default() -> Self {
        Self {
            weights: ComponentWeights::default(),
            monte_carlo_samples: MONTE_CARLO_SAMPLES,
        }
    }
}

/// Where thresholds and normalization statistics come from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArtifactSettings {
    /// Directory holding `<prefix>_*.json`; reference artifacts when unset
    pub dir: Option<String>,
    pub prefix: String,
    /// Threshold used by the reference artifacts
    pub reference_threshold: f64,
}

impl Default for ArtifactSettings {
    fn default() -> Self {
        Self {
            dir: None,
            prefix: "autoencoder".to_string(),
            reference_threshold: 1.0,
        }
    }
}

impl ArtifactSettings {
    /// Loader for the configured source. Without a directory the loader
    /// yields identity normalization and a uniform threshold.
    pub fn loader(&self, dimension: usize) -> Box<dyn ArtifactLoader> {
        match &self.dir {
            Some(dir) => Box::new(FileArtifactLoader::new(dir, self.prefix.clone())),
            None => {
                let threshold = self.reference_threshold;
                Box::new(move || -> Result<ModelArtifacts, InferenceError> {
                    Ok(ModelArtifacts {
                        thresholds: Component::ALL.iter().map(|c| (*c, threshold)).collect(),
                        normalization: NormalizationStats::identity(dimension),
                        forecast_normalization: NormalizationStats::identity(dimension),
                    })
                })
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineSettings {
    pub windowing: WindowingConfig,
    /// Windows per streaming dispatch
    pub windows_per_batch: usize,
    /// Forecast horizon; 0 disables the forecast stage
    pub forecast_steps: usize,
    pub forecast_gate: ForecastGate,
    pub features: ExtractorConfig,
    pub validation: ValidationConfig,
    pub scoring: ScoringSettings,
    pub artifacts: ArtifactSettings,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            windowing: WindowingConfig::default(),
            windows_per_batch: 20,
            forecast_steps: 5,
            forecast_gate: ForecastGate::default(),
            features: ExtractorConfig::default(),
            validation: ValidationConfig::default(),
            scoring: ScoringSettings::default(),
            artifacts: ArtifactSettings::default(),
        }
    }
}

impl PipelineSettings {
    /// Load settings from defaults, an optional file and the environment
    pub fn load(path: Option<&str>) -> Result<Self, config::ConfigError> {
        load_layered(path, ENV_PREFIX)
    }
}

/// Defaults of `T`, overlaid by an optional file and then by environment
/// variables under `prefix`. Nested keys use `__` in variable names.
pub fn load_layered<T>(path: Option<&str>, prefix: &str) -> Result<T, config::ConfigError>
where
    T: Default + Serialize + DeserializeOwned,
{
    let mut builder = config::Config::builder();

    builder = builder.add_source(config::Config::try_from(&T::default())?);

    if let Some(path) = path {
        builder = builder.add_source(config::File::with_name(path).required(false));
    }

    builder = builder.add_source(
        config::Environment::with_prefix(prefix)
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true),
    );

    builder.build()?.try_deserialize()
}

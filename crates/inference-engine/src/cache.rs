//! Load-once Model Artifact Cache
//!
//! Thresholds and normalization statistics are read once per process. The
//! first caller runs the loader while concurrent callers block on the cell;
//! every later read is lock-free.

use crate::model::Component;
use crate::InferenceError;
use data_validator::NormalizationStats;
use once_cell::sync::OnceCell;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Read-only artifacts shared by every run
#[derive(Debug, Clone, PartialEq)]
pub struct ModelArtifacts {
    /// Per-component reconstruction-error thresholds
    pub thresholds: BTreeMap<Component, f64>,
    /// Autoencoder input statistics
    pub normalization: NormalizationStats,
    /// Forecaster input statistics
    pub forecast_normalization: NormalizationStats,
}

impl ModelArtifacts {
    /// Check thresholds are positive and both statistic sets match `dimension`
    pub fn validate(&self, dimension: usize) -> Result<(), InferenceError> {
        for component in Component::ALL {
            match self.thresholds.get(&component) {
                Some(t) if t.is_finite() && *t > 0.0 => {}
                Some(t) => {
                    return Err(InferenceError::ModelLoadError(format!(
                        "threshold for {component} must be positive, got {t}"
                    )))
                }
                None => {
                    return Err(InferenceError::ModelLoadError(format!(
                        "missing threshold for {component}"
                    )))
                }
            }
        }
        for (name, stats) in [
            ("normalization", &self.normalization),
            ("forecast normalization", &self.forecast_normalization),
        ] {
            if stats.mean.len() != dimension || stats.std.len() != dimension {
                return Err(InferenceError::ModelLoadError(format!(
                    "{name} statistics have {}/{} entries, expected {dimension}",
                    stats.mean.len(),
                    stats.std.len()
                )));
            }
        }
        Ok(())
    }

    pub fn threshold(&self, component: Component) -> Option<f64> {
        self.thresholds.get(&component).copied()
    }
}

/// Source of `ModelArtifacts`
pub trait ArtifactLoader: Send + Sync {
    fn load(&self) -> Result<ModelArtifacts, InferenceError>;
}

impl<F> ArtifactLoader for F
where
    F: Fn() -> Result<ModelArtifacts, InferenceError> + Send + Sync,
{
    fn load(&self) -> Result<ModelArtifacts, InferenceError> {
        self()
    }
}

#[derive(Debug, Deserialize)]
struct ThresholdEntry {
    threshold: f64,
}

/// Loads `<prefix>_thresholds.json` and `<prefix>_normalization_stats.json`
/// from a directory. Forecaster statistics come from
/// `<prefix>_forecast_normalization_stats.json` when present and fall back to
/// the autoencoder statistics otherwise.
#[derive(Debug, Clone)]
pub struct FileArtifactLoader {
    dir: PathBuf,
    prefix: String,
}

impl FileArtifactLoader {
    pub fn new(dir: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            prefix: prefix.into(),
        }
    }

    fn path(&self, suffix: &str) -> PathBuf {
        self.dir.join(format!("{}_{}", self.prefix, suffix))
    }

    fn read(path: &Path) -> Result<String, InferenceError> {
        std::fs::read_to_string(path).map_err(|e| {
            InferenceError::ModelLoadError(format!("failed to read {}: {}", path.display(), e))
        })
    }

    fn parse<T: for<'de> Deserialize<'de>>(path: &Path, text: &str) -> Result<T, InferenceError> {
        serde_json::from_str(text).map_err(|e| {
            InferenceError::ModelLoadError(format!("failed to parse {}: {}", path.display(), e))
        })
    }
}

impl ArtifactLoader for FileArtifactLoader {
    fn load(&self) -> Result<ModelArtifacts, InferenceError> {
        let thresholds_path = self.path("thresholds.json");
        let raw: BTreeMap<String, ThresholdEntry> =
            Self::parse(&thresholds_path, &Self::read(&thresholds_path)?)?;

        let mut thresholds = BTreeMap::new();
        for (name, entry) in raw {
            match Component::from_name(&name) {
                Some(component) => {
                    thresholds.insert(component, entry.threshold);
                }
                None => debug!("Ignoring threshold entry {}", name),
            }
        }

        let stats_path = self.path("normalization_stats.json");
        let normalization: NormalizationStats =
            Self::parse(&stats_path, &Self::read(&stats_path)?)?;

        let forecast_path = self.path("forecast_normalization_stats.json");
        let forecast_normalization = if forecast_path.exists() {
            Self::parse(&forecast_path, &Self::read(&forecast_path)?)?
        } else {
            normalization.clone()
        };

        info!(
            "Loaded model artifacts from {} ({} thresholds)",
            self.dir.display(),
            thresholds.len()
        );

        Ok(ModelArtifacts {
            thresholds,
            normalization,
            forecast_normalization,
        })
    }
}

/// Read-only shared artifact handle populated exactly once
#[derive(Debug, Default)]
pub struct ModelCache {
    cell: OnceCell<Arc<ModelArtifacts>>,
}

static GLOBAL: ModelCache = ModelCache::new();

impl ModelCache {
    pub const fn new() -> Self {
        Self {
            cell: OnceCell::new(),
        }
    }

    /// Process-wide cache
    pub fn global() -> &'static ModelCache {
        &GLOBAL
    }

    /// Return the cached artifacts, running `loader` if the cache is empty.
    /// A failed load leaves the cache empty so a later call can retry.
    pub fn get_or_load(&self, loader: &dyn ArtifactLoader) -> Result<Arc<ModelArtifacts>, InferenceError> {
        self.cell
            .get_or_try_init(|| {
                info!("Loading model artifacts");
                loader.load().map(Arc::new)
            })
            .cloned()
    }

    pub fn get(&self) -> Option<Arc<ModelArtifacts>> {
        self.cell.get().cloned()
    }

    pub fn is_loaded(&self) -> bool {
        self.cell.get().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    fn artifacts(dimension: usize) -> ModelArtifacts {
        ModelArtifacts {
            thresholds: Component::ALL.iter().map(|c| (*c, 0.5)).collect(),
            normalization: NormalizationStats::identity(dimension),
            forecast_normalization: NormalizationStats::identity(dimension),
        }
    }

    #[test]
    fn test_loads_once_across_threads() {
        let cache = Arc::new(ModelCache::new());
        let calls = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = Arc::clone(&cache);
                let calls = Arc::clone(&calls);
                thread::spawn(move || {
                    let loader = move || -> Result<ModelArtifacts, InferenceError> {
                        calls.fetch_add(1, Ordering::SeqCst);
                        thread::sleep(std::time::Duration::from_millis(20));
                        Ok(artifacts(4))
                    };
                    cache.get_or_load(&loader).unwrap()
                })
            })
            .collect();

        let loaded: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(loaded.iter().all(|a| Arc::ptr_eq(a, &loaded[0])));
    }

    #[test]
    fn test_failed_load_can_retry() {
        let cache = ModelCache::new();
        let failing = || -> Result<ModelArtifacts, InferenceError> {
            Err(InferenceError::ModelLoadError("unavailable".into()))
        };
        assert!(cache.get_or_load(&failing).is_err());
        assert!(!cache.is_loaded());

        let ok = || -> Result<ModelArtifacts, InferenceError> { Ok(artifacts(2)) };
        assert!(cache.get_or_load(&ok).is_ok());
        assert!(cache.is_loaded());
        assert_eq!(cache.get().unwrap().threshold(Component::Rotor), Some(0.5));
    }

    #[test]
    fn test_validate() {
        assert!(artifacts(119).validate(119).is_ok());
        assert!(artifacts(118).validate(119).is_err());

        let mut missing = artifacts(3);
        missing.thresholds.remove(&Component::Stator);
        assert!(missing.validate(3).is_err());

        let mut zero = artifacts(3);
        zero.thresholds.insert(Component::Bearing, 0.0);
        assert!(zero.validate(3).is_err());
    }

    #[test]
    fn test_file_loader() {
        let dir = std::env::temp_dir().join(format!("artifacts-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(
            dir.join("ae_thresholds.json"),
            r#"{"bearing": {"threshold": 0.1}, "eccentricity": {"threshold": 0.2},
                "rotor": {"threshold": 0.3}, "stator": {"threshold": 0.4},
                "system": {"threshold": 9.0}}"#,
        )
        .unwrap();
        std::fs::write(
            dir.join("ae_normalization_stats.json"),
            r#"{"mean": [1.0, 2.0], "std": [0.5, 0.25]}"#,
        )
        .unwrap();

        let loaded = FileArtifactLoader::new(&dir, "ae").load().unwrap();
        assert_eq!(loaded.thresholds.len(), 4);
        assert_eq!(loaded.threshold(Component::Stator), Some(0.4));
        assert_eq!(loaded.normalization.mean, vec![1.0, 2.0]);
        assert_eq!(loaded.forecast_normalization, loaded.normalization);
        assert!(loaded.validate(2).is_ok());

        let missing = FileArtifactLoader::new(&dir, "absent").load();
        assert!(matches!(missing, Err(InferenceError::ModelLoadError(_))));

        std::fs::remove_dir_all(&dir).ok();
    }
}

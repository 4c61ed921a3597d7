//! Motor Diagnostics Service
//!
//! Wires settings, logging and metrics around the pipeline and runs
//! streaming sessions against it.

use anyhow::{Context, Result};
use inference_engine::{ModelCache, PredictiveModel};
use metrics_exporter_prometheus::PrometheusBuilder;
use pipeline::{load_layered, Models, PipelineOrchestrator, PipelineSettings, ENV_PREFIX};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use storage::{Repository, ResultStore};
use streaming::{SessionStats, StreamConfig, StreamManager, SyntheticConfig, SyntheticSource};
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub level: String,
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsSettings {
    pub enabled: bool,
    /// Prometheus scrape endpoint
    pub listen: String,
}

impl Default for MetricsSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            listen: "0.0.0.0:9000".to_string(),
        }
    }
}

/// The session the service runs on startup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    pub user_id: String,
    pub retry_backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub source: SyntheticConfig,
}

impl Default for SessionSettings {
    fn default() -> Self {
        let stream = StreamConfig::default();
        Self {
            user_id: "motor-1".to_string(),
            retry_backoff_ms: stream.retry_backoff_ms,
            max_backoff_ms: stream.max_backoff_ms,
            source: SyntheticConfig {
                realtime: true,
                ..SyntheticConfig::default()
            },
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceSettings {
    pub pipeline: PipelineSettings,
    pub session: SessionSettings,
    pub logging: LoggingSettings,
    pub metrics: MetricsSettings,
}

impl ServiceSettings {
    /// Defaults, then an optional file, then `MOTOR_` variables
    /// (`MOTOR_PIPELINE__WINDOWS_PER_BATCH`, `MOTOR_LOGGING__JSON`, ...)
    pub fn load(path: Option<&str>) -> Result<Self> {
        load_layered(path, ENV_PREFIX).context("Failed to load service settings")
    }

    pub fn stream_config(&self) -> StreamConfig {
        StreamConfig {
            retry_backoff_ms: self.session.retry_backoff_ms,
            max_backoff_ms: self.session.max_backoff_ms,
            ..StreamConfig::from_settings(&self.pipeline)
        }
    }
}

/// Initialize logging
pub fn init_logging(settings: &LoggingSettings) -> Result<()> {
    let level: Level = settings
        .level
        .parse()
        .with_context(|| format!("Invalid log level '{}'", settings.level))?;

    if settings.json {
        let subscriber = FmtSubscriber::builder()
            .json()
            .with_max_level(level)
            .with_target(true)
            .finish();
        tracing::subscriber::set_global_default(subscriber)
    } else {
        let subscriber = FmtSubscriber::builder()
            .with_max_level(level)
            .with_target(true)
            .finish();
        tracing::subscriber::set_global_default(subscriber)
    }
    .context("Failed to set tracing subscriber")
}

/// Install the Prometheus exporter. Must run inside the tokio runtime.
pub fn init_metrics(settings: &MetricsSettings) -> Result<()> {
    let addr: SocketAddr = settings
        .listen
        .parse()
        .with_context(|| format!("Invalid metrics address '{}'", settings.listen))?;
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .context("Failed to install Prometheus exporter")?;
    info!("Metrics exporter listening on {}", addr);
    Ok(())
}

/// Load artifacts through `cache` and build the orchestrator with the
/// reference models
pub fn build_orchestrator(
    settings: &PipelineSettings,
    cache: &ModelCache,
    store: Arc<dyn ResultStore>,
) -> Result<Arc<PipelineOrchestrator>> {
    let models = Models::reference();
    let loader = settings.artifacts.loader(models.autoencoder.input_dimension());
    let artifacts = cache
        .get_or_load(loader.as_ref())
        .context("Failed to load model artifacts")?;
    let orchestrator = PipelineOrchestrator::new(settings, &artifacts, models, store)
        .context("Failed to build pipeline")?;
    Ok(Arc::new(orchestrator))
}

/// Run one synthetic session until the source ends or Ctrl-C
pub async fn run(settings: ServiceSettings) -> Result<SessionStats> {
    let store = Arc::new(Repository::new());
    let orchestrator = build_orchestrator(&settings.pipeline, ModelCache::global(), store.clone())?;
    let manager = StreamManager::new(orchestrator, settings.stream_config());

    let user = settings.session.user_id.as_str();
    let source = SyntheticSource::new(settings.session.source.clone());
    let status = manager.start(user, source).await?;
    info!(
        "Session {} needs {} samples per batch",
        status.session_id, status.required_buffer_size
    );

    let mut updates = manager
        .subscribe(user)
        .await
        .context("Session vanished after start")?;
    tokio::select! {
        finished = updates.wait_for(|s| !s.running) => {
            if finished.is_err() {
                warn!("Session {} status channel closed", status.session_id);
            }
        }
        _ = tokio::signal::ctrl_c() => info!("Shutdown requested"),
    }

    let stats = manager.stop(user).await?;
    info!(
        "Session {} finished: {} ({} documents stored)",
        status.session_id,
        serde_json::to_string(&stats)?,
        store.len()
    );
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use data_validator::WindowingConfig;

    #[test]
    fn test_defaults() {
        let settings = ServiceSettings::default();
        assert_eq!(settings.logging.level, "info");
        assert!(!settings.metrics.enabled);
        assert!(settings.session.source.realtime);
        assert_eq!(settings.stream_config().required_buffer_size().unwrap(), 93248);
    }

    #[test]
    fn test_nested_environment_override() {
        std::env::set_var("MOTOR_PIPELINE__WINDOWS_PER_BATCH", "6");
        std::env::set_var("MOTOR_SESSION__USER_ID", "press-7");
        let settings = ServiceSettings::load(None).unwrap();
        std::env::remove_var("MOTOR_PIPELINE__WINDOWS_PER_BATCH");
        std::env::remove_var("MOTOR_SESSION__USER_ID");

        assert_eq!(settings.pipeline.windows_per_batch, 6);
        assert_eq!(settings.session.user_id, "press-7");
        assert_eq!(settings.stream_config().windows_per_batch, 6);
    }

    #[test]
    fn test_invalid_log_level() {
        let settings = LoggingSettings {
            level: "loud".into(),
            json: false,
        };
        assert!(init_logging(&settings).is_err());
    }

    #[test]
    fn test_invalid_metrics_address() {
        let settings = MetricsSettings {
            enabled: true,
            listen: "not-an-address".into(),
        };
        assert!(init_metrics(&settings).is_err());
    }

    #[tokio::test]
    async fn test_run_short_synthetic_session() {
        let mut settings = ServiceSettings::default();
        settings.pipeline.windowing = WindowingConfig::new(1024, 0.5);
        settings.pipeline.windows_per_batch = 4;
        settings.session.source = SyntheticConfig {
            batch_size: 1024,
            max_samples: Some(2560 * 3),
            seed: Some(12),
            ..SyntheticConfig::default()
        };

        let cache = ModelCache::new();
        let orchestrator =
            build_orchestrator(&settings.pipeline, &cache, Arc::new(Repository::new())).unwrap();
        assert!(cache.is_loaded());

        let manager = StreamManager::new(orchestrator, settings.stream_config());
        manager
            .start("t", SyntheticSource::new(settings.session.source.clone()))
            .await
            .unwrap();
        let mut updates = manager.subscribe("t").await.unwrap();
        let done = updates.wait_for(|s| !s.running).await.unwrap().processed_batches;
        assert_eq!(done, 3);

        let stats = manager.stop("t").await.unwrap();
        assert_eq!(stats.features_processed, 12);
    }
}

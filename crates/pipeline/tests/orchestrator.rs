use data_validator::WindowingConfig;
use inference_engine::{
    InferenceError, MockAutoencoder, MockForecaster, ModelInput, ModelKind, ModelOutput,
    PredictiveModel, SequenceStrategy,
};
use pipeline::{
    BatchRequest, ErrorKind, ForecastGate, Models, OverallStatus, PipelineOrchestrator,
    PipelineRun, PipelineSettings, StageName, StageStatus,
};
use sample_buffer::PhaseCurrents;
use std::f64::consts::PI;
use std::sync::Arc;
use storage::{DocumentKind, Repository, ResultDocument, ResultStore, StorageError};
use uuid::Uuid;

struct FailingAutoencoder;

impl PredictiveModel for FailingAutoencoder {
    fn kind(&self) -> ModelKind {
        ModelKind::Autoencoder
    }

    fn input_dimension(&self) -> usize {
        119
    }

    fn predict(&self, _input: ModelInput<'_>, _stochastic: bool) -> Result<ModelOutput, InferenceError> {
        Err(InferenceError::InferenceFailed("session closed".into()))
    }
}

/// Rejects writes of one document kind
struct RejectingStore {
    inner: Repository,
    reject: DocumentKind,
}

impl ResultStore for RejectingStore {
    fn put(&self, document: ResultDocument) -> Result<Uuid, StorageError> {
        if document.kind == self.reject {
            return Err(StorageError::DatabaseError("disk full".into()));
        }
        self.inner.put(document)
    }

    fn get(&self, id: Uuid) -> Result<ResultDocument, StorageError> {
        self.inner.get(id)
    }

    fn find(&self, kind: DocumentKind, batch_id: &str) -> Result<ResultDocument, StorageError> {
        self.inner.find(kind, batch_id)
    }

    fn find_by_run(&self, run_id: Uuid) -> Result<Vec<ResultDocument>, StorageError> {
        self.inner.find_by_run(run_id)
    }
}

fn settings(gate: ForecastGate) -> PipelineSettings {
    let mut settings = PipelineSettings::default();
    settings.windowing = WindowingConfig::new(1024, 0.5);
    settings.forecast_steps = 3;
    settings.forecast_gate = gate;
    settings
}

fn build(settings: &PipelineSettings, autoencoder: Arc<dyn PredictiveModel>, store: Arc<dyn ResultStore>) -> PipelineOrchestrator {
    let artifacts = settings.artifacts.loader(119).load().unwrap();
    let models = Models {
        autoencoder,
        forecaster: Arc::new(MockForecaster::mock()),
    };
    PipelineOrchestrator::new(settings, &artifacts, models, store).unwrap()
}

fn currents(n: usize) -> PhaseCurrents {
    let phase = |offset: f64| -> Vec<f64> {
        (0..n)
            .map(|i| {
                let t = i as f64 / 25600.0;
                3.0 * (2.0 * PI * 50.0 * t - offset).sin() + 0.1 * (2.0 * PI * 1250.0 * t).sin()
            })
            .collect()
    };
    PhaseCurrents::new(phase(0.0), phase(2.0 * PI / 3.0), phase(4.0 * PI / 3.0)).unwrap()
}

#[test]
fn test_failed_detection_gives_partial_failure() {
    let store = Arc::new(Repository::new());
    let pipeline = build(
        &settings(ForecastGate::AfterDetection),
        Arc::new(FailingAutoencoder),
        store.clone(),
    );

    let outcome = pipeline.run(&BatchRequest::new("partial", currents(4096))).unwrap();
    let run = &outcome.run;

    assert_eq!(run.overall_status, OverallStatus::PartialFailure);
    assert_eq!(run.stages.len(), 2);
    assert!(run.succeeded(StageName::FeatureExtraction));
    let detection = run.stage(StageName::AnomalyDetection).unwrap();
    assert_eq!(detection.status, StageStatus::Failed);
    assert_eq!(detection.error_kind, Some(ErrorKind::Inference));
    assert!(detection.error_message.as_deref().unwrap().contains("session closed"));
    assert!(run.stage(StageName::ForecastAnalysis).is_none());

    assert!(!outcome.features.is_empty());
    assert!(outcome.verdicts.is_empty());

    // run is persisted even when a stage failed
    let stored: PipelineRun = store.find(DocumentKind::Run, "partial").unwrap().decode().unwrap();
    assert_eq!(stored.overall_status, OverallStatus::PartialFailure);
    assert!(store.find(DocumentKind::Anomaly, "partial").is_err());
}

#[test]
fn test_features_only_gate_still_forecasts() {
    let store = Arc::new(Repository::new());
    let pipeline = build(
        &settings(ForecastGate::FeaturesOnly),
        Arc::new(FailingAutoencoder),
        store,
    );

    let outcome = pipeline.run(&BatchRequest::new("gate", currents(4096))).unwrap();
    assert_eq!(outcome.run.stages.len(), 3);
    assert!(outcome.run.succeeded(StageName::ForecastAnalysis));
    assert_eq!(outcome.run.overall_status, OverallStatus::PartialFailure);
    assert!(!outcome.forecasts.is_empty());
}

#[test]
fn test_ten_windows_form_one_inter_window_sequence() {
    let store = Arc::new(Repository::new());
    let pipeline = build(
        &settings(ForecastGate::AfterDetection),
        Arc::new(MockAutoencoder::with_seed(3)),
        store,
    );

    // 1024 + 9 * 512 samples: exactly ten windows
    let outcome = pipeline.run(&BatchRequest::new("inter", currents(5632))).unwrap();
    assert_eq!(outcome.run.overall_status, OverallStatus::Success);
    assert_eq!(outcome.run.summary.window_count, 10);
    assert_eq!(outcome.verdicts.len(), 10);
    assert_eq!(outcome.forecasts.len(), 1);

    let forecast = &outcome.forecasts[0];
    assert_eq!(forecast.strategy, SequenceStrategy::InterWindow);
    assert_eq!(forecast.window_index, 0);
    assert_eq!(forecast.forecast.values.len(), 3);
    assert!(forecast.forecast.values.iter().all(|row| row.len() == 119));
    assert_eq!(forecast.forecast.metadata.model, ModelKind::DualLstm);

    let counted: usize = outcome.run.summary.health_counts.values().sum();
    assert_eq!(counted, 10);
    assert_eq!(outcome.run.summary.anomalous_windows, outcome.anomalous_windows());
}

#[test]
fn test_persistence_failure_fails_only_its_stage() {
    let store = Arc::new(RejectingStore {
        inner: Repository::new(),
        reject: DocumentKind::Anomaly,
    });
    let pipeline = build(
        &settings(ForecastGate::FeaturesOnly),
        Arc::new(MockAutoencoder::with_seed(5)),
        store.clone(),
    );

    let outcome = pipeline.run(&BatchRequest::new("rejected", currents(4096))).unwrap();
    let detection = outcome.run.stage(StageName::AnomalyDetection).unwrap();
    assert_eq!(detection.error_kind, Some(ErrorKind::Persistence));
    assert!(outcome.run.succeeded(StageName::FeatureExtraction));
    assert!(outcome.run.succeeded(StageName::ForecastAnalysis));
    assert_eq!(outcome.run.overall_status, OverallStatus::PartialFailure);
    assert!(store.find(DocumentKind::Forecast, "rejected").is_ok());
}

#[test]
fn test_forecast_disabled_is_skipped() {
    let store = Arc::new(Repository::new());
    let pipeline = build(
        &settings(ForecastGate::AfterDetection),
        Arc::new(MockAutoencoder::with_seed(9)),
        store,
    );

    let request = BatchRequest::new("no-forecast", currents(2048)).with_forecast_steps(0);
    let outcome = pipeline.run(&request).unwrap();
    let forecast = outcome.run.stage(StageName::ForecastAnalysis).unwrap();
    assert_eq!(forecast.status, StageStatus::Skipped);
    assert_eq!(outcome.run.overall_status, OverallStatus::Success);
    assert!(outcome.forecasts.is_empty());
}

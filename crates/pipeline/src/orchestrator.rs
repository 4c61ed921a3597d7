//! Pipeline Orchestrator
//!
//! Runs feature extraction, anomaly detection and forecasting over one
//! batch. A failing stage is recorded on the run and never propagated; a
//! stage whose input came from a failed stage is not attempted. Only an
//! invalid windowing configuration aborts the run before any stage starts.

use crate::error::PipelineError;
use crate::request::BatchRequest;
use crate::run::{OverallStatus, PipelineRun, RunSummary, StageName, StageResult};
use crate::settings::{ForecastGate, PipelineSettings};
use anomaly_scoring::{AnomalyScorer, AnomalyVerdict, ScoringConfig};
use chrono::Utc;
use data_validator::{Normalizer, ValidationError, Validator, WindowingConfig};
use feature_engine::{FeatureExtractor, FeatureGroups, FeatureSchema};
use inference_engine::{
    Forecast, InferenceError, MockAutoencoder, MockForecaster, ModelArtifacts, PredictiveModel,
    RollingForecaster, SequenceBuilder, SequenceStrategy,
};
use metrics::{counter, histogram};
use sample_buffer::{Window, WindowSegmenter};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use storage::{DocumentKind, ResultDocument, ResultStore};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Features of one window. `vector` is `None` when assembly failed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowFeatures {
    pub window_index: usize,
    pub start: usize,
    pub end: usize,
    pub features: FeatureGroups,
    pub vector: Option<Vec<f64>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowVerdict {
    pub window_index: usize,
    pub verdict: AnomalyVerdict,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SequenceForecast {
    pub window_index: usize,
    pub strategy: SequenceStrategy,
    pub forecast: Forecast,
}

/// A finished run with the outputs of its successful stages
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub run: PipelineRun,
    pub features: Vec<WindowFeatures>,
    pub verdicts: Vec<WindowVerdict>,
    pub forecasts: Vec<SequenceForecast>,
}

impl RunOutcome {
    pub fn anomalous_windows(&self) -> usize {
        self.verdicts
            .iter()
            .filter(|v| v.verdict.system.system_is_anomaly)
            .count()
    }
}

/// The scoring and forecasting models
pub struct Models {
    pub autoencoder: Arc<dyn PredictiveModel>,
    pub forecaster: Arc<dyn PredictiveModel>,
}

impl Models {
    /// Reference models standing in for trained networks
    pub fn reference() -> Self {
        Self {
            autoencoder: Arc::new(MockAutoencoder::mock()),
            forecaster: Arc::new(MockForecaster::mock()),
        }
    }
}

pub struct PipelineOrchestrator {
    windowing: WindowingConfig,
    forecast_steps: usize,
    forecast_gate: ForecastGate,
    validator: Validator,
    extractor: FeatureExtractor,
    schema: FeatureSchema,
    normalizer: Normalizer,
    scorer: AnomalyScorer,
    autoencoder: Arc<dyn PredictiveModel>,
    forecaster: RollingForecaster,
    sequences: SequenceBuilder,
    store: Arc<dyn ResultStore>,
}

impl PipelineOrchestrator {
    /// Validate settings, schema and artifacts once and build the stage
    /// chain
    pub fn new(
        settings: &PipelineSettings,
        artifacts: &ModelArtifacts,
        models: Models,
        store: Arc<dyn ResultStore>,
    ) -> Result<Self, PipelineError> {
        settings.windowing.validate()?;

        let extractor = FeatureExtractor::new(settings.features.clone())?;
        let schema = FeatureSchema::primary();
        schema.validate_against(&extractor)?;

        let dimension = schema.target_len();
        artifacts.validate(dimension)?;
        if models.autoencoder.input_dimension() != dimension {
            return Err(InferenceError::InvalidInputShape {
                expected: dimension,
                actual: models.autoencoder.input_dimension(),
            }
            .into());
        }

        let mut scoring = ScoringConfig::from_artifacts(artifacts).with_weights(settings.scoring.weights);
        scoring.monte_carlo_samples = settings.scoring.monte_carlo_samples;
        let scorer = AnomalyScorer::new(scoring, &schema)?;

        let forecaster = RollingForecaster::new(models.forecaster, artifacts.forecast_normalization.clone())?;

        info!(
            "Pipeline ready: window {} overlap {} forecast {} steps ({}, {})",
            settings.windowing.window_size,
            settings.windowing.overlap_ratio,
            settings.forecast_steps,
            models.autoencoder.kind(),
            forecaster.model_kind()
        );

        Ok(Self {
            windowing: settings.windowing,
            forecast_steps: settings.forecast_steps,
            forecast_gate: settings.forecast_gate,
            validator: Validator::new(settings.validation.clone()),
            extractor,
            normalizer: Normalizer::new(artifacts.normalization.clone())?,
            sequences: SequenceBuilder::new(dimension),
            schema,
            scorer,
            autoencoder: models.autoencoder,
            forecaster,
            store,
        })
    }

    pub fn windowing(&self) -> &WindowingConfig {
        &self.windowing
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    /// Run every stage over one batch. Returns `Err` only for an invalid
    /// windowing configuration.
    pub fn run(&self, request: &BatchRequest) -> Result<RunOutcome, PipelineError> {
        let started = Instant::now();
        let started_at = Utc::now();
        let run_id = Uuid::new_v4();
        let batch_id = request.batch_id.as_str();

        let windowing = request.windowing.unwrap_or(self.windowing);
        let step = windowing.validate()?;

        info!(
            "Starting pipeline run {} for batch {} ({} samples)",
            run_id,
            batch_id,
            request.currents.len()
        );

        let mut summary = RunSummary {
            data_length: request.currents.len(),
            use_windowing: request.use_windowing,
            window_size: windowing.window_size,
            overlap_ratio: windowing.overlap_ratio,
            step,
            ..RunSummary::default()
        };
        let mut stages = Vec::with_capacity(3);
        let mut verdicts = Vec::new();
        let mut forecasts = Vec::new();

        let (result, features) = self.run_stage(StageName::FeatureExtraction, batch_id, || {
            self.extract_features(request, &windowing, run_id)
        });
        stages.push(result);

        if let Some(features) = &features {
            summary.window_count = features.len();
            summary.valid_vectors = features.iter().filter(|w| w.vector.is_some()).count();

            let (result, detected) = self.run_stage(StageName::AnomalyDetection, batch_id, || {
                self.detect_anomalies(batch_id, features, run_id)
            });
            let detection_ok = result.success;
            stages.push(result);
            if let Some(detected) = detected {
                for v in &detected {
                    *summary
                        .health_counts
                        .entry(v.verdict.system.health_state)
                        .or_insert(0) += 1;
                }
                summary.anomalous_windows = detected
                    .iter()
                    .filter(|v| v.verdict.system.system_is_anomaly)
                    .count();
                verdicts = detected;
            }

            let steps = request.forecast_steps.unwrap_or(self.forecast_steps);
            if !request.use_windowing {
                stages.push(StageResult::skipped(
                    StageName::ForecastAnalysis,
                    "temporal models need windowed data",
                ));
            } else if steps == 0 {
                stages.push(StageResult::skipped(
                    StageName::ForecastAnalysis,
                    "forecasting disabled",
                ));
            } else if detection_ok || self.forecast_gate == ForecastGate::FeaturesOnly {
                let (result, predicted) = self.run_stage(StageName::ForecastAnalysis, batch_id, || {
                    self.forecast(batch_id, features, steps, run_id)
                });
                stages.push(result);
                if let Some(predicted) = predicted {
                    summary.sequences = predicted.len();
                    forecasts = predicted;
                }
            } else {
                debug!("Forecast stage not attempted for batch {}: anomaly detection failed", batch_id);
            }
        }

        let overall_status = OverallStatus::from_stages(&stages);
        summary.total_elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
        counter!("pipeline_runs_total", "status" => overall_status.as_str()).increment(1);

        let run = PipelineRun {
            run_id,
            batch_id: request.batch_id.clone(),
            started_at,
            finished_at: Utc::now(),
            stages,
            overall_status,
            summary,
        };
        self.persist_run(&run);

        info!(
            "Pipeline run {} for batch {} finished: {} in {:.1}ms",
            run_id, batch_id, overall_status, run.summary.total_elapsed_ms
        );

        Ok(RunOutcome {
            run,
            features: features.unwrap_or_default(),
            verdicts,
            forecasts,
        })
    }

    /// Time a stage and turn its error into a failed `StageResult`
    fn run_stage<T, F>(&self, stage: StageName, batch_id: &str, f: F) -> (StageResult, Option<T>)
    where
        F: FnOnce() -> Result<(T, usize), PipelineError>,
    {
        debug!("Stage {} started for batch {}", stage, batch_id);
        let start = Instant::now();
        let outcome = f();
        let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;
        histogram!("pipeline_stage_duration_ms", "stage" => stage.as_str()).record(elapsed_ms);

        match outcome {
            Ok((output, items)) => {
                info!(
                    "Stage {} completed for batch {}: {} items in {:.1}ms",
                    stage, batch_id, items, elapsed_ms
                );
                (StageResult::completed(stage, elapsed_ms, items), Some(output))
            }
            Err(e) => {
                error!("Stage {} failed for batch {}: {}", stage, batch_id, e);
                (StageResult::failed(stage, elapsed_ms, &e), None)
            }
        }
    }

    fn extract_features(
        &self,
        request: &BatchRequest,
        windowing: &WindowingConfig,
        run_id: Uuid,
    ) -> Result<(Vec<WindowFeatures>, usize), PipelineError> {
        let currents = &request.currents;
        self.validator
            .validate_channels(&currents.r, &currents.s, &currents.t)?;

        let windows: Vec<Window<'_>> = if request.use_windowing {
            let segmenter = WindowSegmenter::new(windowing)?;
            let windows: Vec<_> = segmenter.segment(currents).collect();
            if windows.is_empty() {
                return Err(ValidationError::InsufficientSamples {
                    required: windowing.window_size,
                    actual: currents.len(),
                }
                .into());
            }
            windows
        } else {
            if currents.is_empty() {
                return Err(ValidationError::InsufficientSamples {
                    required: 1,
                    actual: 0,
                }
                .into());
            }
            vec![WindowSegmenter::whole(currents)]
        };

        let mut out = Vec::with_capacity(windows.len());
        for window in &windows {
            let features = self.extractor.extract(window)?;
            let vector = match self.schema.assemble(&features) {
                Ok(vector) => Some(vector),
                Err(e) => {
                    warn!("Window {} rejected: {}", window.index, e);
                    None
                }
            };
            out.push(WindowFeatures {
                window_index: window.index,
                start: window.start,
                end: window.end,
                features,
                vector,
            });
        }
        counter!("pipeline_windows_processed_total").increment(out.len() as u64);

        self.store.put(ResultDocument::encode(
            DocumentKind::Features,
            request.batch_id.as_str(),
            run_id,
            &out,
        )?)?;
        let count = out.len();
        Ok((out, count))
    }

    fn detect_anomalies(
        &self,
        batch_id: &str,
        features: &[WindowFeatures],
        run_id: Uuid,
    ) -> Result<(Vec<WindowVerdict>, usize), PipelineError> {
        let valid: Vec<(usize, &Vec<f64>)> = features
            .iter()
            .filter_map(|w| w.vector.as_ref().map(|v| (w.window_index, v)))
            .collect();
        if valid.is_empty() {
            return Err(PipelineError::NoValidVectors);
        }

        let mut verdicts = Vec::with_capacity(valid.len());
        for (window_index, vector) in valid {
            let normalized = self.normalizer.normalize(vector)?;
            let verdict = self.scorer.evaluate(self.autoencoder.as_ref(), &normalized)?;
            verdicts.push(WindowVerdict {
                window_index,
                verdict,
            });
        }

        self.store.put(ResultDocument::encode(
            DocumentKind::Anomaly,
            batch_id,
            run_id,
            &verdicts,
        )?)?;
        let count = verdicts.len();
        Ok((verdicts, count))
    }

    fn forecast(
        &self,
        batch_id: &str,
        features: &[WindowFeatures],
        steps: usize,
        run_id: Uuid,
    ) -> Result<(Vec<SequenceForecast>, usize), PipelineError> {
        let vectors: Vec<Vec<f64>> = features
            .iter()
            .map(|w| w.vector.clone().unwrap_or_default())
            .collect();
        let sequences = self.sequences.build(&vectors);
        if sequences.is_empty() {
            return Err(PipelineError::NoSequences {
                windows: vectors.len(),
            });
        }

        let mut out = Vec::with_capacity(sequences.len());
        for sequence in &sequences {
            let forecast = self.forecaster.forecast(sequence.data.view(), steps)?;
            out.push(SequenceForecast {
                window_index: sequence.window_index,
                strategy: sequence.strategy,
                forecast,
            });
        }

        self.store.put(ResultDocument::encode(
            DocumentKind::Forecast,
            batch_id,
            run_id,
            &out,
        )?)?;
        let count = out.len();
        Ok((out, count))
    }

    fn persist_run(&self, run: &PipelineRun) {
        let stored = ResultDocument::encode(DocumentKind::Run, run.batch_id.as_str(), run.run_id, run)
            .and_then(|doc| self.store.put(doc));
        if let Err(e) = stored {
            error!("Failed to persist run {} for batch {}: {}", run.run_id, run.batch_id, e);
        }
    }
}

//! Batch Pipeline
//!
//! Orchestrates feature extraction, anomaly detection and forecasting over
//! one batch of three-phase current, recording a run with per-stage results.

pub mod error;
pub mod orchestrator;
pub mod request;
pub mod run;
pub mod settings;

pub use error::{ErrorKind, PipelineError};
pub use orchestrator::{
    Models, PipelineOrchestrator, RunOutcome, SequenceForecast, WindowFeatures, WindowVerdict,
};
pub use request::BatchRequest;
pub use run::{OverallStatus, PipelineRun, RunSummary, StageName, StageResult, StageStatus};
pub use settings::{
    load_layered, ArtifactSettings, ForecastGate, PipelineSettings, ScoringSettings, ENV_PREFIX,
};

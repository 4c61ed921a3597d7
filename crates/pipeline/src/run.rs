//! Run and Stage Records

use crate::error::{ErrorKind, PipelineError};
use anomaly_scoring::HealthState;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageName {
    FeatureExtraction,
    AnomalyDetection,
    ForecastAnalysis,
}

impl StageName {
    pub fn as_str(&self) -> &'static str {
        match self {
            StageName::FeatureExtraction => "feature_extraction",
            StageName::AnomalyDetection => "anomaly_detection",
            StageName::ForecastAnalysis => "forecast_analysis",
        }
    }
}

impl fmt::Display for StageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    Completed,
    Failed,
    /// Disabled by the request; not counted toward the overall status
    Skipped,
}

/// Outcome of one stage. Never mutated after the run finishes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageResult {
    pub stage: StageName,
    pub status: StageStatus,
    pub success: bool,
    pub elapsed_ms: f64,
    pub error_message: Option<String>,
    pub error_kind: Option<ErrorKind>,
    pub items_processed: Option<usize>,
}

impl StageResult {
    pub fn completed(stage: StageName, elapsed_ms: f64, items_processed: usize) -> Self {
        Self {
            stage,
            status: StageStatus::Completed,
            success: true,
            elapsed_ms,
            error_message: None,
            error_kind: None,
            items_processed: Some(items_processed),
        }
    }

    pub fn failed(stage: StageName, elapsed_ms: f64, error: &PipelineError) -> Self {
        Self {
            stage,
            status: StageStatus::Failed,
            success: false,
            elapsed_ms,
            error_message: Some(error.to_string()),
            error_kind: Some(error.kind()),
            items_processed: None,
        }
    }

    pub fn skipped(stage: StageName, reason: &str) -> Self {
        Self {
            stage,
            status: StageStatus::Skipped,
            success: false,
            elapsed_ms: 0.0,
            error_message: Some(reason.to_string()),
            error_kind: None,
            items_processed: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverallStatus {
    Success,
    PartialFailure,
    Failure,
}

impl OverallStatus {
    /// `Success` if every attempted stage succeeded, `Failure` if none did,
    /// `PartialFailure` otherwise. Skipped stages are not attempted.
    pub fn from_stages(stages: &[StageResult]) -> Self {
        let attempted: Vec<&StageResult> = stages
            .iter()
            .filter(|s| s.status != StageStatus::Skipped)
            .collect();
        let succeeded = attempted.iter().filter(|s| s.success).count();
        if succeeded == attempted.len() {
            OverallStatus::Success
        } else if succeeded == 0 {
            OverallStatus::Failure
        } else {
            OverallStatus::PartialFailure
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OverallStatus::Success => "success",
            OverallStatus::PartialFailure => "partial_failure",
            OverallStatus::Failure => "failure",
        }
    }
}

impl fmt::Display for OverallStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Samples per channel
    pub data_length: usize,
    pub window_count: usize,
    pub valid_vectors: usize,
    pub anomalous_windows: usize,
    pub health_counts: BTreeMap<HealthState, usize>,
    pub sequences: usize,
    pub use_windowing: bool,
    pub window_size: usize,
    pub overlap_ratio: f64,
    pub step: usize,
    pub total_elapsed_ms: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineRun {
    pub run_id: Uuid,
    pub batch_id: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub stages: Vec<StageResult>,
    pub overall_status: OverallStatus,
    pub summary: RunSummary,
}

impl PipelineRun {
    pub fn stage(&self, stage: StageName) -> Option<&StageResult> {
        self.stages.iter().find(|s| s.stage == stage)
    }

    pub fn succeeded(&self, stage: StageName) -> bool {
        self.stage(stage).map_or(false, |s| s.success)
    }
}

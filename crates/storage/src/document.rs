//! Result Documents

use crate::StorageError;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Kind of result a document carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    /// Per-window feature groups and window metadata
    Features,
    /// Per-window anomaly verdicts
    Anomaly,
    /// Per-sequence forecasts
    Forecast,
    /// The run record itself
    Run,
}

impl DocumentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentKind::Features => "features",
            DocumentKind::Anomaly => "anomaly",
            DocumentKind::Forecast => "forecast",
            DocumentKind::Run => "run",
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable result document. The payload is stored postcard-encoded and
/// decoded on demand into the caller's type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultDocument {
    pub id: Uuid,
    pub kind: DocumentKind,
    pub batch_id: String,
    pub run_id: Uuid,
    pub created_at: DateTime<Utc>,
    body: Vec<u8>,
}

impl ResultDocument {
    /// Encode `payload` into a new document
    pub fn encode<T: Serialize>(
        kind: DocumentKind,
        batch_id: impl Into<String>,
        run_id: Uuid,
        payload: &T,
    ) -> Result<Self, StorageError> {
        let body = postcard::to_allocvec(payload)
            .map_err(|e| StorageError::SerializationError(e.to_string()))?;
        Ok(Self {
            id: Uuid::new_v4(),
            kind,
            batch_id: batch_id.into(),
            run_id,
            created_at: Utc::now(),
            body,
        })
    }

    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, StorageError> {
        postcard::from_bytes(&self.body).map_err(|e| StorageError::SerializationError(e.to_string()))
    }

    /// Encoded payload size in bytes
    pub fn body_len(&self) -> usize {
        self.body.len()
    }
}

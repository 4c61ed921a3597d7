//! Storage Layer
//!
//! Write-once persistence of pipeline result documents behind the
//! `ResultStore` collaborator trait, with an in-memory repository.

mod document;
mod repository;

pub use document::{DocumentKind, ResultDocument};
pub use repository::Repository;

use thiserror::Error;
use uuid::Uuid;

/// Storage errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Record not found")]
    NotFound,
    #[error("{kind} document for batch {batch_id} already exists")]
    AlreadyExists { kind: DocumentKind, batch_id: String },
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

/// Persistence collaborator: accepts immutable documents, reads them back by
/// id, batch or run. Documents are never updated in place.
pub trait ResultStore: Send + Sync {
    /// Store a document; a second document of the same kind for the same
    /// batch is rejected with `AlreadyExists`
    fn put(&self, document: ResultDocument) -> Result<Uuid, StorageError>;

    fn get(&self, id: Uuid) -> Result<ResultDocument, StorageError>;

    fn find(&self, kind: DocumentKind, batch_id: &str) -> Result<ResultDocument, StorageError>;

    /// Every document written for a run, in insertion order
    fn find_by_run(&self, run_id: Uuid) -> Result<Vec<ResultDocument>, StorageError>;
}

//! Repository Implementation

use crate::{DocumentKind, ResultDocument, ResultStore, StorageError};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info};
use uuid::Uuid;

#[derive(Default)]
struct Tables {
    /// Encoded documents by id
    documents: HashMap<Uuid, Vec<u8>>,
    /// Insertion order
    order: Vec<Uuid>,
    by_batch: HashMap<(DocumentKind, String), Uuid>,
    by_run: HashMap<Uuid, Vec<Uuid>>,
}

/// In-memory write-once document repository
pub struct Repository {
    tables: Mutex<Tables>,
}

impl Repository {
    /// Create a new in-memory repository
    pub fn new() -> Self {
        info!("Creating in-memory repository");
        Self {
            tables: Mutex::new(Tables::default()),
        }
    }

    fn tables(&self) -> Result<MutexGuard<'_, Tables>, StorageError> {
        self.tables
            .lock()
            .map_err(|e| StorageError::DatabaseError(format!("Lock error: {}", e)))
    }

    fn decode(bytes: &[u8]) -> Result<ResultDocument, StorageError> {
        postcard::from_bytes(bytes).map_err(|e| StorageError::SerializationError(e.to_string()))
    }

    /// Total document count
    pub fn len(&self) -> usize {
        self.tables.lock().map(|t| t.documents.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every document of one kind, in insertion order
    pub fn list(&self, kind: DocumentKind) -> Result<Vec<ResultDocument>, StorageError> {
        let tables = self.tables()?;
        let mut out = Vec::new();
        for id in &tables.order {
            if let Some(bytes) = tables.documents.get(id) {
                let doc = Self::decode(bytes)?;
                if doc.kind == kind {
                    out.push(doc);
                }
            }
        }
        Ok(out)
    }

    /// Clear all data (for testing)
    pub fn clear(&self) {
        if let Ok(mut tables) = self.tables.lock() {
            *tables = Tables::default();
        }
    }
}

impl Default for Repository {
    fn default() -> Self {
        Self::new()
    }
}

impl ResultStore for Repository {
    fn put(&self, document: ResultDocument) -> Result<Uuid, StorageError> {
        let bytes = postcard::to_allocvec(&document)
            .map_err(|e| StorageError::SerializationError(e.to_string()))?;
        let mut tables = self.tables()?;

        let key = (document.kind, document.batch_id.clone());
        if tables.by_batch.contains_key(&key) || tables.documents.contains_key(&document.id) {
            return Err(StorageError::AlreadyExists {
                kind: document.kind,
                batch_id: document.batch_id,
            });
        }

        tables.by_batch.insert(key, document.id);
        tables.by_run.entry(document.run_id).or_default().push(document.id);
        tables.order.push(document.id);
        tables.documents.insert(document.id, bytes);
        debug!(
            "Stored {} document {} for batch {}",
            document.kind, document.id, document.batch_id
        );
        Ok(document.id)
    }

    fn get(&self, id: Uuid) -> Result<ResultDocument, StorageError> {
        let tables = self.tables()?;
        let bytes = tables.documents.get(&id).ok_or(StorageError::NotFound)?;
        Self::decode(bytes)
    }

    fn find(&self, kind: DocumentKind, batch_id: &str) -> Result<ResultDocument, StorageError> {
        let tables = self.tables()?;
        let id = tables
            .by_batch
            .get(&(kind, batch_id.to_string()))
            .ok_or(StorageError::NotFound)?;
        let bytes = tables.documents.get(id).ok_or(StorageError::NotFound)?;
        Self::decode(bytes)
    }

    fn find_by_run(&self, run_id: Uuid) -> Result<Vec<ResultDocument>, StorageError> {
        let tables = self.tables()?;
        let Some(ids) = tables.by_run.get(&run_id) else {
            return Ok(Vec::new());
        };
        ids.iter()
            .filter_map(|id| tables.documents.get(id))
            .map(|bytes| Self::decode(bytes))
            .collect()
    }
}

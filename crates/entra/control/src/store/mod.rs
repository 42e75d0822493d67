//! Record storage
//!
//! The control loops read records and write back metadata (finalizers) and
//! status through [`RecordStore`]. Writes carry the record's resource version
//! and are rejected when it is stale.

mod memory;

pub use memory::InMemoryStore;

use async_trait::async_trait;
use entra_types::{ManagedObject, ResourceKey};
use thiserror::Error;

/// Storage errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("Record not found: {0}")]
    NotFound(ResourceKey),

    #[error("Conflict on {key}: expected version {expected}, found {actual}")]
    Conflict {
        key: ResourceKey,
        expected: u64,
        actual: u64,
    },

    /// The record is being deleted and no longer accepts spec changes
    #[error("Record is terminating: {0}")]
    Terminating(ResourceKey),

    #[error("Storage error: {0}")]
    Storage(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Controller-facing view of record storage
#[async_trait]
pub trait RecordStore<R: ManagedObject>: Send + Sync {
    async fn get(&self, key: &ResourceKey) -> StoreResult<Option<R>>;

    async fn list(&self) -> StoreResult<Vec<R>>;

    /// Persists the record's finalizers.
    ///
    /// Returns `None` when the write released the last finalizer of a
    /// deleting record and the record was removed.
    async fn update_metadata(&self, record: &R) -> StoreResult<Option<R>>;

    /// Persists the record's status.
    async fn update_status(&self, record: &R) -> StoreResult<R>;
}

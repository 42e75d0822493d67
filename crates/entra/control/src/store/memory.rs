//! In-memory record storage.
//!
//! Emulates the hosting platform: generation moves on spec changes,
//! deletion only sets the deletion marker while finalizers remain, and the
//! record is purged once the last finalizer is released.

use super::{RecordStore, StoreError, StoreResult};
use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use entra_types::{ManagedObject, ObjectMeta, ResourceKey};
use std::sync::Arc;

/// In-memory store for one resource kind
pub struct InMemoryStore<R: ManagedObject> {
    records: Arc<DashMap<ResourceKey, R>>,
}

impl<R: ManagedObject> InMemoryStore<R> {
    pub fn new() -> Self {
        Self {
            records: Arc::new(DashMap::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Creates the record or replaces its spec.
    ///
    /// Generation is bumped only when the resource spec actually changes.
    pub fn apply(&self, key: &ResourceKey, spec: R::Spec) -> StoreResult<R> {
        if let Some(mut existing) = self.records.get_mut(key) {
            if existing.metadata().is_deleting() {
                return Err(StoreError::Terminating(key.clone()));
            }
            if *existing.spec() != spec {
                *existing.spec_mut() = spec;
                let meta = existing.metadata_mut();
                meta.generation += 1;
                meta.resource_version += 1;
            }
            return Ok(existing.clone());
        }

        let mut metadata = ObjectMeta::new(&key.namespace, &key.name);
        metadata.resource_version = 1;
        metadata.creation_timestamp = Some(Utc::now());
        let record = R::from_parts(metadata, spec, R::Status::default());
        self.records.insert(key.clone(), record.clone());
        Ok(record)
    }

    /// Requests deletion.
    ///
    /// Without finalizers the record is removed at once and `None` is
    /// returned; otherwise the deletion marker is set.
    pub fn request_deletion(&self, key: &ResourceKey) -> StoreResult<Option<R>> {
        {
            let mut record = self
                .records
                .get_mut(key)
                .ok_or_else(|| StoreError::NotFound(key.clone()))?;
            if !record.metadata().finalizers.is_empty() {
                let meta = record.metadata_mut();
                if meta.deletion_timestamp.is_none() {
                    meta.deletion_timestamp = Some(Utc::now());
                    meta.resource_version += 1;
                }
                return Ok(Some(record.clone()));
            }
        }

        self.records.remove(key);
        Ok(None)
    }

    fn check_version(key: &ResourceKey, stored: &R, incoming: &R) -> StoreResult<()> {
        let expected = incoming.metadata().resource_version;
        let actual = stored.metadata().resource_version;
        if expected != actual {
            return Err(StoreError::Conflict {
                key: key.clone(),
                expected,
                actual,
            });
        }
        Ok(())
    }
}

impl<R: ManagedObject> Default for InMemoryStore<R> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<R: ManagedObject> RecordStore<R> for InMemoryStore<R> {
    async fn get(&self, key: &ResourceKey) -> StoreResult<Option<R>> {
        Ok(self.records.get(key).map(|r| r.clone()))
    }

    async fn list(&self) -> StoreResult<Vec<R>> {
        let mut records: Vec<R> = self.records.iter().map(|r| r.value().clone()).collect();
        records.sort_by_key(|r| r.key());
        Ok(records)
    }

    async fn update_metadata(&self, record: &R) -> StoreResult<Option<R>> {
        let key = record.key();
        {
            let mut stored = self
                .records
                .get_mut(&key)
                .ok_or_else(|| StoreError::NotFound(key.clone()))?;
            Self::check_version(&key, &stored, record)?;

            let meta = stored.metadata_mut();
            meta.finalizers = record.metadata().finalizers.clone();
            meta.resource_version += 1;

            if !(meta.is_deleting() && meta.finalizers.is_empty()) {
                return Ok(Some(stored.clone()));
            }
        }

        self.records.remove(&key);
        tracing::debug!(resource = %key, "Record released by last finalizer");
        Ok(None)
    }

    async fn update_status(&self, record: &R) -> StoreResult<R> {
        let key = record.key();
        let mut stored = self
            .records
            .get_mut(&key)
            .ok_or_else(|| StoreError::NotFound(key.clone()))?;
        Self::check_version(&key, &stored, record)?;

        *stored.status_mut() = record.status().clone();
        stored.metadata_mut().resource_version += 1;
        Ok(stored.clone())
    }
}

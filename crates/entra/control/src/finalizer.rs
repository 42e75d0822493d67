//! Finalizer management
//!
//! A record carries its kind's finalizer from first observation until the
//! remote entity is confirmed absent.

use crate::error::ControlResult;
use crate::store::{RecordStore, StoreError};
use entra_types::ManagedObject;

/// Adds the finalizer and persists it, returning the stored record.
///
/// No write is issued when the finalizer is already present.
pub async fn ensure<R: ManagedObject>(
    store: &dyn RecordStore<R>,
    mut record: R,
    finalizer: &str,
) -> ControlResult<R> {
    if !record.metadata_mut().add_finalizer(finalizer) {
        return Ok(record);
    }

    let key = record.key();
    let stored = store
        .update_metadata(&record)
        .await?
        .ok_or(StoreError::NotFound(key.clone()))?;
    tracing::debug!(resource = %key, finalizer, "Added finalizer");
    Ok(stored)
}

/// Removes the finalizer and persists it.
///
/// Once the last finalizer of a deleting record is gone the store drops the
/// record.
pub async fn release<R: ManagedObject>(
    store: &dyn RecordStore<R>,
    mut record: R,
    finalizer: &str,
) -> ControlResult<()> {
    if !record.metadata_mut().remove_finalizer(finalizer) {
        return Ok(());
    }

    store.update_metadata(&record).await?;
    tracing::info!(resource = %record.key(), finalizer, "Removed finalizer");
    Ok(())
}

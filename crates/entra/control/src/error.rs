//! Error types for the reconciliation core

use crate::store::StoreError;
use entra_types::DirectoryError;
use std::time::Duration;
use thiserror::Error;

/// Result type for reconcile passes
pub type ControlResult<T> = Result<T, ControlError>;

/// Errors that end a reconcile pass early
#[derive(Debug, Error)]
pub enum ControlError {
    /// The declared spec cannot be acted on as written
    #[error("Configuration error: {0}")]
    Config(String),

    /// A remote directory call failed
    #[error("Directory error: {0}")]
    Directory(#[from] DirectoryError),

    /// Reading or writing the record failed
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// The pass exceeded its deadline
    #[error("Reconcile pass exceeded its deadline of {0:?}")]
    Timeout(Duration),
}

impl ControlError {
    /// Errors that only a spec or credential change can fix
    pub fn is_configuration(&self) -> bool {
        match self {
            ControlError::Config(_) => true,
            ControlError::Directory(e) => e.is_configuration(),
            _ => false,
        }
    }
}

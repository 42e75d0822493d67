//! Reconcile control loops
//!
//! Each pass loads the record, makes sure the finalizer is present, then
//! either tears the remote entity down (deletion requested), creates it (no
//! external ID yet) or corrects drift against it. Status is persisted only
//! after the remote effect it reports has been confirmed.

mod app_registration;
mod security_group;

pub use app_registration::AppRegistrationController;
pub use security_group::SecurityGroupController;

use crate::config::ControllerConfig;
use crate::error::{ControlError, ControlResult};
use crate::store::{RecordStore, StoreError};
use async_trait::async_trait;
use chrono::Utc;
use entra_types::{
    AppRegistrationStatus, Condition, ConditionStatus, ManagedObject, Phase, ResourceKey,
    SecurityGroupStatus,
};
use std::time::Duration;

/// What to do with a key after a pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Run again after the delay
    Requeue(Duration),
    /// Run again only when the record changes
    AwaitChange,
}

/// One control loop, driven per key by the runner
#[async_trait]
pub trait Reconciler: Send + Sync + 'static {
    /// Kind name for logs
    fn kind(&self) -> &'static str;

    async fn reconcile(&self, key: &ResourceKey) -> ControlResult<Action>;

    /// Requeue decision for a failed or timed-out pass
    fn error_policy(&self, key: &ResourceKey, error: &ControlError) -> Action;
}

/// Fixed-delay requeue per error class
pub(crate) fn requeue_for_error(config: &ControllerConfig, error: &ControlError) -> Action {
    match error {
        ControlError::Store(_) => Action::Requeue(config.status_retry()),
        ControlError::Timeout(_) => Action::Requeue(config.resync_interval()),
        ControlError::Config(_) | ControlError::Directory(_) => {
            Action::Requeue(config.error_retry())
        }
    }
}

/// Condition reasons
pub(crate) mod reason {
    pub const SYNCED: &str = "Synced";
    pub const PARTIAL_SYNC: &str = "PartialSync";
    pub const CREATING: &str = "Creating";
    pub const REMOTE_NOT_FOUND: &str = "RemoteNotFound";
    pub const REMOTE_ERROR: &str = "RemoteError";
    pub const CONFIGURATION_ERROR: &str = "ConfigurationError";
}

/// Outcome of a pass as surfaced in status
pub(crate) struct Report {
    pub phase: Phase,
    pub ready: ConditionStatus,
    pub reason: &'static str,
    pub message: String,
}

impl Report {
    pub fn new(phase: Phase, ready: ConditionStatus, reason: &'static str, message: impl Into<String>) -> Self {
        Self {
            phase,
            ready,
            reason,
            message: message.into(),
        }
    }

    /// Available when no warnings were collected, Warning otherwise
    pub fn from_warnings(in_sync_message: &str, warnings: &[String]) -> Self {
        if warnings.is_empty() {
            Self::new(Phase::Available, ConditionStatus::True, reason::SYNCED, in_sync_message)
        } else {
            Self::new(
                Phase::Warning,
                ConditionStatus::False,
                reason::PARTIAL_SYNC,
                warnings.join("; "),
            )
        }
    }

    /// Failed for configuration errors, Warning for everything else
    pub fn from_error(error: &ControlError) -> Self {
        if error.is_configuration() {
            Self::new(
                Phase::Failed,
                ConditionStatus::False,
                reason::CONFIGURATION_ERROR,
                error.to_string(),
            )
        } else {
            Self::new(
                Phase::Warning,
                ConditionStatus::False,
                reason::REMOTE_ERROR,
                error.to_string(),
            )
        }
    }
}

/// Status types that carry phase, message and the Ready condition
pub(crate) trait ReportedStatus {
    fn apply_report(&mut self, report: Report, generation: i64);
}

macro_rules! impl_reported_status {
    ($($status:ty),*) => {
        $(
            impl ReportedStatus for $status {
                fn apply_report(&mut self, report: Report, generation: i64) {
                    Condition::upsert(
                        &mut self.conditions,
                        Condition::ready(report.ready, report.reason, report.message.clone(), generation),
                    );
                    self.phase = Some(report.phase);
                    self.message = report.message;
                    self.observed_generation = generation;
                    self.last_run = Some(Utc::now());
                }
            }
        )*
    };
}

impl_reported_status!(AppRegistrationStatus, SecurityGroupStatus);

/// Writes the record's status, re-reading and re-applying it on version
/// conflicts up to `attempts` times.
pub(crate) async fn persist_status<R: ManagedObject>(
    store: &dyn RecordStore<R>,
    record: &R,
    attempts: u32,
) -> ControlResult<R> {
    let mut candidate = record.clone();
    let mut attempt = 1;

    loop {
        match store.update_status(&candidate).await {
            Ok(stored) => return Ok(stored),
            Err(StoreError::Conflict { .. }) if attempt < attempts => {
                let key = candidate.key();
                tracing::debug!(resource = %key, attempt, "Status write conflicted, retrying");
                let status = candidate.status().clone();
                candidate = store
                    .get(&key)
                    .await?
                    .ok_or(StoreError::NotFound(key))?;
                *candidate.status_mut() = status;
                attempt += 1;
            }
            Err(e) => return Err(e.into()),
        }
    }
}

//! Controller configuration
//!
//! Finalizer tokens and requeue intervals are injected here instead of
//! living as process-wide constants.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration shared by both control loops
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControllerConfig {
    /// Finalizer token placed on app registration records
    #[serde(default = "default_app_registration_finalizer")]
    pub app_registration_finalizer: String,

    /// Finalizer token placed on security group records
    #[serde(default = "default_security_group_finalizer")]
    pub security_group_finalizer: String,

    /// Re-check interval after every completed pass
    #[serde(default = "default_resync_interval")]
    pub resync_interval_secs: u64,

    /// Short requeue after creates and status persistence failures
    #[serde(default = "default_status_retry")]
    pub status_retry_secs: u64,

    /// Requeue after a failed remote call
    #[serde(default = "default_error_retry")]
    pub error_retry_secs: u64,

    /// Deadline applied to a single reconcile pass
    #[serde(default = "default_pass_timeout")]
    pub pass_timeout_secs: u64,

    /// Maximum passes running at once, per kind
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_reconciles: usize,

    /// Attempts at writing status when the record changed underneath
    #[serde(default = "default_status_update_attempts")]
    pub status_update_attempts: u32,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            app_registration_finalizer: default_app_registration_finalizer(),
            security_group_finalizer: default_security_group_finalizer(),
            resync_interval_secs: default_resync_interval(),
            status_retry_secs: default_status_retry(),
            error_retry_secs: default_error_retry(),
            pass_timeout_secs: default_pass_timeout(),
            max_concurrent_reconciles: default_max_concurrent(),
            status_update_attempts: default_status_update_attempts(),
        }
    }
}

impl ControllerConfig {
    pub fn resync_interval(&self) -> Duration {
        Duration::from_secs(self.resync_interval_secs)
    }

    pub fn status_retry(&self) -> Duration {
        Duration::from_secs(self.status_retry_secs)
    }

    pub fn error_retry(&self) -> Duration {
        Duration::from_secs(self.error_retry_secs)
    }

    pub fn pass_timeout(&self) -> Duration {
        Duration::from_secs(self.pass_timeout_secs)
    }
}

fn default_app_registration_finalizer() -> String {
    "finalizer.entraAppRegistration.iam.entra.governance.com".to_string()
}

fn default_security_group_finalizer() -> String {
    "finalizer.entraSecurityGroup.iam.entra.governance.com".to_string()
}

fn default_resync_interval() -> u64 {
    600
}

fn default_status_retry() -> u64 {
    10
}

fn default_error_retry() -> u64 {
    60
}

fn default_pass_timeout() -> u64 {
    120
}

fn default_max_concurrent() -> usize {
    4
}

fn default_status_update_attempts() -> u32 {
    3
}

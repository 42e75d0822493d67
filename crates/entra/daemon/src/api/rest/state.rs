//! Application state for API handlers

use entra_control::{InMemoryStore, ReconcileTrigger};
use entra_types::{EntraAppRegistration, EntraSecurityGroup, ManagedObject};
use std::sync::Arc;

/// Record store and reconcile trigger of one managed kind
pub struct KindHandle<R: ManagedObject> {
    pub store: Arc<InMemoryStore<R>>,
    pub trigger: Arc<dyn ReconcileTrigger>,
}

impl<R: ManagedObject> KindHandle<R> {
    pub fn new(store: Arc<InMemoryStore<R>>, trigger: Arc<dyn ReconcileTrigger>) -> Self {
        Self { store, trigger }
    }
}

impl<R: ManagedObject> Clone for KindHandle<R> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            trigger: self.trigger.clone(),
        }
    }
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub app_registrations: KindHandle<EntraAppRegistration>,

    pub security_groups: KindHandle<EntraSecurityGroup>,

    /// Daemon version
    pub version: String,

    /// Daemon start time
    pub started_at: chrono::DateTime<chrono::Utc>,
}

impl AppState {
    pub fn new(
        app_registrations: KindHandle<EntraAppRegistration>,
        security_groups: KindHandle<EntraSecurityGroup>,
    ) -> Self {
        Self {
            app_registrations,
            security_groups,
            version: env!("CARGO_PKG_VERSION").to_string(),
            started_at: chrono::Utc::now(),
        }
    }

    /// Get uptime as a human-readable string
    pub fn uptime(&self) -> String {
        let duration = chrono::Utc::now() - self.started_at;
        let secs = duration.num_seconds();

        if secs < 60 {
            format!("{}s", secs)
        } else if secs < 3600 {
            format!("{}m {}s", secs / 60, secs % 60)
        } else if secs < 86400 {
            format!("{}h {}m", secs / 3600, (secs % 3600) / 60)
        } else {
            format!("{}d {}h", secs / 86400, (secs % 86400) / 3600)
        }
    }
}

/// Routes a managed kind to its handle in [`AppState`]
pub trait StateKind: ManagedObject {
    /// Path segment under `/api/v1`
    const COLLECTION: &'static str;

    fn handle(state: &AppState) -> &KindHandle<Self>;
}

impl StateKind for EntraAppRegistration {
    const COLLECTION: &'static str = "appregistrations";

    fn handle(state: &AppState) -> &KindHandle<Self> {
        &state.app_registrations
    }
}

impl StateKind for EntraSecurityGroup {
    const COLLECTION: &'static str = "securitygroups";

    fn handle(state: &AppState) -> &KindHandle<Self> {
        &state.security_groups
    }
}

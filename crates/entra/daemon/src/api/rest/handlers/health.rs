//! Health and status handlers

use crate::api::rest::state::AppState;
use crate::error::ApiResult;
use axum::{extract::State, Json};
use entra_control::RecordStore;
use entra_types::Phase;
use serde::Serialize;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthCheckResponse {
    pub status: String,
    pub version: String,
    pub uptime: String,
}

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Json<HealthCheckResponse> {
    Json(HealthCheckResponse {
        status: "healthy".to_string(),
        version: state.version.clone(),
        uptime: state.uptime(),
    })
}

/// Daemon status response
#[derive(Debug, Serialize)]
pub struct DaemonStatusResponse {
    pub status: String,
    pub version: String,
    pub uptime: String,
    pub started_at: chrono::DateTime<chrono::Utc>,
    pub app_registrations: KindStats,
    pub security_groups: KindStats,
}

/// Record counts of one kind, by reported phase
#[derive(Debug, Default, Serialize)]
pub struct KindStats {
    pub total: usize,
    pub available: usize,
    pub pending: usize,
    pub warning: usize,
    pub failed: usize,
    pub deleting: usize,
}

impl KindStats {
    fn record(&mut self, phase: Option<Phase>, deleting: bool) {
        self.total += 1;
        if deleting {
            self.deleting += 1;
            return;
        }
        match phase {
            Some(Phase::Available) | Some(Phase::Success) => self.available += 1,
            Some(Phase::Warning) => self.warning += 1,
            Some(Phase::Failed) => self.failed += 1,
            Some(Phase::Pending) | None => self.pending += 1,
        }
    }
}

/// Daemon status endpoint
pub async fn daemon_status(State(state): State<AppState>) -> ApiResult<Json<DaemonStatusResponse>> {
    let mut app_registrations = KindStats::default();
    for app in state.app_registrations.store.list().await? {
        app_registrations.record(app.status.phase, app.metadata.is_deleting());
    }

    let mut security_groups = KindStats::default();
    for group in state.security_groups.store.list().await? {
        security_groups.record(group.status.phase, group.metadata.is_deleting());
    }

    Ok(Json(DaemonStatusResponse {
        status: "healthy".to_string(),
        version: state.version.clone(),
        uptime: state.uptime(),
        started_at: state.started_at,
        app_registrations,
        security_groups,
    }))
}

//! Managed resource handlers, shared by every kind
//!
//! Writes go to the record store and enqueue the key; the control loop does
//! the rest. Deleting a record only sets its deletion marker while a
//! finalizer is present.

use crate::api::rest::state::{AppState, StateKind};
use crate::error::{ApiError, ApiResult};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use entra_control::RecordStore;
use entra_types::ResourceKey;
use serde::{Deserialize, Serialize};

/// List filter
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub namespace: Option<String>,
}

/// Delete response
#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub namespace: String,
    pub name: String,
    /// False while a finalizer still holds the record
    pub removed: bool,
}

fn resource_key(namespace: &str, name: &str) -> ApiResult<ResourceKey> {
    let valid = |s: &str| !s.is_empty() && s.trim() == s;
    if !valid(namespace) || !valid(name) {
        return Err(ApiError::BadRequest(format!(
            "invalid resource key {}/{}",
            namespace, name
        )));
    }
    Ok(ResourceKey::new(namespace, name))
}

/// List records of a kind
pub async fn list<R: StateKind>(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<Vec<R>>> {
    let records = R::handle(&state).store.list().await?;
    let records = match query.namespace {
        Some(namespace) => records
            .into_iter()
            .filter(|r| r.metadata().namespace == namespace)
            .collect(),
        None => records,
    };
    Ok(Json(records))
}

/// Get a single record
pub async fn get<R: StateKind>(
    State(state): State<AppState>,
    Path((namespace, name)): Path<(String, String)>,
) -> ApiResult<Json<R>> {
    let key = resource_key(&namespace, &name)?;
    let record = R::handle(&state)
        .store
        .get(&key)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("{} {} not found", R::KIND, key)))?;
    Ok(Json(record))
}

/// Create a record or replace its spec
pub async fn apply<R: StateKind>(
    State(state): State<AppState>,
    Path((namespace, name)): Path<(String, String)>,
    Json(spec): Json<R::Spec>,
) -> ApiResult<Json<R>> {
    let key = resource_key(&namespace, &name)?;
    let handle = R::handle(&state);
    let record = handle.store.apply(&key, spec)?;

    tracing::info!(
        kind = R::KIND,
        resource = %key,
        generation = record.metadata().generation,
        "Applied record"
    );
    handle.trigger.enqueue(key);

    Ok(Json(record))
}

/// Request deletion of a record
pub async fn delete<R: StateKind>(
    State(state): State<AppState>,
    Path((namespace, name)): Path<(String, String)>,
) -> ApiResult<(StatusCode, Json<DeleteResponse>)> {
    let key = resource_key(&namespace, &name)?;
    let handle = R::handle(&state);
    let remaining = handle.store.request_deletion(&key)?;

    let removed = remaining.is_none();
    tracing::info!(kind = R::KIND, resource = %key, removed, "Deletion requested");
    if !removed {
        handle.trigger.enqueue(key.clone());
    }

    let status = if removed {
        StatusCode::OK
    } else {
        StatusCode::ACCEPTED
    };
    Ok((
        status,
        Json(DeleteResponse {
            namespace: key.namespace,
            name: key.name,
            removed,
        }),
    ))
}

//! Dependent-resource orchestrator for the service principal of an
//! application
//!
//! The service principal exists exactly when the resource spec's toggle is on. Its
//! attributes are applied at creation and not drift-corrected afterwards.

use crate::adapter::ServicePrincipalApi;
use crate::builder;
use entra_types::{AppRegistrationSpec, DirectoryResult};

/// What the orchestrator did in one pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DependentChange {
    Created(String),
    Deleted(String),
    Unchanged,
}

/// Drives the service principal toward the toggle in `spec`.
///
/// `dependent_id` is the status bookkeeping and is updated in place only
/// after the remote call is confirmed.
pub async fn reconcile_service_principal(
    api: &dyn ServicePrincipalApi,
    spec: &AppRegistrationSpec,
    app_id: &str,
    dependent_id: &mut String,
) -> DirectoryResult<DependentChange> {
    match (spec.service_principal_enabled(), dependent_id.is_empty()) {
        (false, true) | (true, false) => Ok(DependentChange::Unchanged),
        (false, false) => teardown(api, dependent_id).await,
        (true, true) => {
            let request = builder::service_principal_create(spec, app_id);
            let id = api.create(&request).await?;
            tracing::info!(app_id = %app_id, service_principal_id = %id, "Created service principal");
            *dependent_id = id.clone();
            Ok(DependentChange::Created(id))
        }
    }
}

/// Deletes the service principal if one is recorded.
///
/// A missing service principal counts as deleted.
pub async fn teardown(
    api: &dyn ServicePrincipalApi,
    dependent_id: &mut String,
) -> DirectoryResult<DependentChange> {
    if dependent_id.is_empty() {
        return Ok(DependentChange::Unchanged);
    }

    match api.delete(dependent_id.as_str()).await {
        Ok(()) => {
            tracing::info!(service_principal_id = %dependent_id, "Deleted service principal");
        }
        Err(e) if e.is_not_found() => {
            tracing::debug!(service_principal_id = %dependent_id, "Service principal already gone");
        }
        Err(e) => return Err(e),
    }

    let id = std::mem::take(dependent_id);
    Ok(DependentChange::Deleted(id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use entra_types::{DirectoryError, ServicePrincipalCreate, ServicePrincipalSpec};
    use parking_lot::Mutex;

    #[derive(Default)]
    struct Recorder {
        creates: Mutex<Vec<ServicePrincipalCreate>>,
        deletes: Mutex<Vec<String>>,
        delete_error: Option<DirectoryError>,
    }

    #[async_trait]
    impl ServicePrincipalApi for Recorder {
        async fn create(&self, request: &ServicePrincipalCreate) -> DirectoryResult<String> {
            self.creates.lock().push(request.clone());
            Ok("sp-1".to_string())
        }

        async fn delete(&self, id: &str) -> DirectoryResult<()> {
            self.deletes.lock().push(id.to_string());
            match &self.delete_error {
                Some(e) => Err(e.clone()),
                None => Ok(()),
            }
        }
    }

    fn spec(enabled: bool) -> AppRegistrationSpec {
        AppRegistrationSpec {
            name: "svc-a".into(),
            service_principal: Some(ServicePrincipalSpec {
                enabled,
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_toggle_on_creates_once() {
        let api = Recorder::default();
        let mut dependent_id = String::new();

        let change = reconcile_service_principal(&api, &spec(true), "app-1", &mut dependent_id)
            .await
            .unwrap();
        assert_eq!(change, DependentChange::Created("sp-1".into()));
        assert_eq!(dependent_id, "sp-1");

        let change = reconcile_service_principal(&api, &spec(true), "app-1", &mut dependent_id)
            .await
            .unwrap();
        assert_eq!(change, DependentChange::Unchanged);
        assert_eq!(api.creates.lock().len(), 1);
        assert_eq!(api.creates.lock()[0].app_id, "app-1");
    }

    #[tokio::test]
    async fn test_toggle_off_deletes_once() {
        let api = Recorder::default();
        let mut dependent_id = "sp-1".to_string();

        let change = reconcile_service_principal(&api, &spec(false), "app-1", &mut dependent_id)
            .await
            .unwrap();
        assert_eq!(change, DependentChange::Deleted("sp-1".into()));
        assert!(dependent_id.is_empty());

        reconcile_service_principal(&api, &spec(false), "app-1", &mut dependent_id)
            .await
            .unwrap();
        assert_eq!(*api.deletes.lock(), vec!["sp-1".to_string()]);
    }

    #[tokio::test]
    async fn test_failed_delete_keeps_id() {
        let api = Recorder {
            delete_error: Some(DirectoryError::Transient("503".into())),
            ..Default::default()
        };
        let mut dependent_id = "sp-1".to_string();
        assert!(teardown(&api, &mut dependent_id).await.is_err());
        assert_eq!(dependent_id, "sp-1");
    }

    #[tokio::test]
    async fn test_missing_dependent_counts_as_deleted() {
        let api = Recorder {
            delete_error: Some(DirectoryError::NotFound("sp-1".into())),
            ..Default::default()
        };
        let mut dependent_id = "sp-1".to_string();
        assert!(teardown(&api, &mut dependent_id).await.is_ok());
        assert!(dependent_id.is_empty());
    }
}

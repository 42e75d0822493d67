//! Control loop for EntraAppRegistration

use super::{persist_status, reason, requeue_for_error, Action, Reconciler, Report, ReportedStatus};
use crate::adapter::DirectoryClient;
use crate::builder;
use crate::config::ControllerConfig;
use crate::credentials::{client_for, CredentialResolver};
use crate::dependent::{self, DependentChange};
use crate::drift;
use crate::error::{ControlError, ControlResult};
use crate::finalizer;
use crate::relationship::{self, ApplicationOwners};
use crate::store::RecordStore;
use async_trait::async_trait;
use entra_types::{
    ConditionStatus, EntraAppRegistration, ManagedObject, Phase, RelationshipSet, ResourceKey,
};
use std::sync::Arc;

/// Reconciles application registrations and their service principals
pub struct AppRegistrationController {
    store: Arc<dyn RecordStore<EntraAppRegistration>>,
    resolver: Arc<dyn CredentialResolver>,
    config: ControllerConfig,
}

impl AppRegistrationController {
    pub fn new(
        store: Arc<dyn RecordStore<EntraAppRegistration>>,
        resolver: Arc<dyn CredentialResolver>,
        config: ControllerConfig,
    ) -> Self {
        Self {
            store,
            resolver,
            config,
        }
    }

    fn finalizer(&self) -> &str {
        &self.config.app_registration_finalizer
    }

    async fn client(&self, app: &EntraAppRegistration) -> ControlResult<Arc<dyn DirectoryClient>> {
        client_for(
            self.resolver.as_ref(),
            app.spec.for_provider.as_ref(),
            &app.metadata.namespace,
        )
        .await
    }

    async fn persist(&self, app: &mut EntraAppRegistration) -> ControlResult<()> {
        *app = persist_status(self.store.as_ref(), app, self.config.status_update_attempts).await?;
        Ok(())
    }

    /// Create or correct drift, depending on whether the remote entity is known
    async fn converge(&self, app: &mut EntraAppRegistration) -> ControlResult<Action> {
        let client = self.client(app).await?;
        if app.status.external_id.is_empty() {
            self.create(app, client.as_ref()).await
        } else {
            self.sync(app, client.as_ref()).await
        }
    }

    async fn create(
        &self,
        app: &mut EntraAppRegistration,
        client: &dyn DirectoryClient,
    ) -> ControlResult<Action> {
        let key = app.key();
        let request = builder::application_create(&app.spec)?;
        let created = client.applications().create(&request).await?;

        tracing::info!(
            resource = %key,
            app_id = %created.app_id,
            object_id = %created.object_id,
            "Created application"
        );

        let generation = app.metadata.generation;
        let status = &mut app.status;
        status.external_id = created.app_id.clone();
        status.external_object_id = created.object_id;
        status.display_name = request.fields.display_name;
        status.managed_owners = RelationshipSet::new();
        status.apply_report(
            Report::new(
                Phase::Pending,
                ConditionStatus::False,
                reason::CREATING,
                "application created, waiting for first sync",
            ),
            generation,
        );

        if let Err(e) = self.persist(app).await {
            tracing::error!(
                resource = %key,
                app_id = %created.app_id,
                error = %e,
                "Application created but its identifiers could not be recorded"
            );
            return Err(e);
        }
        Ok(Action::Requeue(self.config.status_retry()))
    }

    async fn sync(
        &self,
        app: &mut EntraAppRegistration,
        client: &dyn DirectoryClient,
    ) -> ControlResult<Action> {
        let key = app.key();
        let applications = client.applications();
        let object_id = app.status.external_object_id.clone();

        let observed = match applications.get(&object_id).await {
            Ok(observed) => observed,
            Err(e) if e.is_not_found() => return self.forget_remote(app).await,
            Err(e) => return Err(e.into()),
        };

        let desired = builder::application_fields(&app.spec)?;
        let plan = drift::plan_application(&observed.fields, &desired);
        if plan.changed {
            applications.patch(&object_id, &plan.patch).await?;
            tracing::info!(resource = %key, object_id = %object_id, "Patched application");
        }

        let mut warnings = Vec::new();

        match builder::desired_owners(app.spec.owners.as_ref()) {
            Some(desired_owners) => {
                let edges = ApplicationOwners {
                    api: applications.clone(),
                    object_id: object_id.clone(),
                };
                match relationship::reconcile(&edges, &desired_owners, &app.status.managed_owners)
                    .await
                {
                    Ok(outcome) => {
                        if outcome.mutated() {
                            tracing::info!(
                                resource = %key,
                                added = outcome.added.len(),
                                removed = outcome.removed.len(),
                                "Synced application owners"
                            );
                        }
                        if let Some(summary) = outcome.failure_summary("owners") {
                            warnings.push(summary);
                        }
                        app.status.managed_owners = outcome.managed;
                    }
                    Err(e) => warnings.push(format!("failed to read owners: {}", e)),
                }
            }
            None => app.status.managed_owners = RelationshipSet::new(),
        }

        let change = dependent::reconcile_service_principal(
            client.service_principals().as_ref(),
            &app.spec,
            &app.status.external_id,
            &mut app.status.dependent_id,
        )
        .await;
        match change {
            Ok(DependentChange::Unchanged) => {}
            Ok(change) => tracing::debug!(resource = %key, ?change, "Service principal updated"),
            Err(e) => warnings.push(format!("service principal: {}", e)),
        }

        if !warnings.is_empty() {
            tracing::warn!(resource = %key, warnings = %warnings.join("; "), "Application partially synced");
        }

        let generation = app.metadata.generation;
        app.status.display_name = desired.display_name;
        app.status
            .apply_report(Report::from_warnings("application in sync", &warnings), generation);
        self.persist(app).await?;

        Ok(Action::Requeue(self.config.resync_interval()))
    }

    /// The recorded application is gone: clear its identifiers so the next
    /// pass creates it again.
    async fn forget_remote(&self, app: &mut EntraAppRegistration) -> ControlResult<Action> {
        let message = format!(
            "application {} was not found in the directory and will be re-created",
            app.status.external_id
        );
        tracing::warn!(resource = %app.key(), app_id = %app.status.external_id, "Application disappeared from the directory");

        let generation = app.metadata.generation;
        let status = &mut app.status;
        status.external_id.clear();
        status.external_object_id.clear();
        status.managed_owners = RelationshipSet::new();
        status.dependent_id.clear();
        status.apply_report(
            Report::new(
                Phase::Pending,
                ConditionStatus::False,
                reason::REMOTE_NOT_FOUND,
                message,
            ),
            generation,
        );
        self.persist(app).await?;

        Ok(Action::Requeue(self.config.status_retry()))
    }

    /// Deletes the service principal, then the application, then releases
    /// the finalizer.
    async fn finalize(&self, app: &mut EntraAppRegistration) -> ControlResult<()> {
        let key = app.key();

        if !app.status.external_object_id.is_empty() || !app.status.dependent_id.is_empty() {
            let client = self.client(app).await?;

            dependent::teardown(client.service_principals().as_ref(), &mut app.status.dependent_id)
                .await?;

            if !app.status.external_object_id.is_empty() {
                match client
                    .applications()
                    .delete(&app.status.external_object_id)
                    .await
                {
                    Ok(()) => {
                        tracing::info!(resource = %key, app_id = %app.status.external_id, "Deleted application")
                    }
                    Err(e) if e.is_not_found() => {
                        tracing::info!(resource = %key, app_id = %app.status.external_id, "Application already deleted")
                    }
                    Err(e) => return Err(e.into()),
                }
            }
        }

        finalizer::release(self.store.as_ref(), app.clone(), self.finalizer()).await
    }

    /// Records a failed pass in status. Persistence problems are logged, not
    /// returned, so the original error drives the requeue.
    async fn record_failure(&self, app: &mut EntraAppRegistration, error: &ControlError) {
        let generation = app.metadata.generation;
        app.status.apply_report(Report::from_error(error), generation);
        if let Err(e) = self.persist(app).await {
            tracing::warn!(resource = %app.key(), error = %e, "Failed to record reconcile error in status");
        }
    }
}

#[async_trait]
impl Reconciler for AppRegistrationController {
    fn kind(&self) -> &'static str {
        EntraAppRegistration::KIND
    }

    async fn reconcile(&self, key: &ResourceKey) -> ControlResult<Action> {
        let Some(app) = self.store.get(key).await? else {
            tracing::debug!(resource = %key, "Record no longer exists");
            return Ok(Action::AwaitChange);
        };

        if app.metadata.is_deleting() {
            if !app.metadata.has_finalizer(self.finalizer()) {
                return Ok(Action::AwaitChange);
            }
            let mut app = app;
            return match self.finalize(&mut app).await {
                Ok(()) => Ok(Action::AwaitChange),
                Err(e @ ControlError::Store(_)) => Err(e),
                Err(e) => {
                    tracing::warn!(resource = %key, error = %e, "Deletion blocked; finalizer kept");
                    self.record_failure(&mut app, &e).await;
                    Err(e)
                }
            };
        }

        let mut app = finalizer::ensure(self.store.as_ref(), app, self.finalizer()).await?;

        match self.converge(&mut app).await {
            Ok(action) => Ok(action),
            Err(e @ ControlError::Store(_)) => Err(e),
            Err(e) if e.is_configuration() => {
                tracing::warn!(resource = %key, error = %e, "Configuration error; waiting for a spec change");
                self.record_failure(&mut app, &e).await;
                Ok(Action::Requeue(self.config.resync_interval()))
            }
            Err(e) => {
                self.record_failure(&mut app, &e).await;
                Err(e)
            }
        }
    }

    fn error_policy(&self, key: &ResourceKey, error: &ControlError) -> Action {
        let action = requeue_for_error(&self.config, error);
        tracing::debug!(resource = %key, error = %error, ?action, "Requeue after error");
        action
    }
}

//! End-to-end control loop tests for EntraAppRegistration against a fake
//! directory.

mod common;

use common::{FakeDirectory, FakeResolver};
use entra_control::{
    Action, AppRegistrationController, ControllerConfig, InMemoryStore, Reconciler, RecordStore,
};
use entra_types::{
    AppRegistrationSpec, Condition, ConditionStatus, CredentialRef, DirectoryError,
    EntraAppRegistration, LifecycleState, Phase, ResourceKey, ServicePrincipalSpec,
    READY_CONDITION,
};
use std::sync::Arc;

const FINALIZER: &str = "finalizer.entraAppRegistration.iam.entra.governance.com";

struct Harness {
    store: Arc<InMemoryStore<EntraAppRegistration>>,
    directory: FakeDirectory,
    controller: AppRegistrationController,
    config: ControllerConfig,
    key: ResourceKey,
}

impl Harness {
    fn new(spec: AppRegistrationSpec) -> Self {
        let store = Arc::new(InMemoryStore::new());
        let directory = FakeDirectory::new();
        let resolver = Arc::new(FakeResolver::new(directory.clone()));
        let config = ControllerConfig::default();
        let controller =
            AppRegistrationController::new(store.clone(), resolver, config.clone());
        let key = ResourceKey::new("team-a", "svc-a");
        store.apply(&key, spec).unwrap();

        Self {
            store,
            directory,
            controller,
            config,
            key,
        }
    }

    async fn pass(&self) -> Result<Action, entra_control::ControlError> {
        self.controller.reconcile(&self.key).await
    }

    async fn record(&self) -> EntraAppRegistration {
        self.store.get(&self.key).await.unwrap().unwrap()
    }

    async fn update_spec(&self, edit: impl FnOnce(&mut AppRegistrationSpec)) {
        let mut spec = self.record().await.spec;
        edit(&mut spec);
        self.store.apply(&self.key, spec).unwrap();
    }
}

fn spec(owners: Option<&[&str]>) -> AppRegistrationSpec {
    AppRegistrationSpec {
        for_provider: Some(CredentialRef::secret("entra-creds")),
        name: "svc-a".into(),
        owners: owners.map(|o| o.iter().map(|s| s.to_string()).collect()),
        ..Default::default()
    }
}

fn ready(record: &EntraAppRegistration) -> Condition {
    Condition::find(&record.status.conditions, READY_CONDITION)
        .cloned()
        .unwrap()
}

#[tokio::test]
async fn test_first_pass_creates_once_and_records_ids() {
    let h = Harness::new(spec(Some(&[])));

    let action = h.pass().await.unwrap();
    assert_eq!(action, Action::Requeue(h.config.status_retry()));
    assert_eq!(h.directory.calls(), vec!["app.create".to_string()]);

    let record = h.record().await;
    assert!(record.metadata.has_finalizer(FINALIZER));
    assert!(!record.status.external_id.is_empty());
    assert!(!record.status.external_object_id.is_empty());
    assert_eq!(record.status.phase, Some(Phase::Pending));
    assert_eq!(record.lifecycle(FINALIZER), LifecycleState::Creating);
}

#[tokio::test]
async fn test_unchanged_resource_issues_no_writes() {
    let h = Harness::new(spec(Some(&[])));
    h.pass().await.unwrap();

    let action = h.pass().await.unwrap();
    assert_eq!(action, Action::Requeue(h.config.resync_interval()));
    let synced = h.record().await;
    assert_eq!(synced.status.phase, Some(Phase::Available));
    assert_eq!(ready(&synced).status, ConditionStatus::True);
    let first_run = synced.status.last_run.unwrap();

    h.directory.clear_calls();
    h.pass().await.unwrap();
    assert!(h.directory.calls().is_empty(), "calls: {:?}", h.directory.calls());

    let again = h.record().await;
    assert_eq!(again.status.phase, Some(Phase::Available));
    assert_eq!(again.status.external_id, synced.status.external_id);
    assert!(again.status.last_run.unwrap() >= first_run);
    assert_eq!(
        ready(&again).last_transition_time,
        ready(&synced).last_transition_time
    );
}

#[tokio::test]
async fn test_owner_addition_is_applied_once() {
    let h = Harness::new(spec(Some(&[])));
    h.pass().await.unwrap();
    h.pass().await.unwrap();

    h.update_spec(|s| s.owners = Some(vec!["u1".into(), "u2".into()])).await;
    h.directory.clear_calls();
    h.pass().await.unwrap();
    assert_eq!(h.directory.calls(), vec!["app.owners.add:u1,u2".to_string()]);

    let record = h.record().await;
    assert_eq!(record.status.managed_owners.to_vec(), vec!["u1", "u2"]);
    assert_eq!(h.directory.owners_of_app(&record.status.external_object_id), vec!["u1", "u2"]);

    h.directory.clear_calls();
    h.pass().await.unwrap();
    assert_eq!(h.directory.count("app.owners"), 0);
}

#[tokio::test]
async fn test_out_of_band_owner_is_removed() {
    let h = Harness::new(spec(Some(&["u1"])));
    h.pass().await.unwrap();
    h.pass().await.unwrap();
    let object_id = h.record().await.status.external_object_id;

    h.directory.set_app_owners(&object_id, &["u1", "intruder"]);
    h.directory.clear_calls();
    h.pass().await.unwrap();

    assert_eq!(h.directory.calls(), vec!["app.owners.remove:intruder".to_string()]);
    assert_eq!(h.directory.owners_of_app(&object_id), vec!["u1"]);
}

#[tokio::test]
async fn test_unmanaged_owners_are_left_alone() {
    let h = Harness::new(spec(None));
    h.pass().await.unwrap();
    let object_id = h.record().await.status.external_object_id;
    h.directory.set_app_owners(&object_id, &["someone"]);

    h.pass().await.unwrap();
    assert_eq!(h.directory.count("app.owners"), 0);
    assert_eq!(h.directory.owners_of_app(&object_id), vec!["someone"]);
}

#[tokio::test]
async fn test_attribute_drift_is_patched_and_reorder_is_not() {
    let mut declared = spec(None);
    declared.tags = vec!["x".into(), "y".into(), "z".into()];
    let h = Harness::new(declared);
    h.pass().await.unwrap();
    h.pass().await.unwrap();
    let object_id = h.record().await.status.external_object_id;

    h.update_spec(|s| s.tags = vec!["z".into(), "x".into(), "y".into()]).await;
    h.directory.clear_calls();
    h.pass().await.unwrap();
    assert_eq!(h.directory.count("app.patch"), 0);

    h.directory
        .edit_application(&object_id, |app| app.fields.description = Some("edited".into()));
    h.pass().await.unwrap();
    assert_eq!(h.directory.count("app.patch"), 1);
    assert_eq!(h.directory.application(&object_id).unwrap().fields.description, None);
}

#[tokio::test]
async fn test_partial_owner_failure_reports_warning() {
    let h = Harness::new(spec(Some(&[])));
    h.pass().await.unwrap();
    h.pass().await.unwrap();

    h.directory.fail(
        "app.owners.add:ghost",
        DirectoryError::NotFound("Resource 'ghost' does not exist".into()),
    );
    h.update_spec(|s| s.owners = Some(vec!["u1".into(), "ghost".into()])).await;

    let action = h.pass().await.unwrap();
    assert_eq!(action, Action::Requeue(h.config.resync_interval()));

    let record = h.record().await;
    assert_eq!(record.status.phase, Some(Phase::Warning));
    assert!(record.status.message.contains("ghost"));
    assert_eq!(record.status.managed_owners.to_vec(), vec!["u1"]);
    assert_eq!(ready(&record).reason, "PartialSync");
    assert_eq!(h.directory.owners_of_app(&record.status.external_object_id), vec!["u1"]);
}

#[tokio::test]
async fn test_invalid_owner_reference_reports_warning_every_pass() {
    let h = Harness::new(spec(Some(&[])));
    h.pass().await.unwrap();
    h.pass().await.unwrap();

    h.directory.fail(
        "app.owners.add:not-a-guid",
        DirectoryError::BadRequest("Invalid object identifier 'not-a-guid'.".into()),
    );
    h.update_spec(|s| s.owners = Some(vec!["u1".into(), "not-a-guid".into()])).await;

    h.pass().await.unwrap();
    let record = h.record().await;
    assert_eq!(record.status.phase, Some(Phase::Warning));
    assert!(record.status.message.contains("not-a-guid"));
    assert_eq!(record.status.managed_owners.to_vec(), vec!["u1"]);
    assert_eq!(h.directory.owners_of_app(&record.status.external_object_id), vec!["u1"]);

    h.pass().await.unwrap();
    let record = h.record().await;
    assert_eq!(record.status.phase, Some(Phase::Warning));
    assert!(!record.status.managed_owners.contains("not-a-guid"));
}

#[tokio::test]
async fn test_service_principal_toggle() {
    let h = Harness::new(spec(None));
    h.pass().await.unwrap();
    h.pass().await.unwrap();
    assert_eq!(h.directory.service_principal_count(), 0);

    h.update_spec(|s| {
        s.service_principal = Some(ServicePrincipalSpec {
            enabled: true,
            disable_visibility_for_guests: true,
            ..Default::default()
        })
    }).await;
    h.pass().await.unwrap();
    let record = h.record().await;
    assert!(!record.status.dependent_id.is_empty());
    let sp = h.directory.service_principal(&record.status.dependent_id).unwrap();
    assert_eq!(sp.app_id, record.status.external_id);
    assert_eq!(sp.tags, vec!["HideApp".to_string()]);

    h.pass().await.unwrap();
    assert_eq!(h.directory.count("sp.create"), 1);

    h.update_spec(|s| {
        if let Some(sp) = s.service_principal.as_mut() {
            sp.enabled = false;
        }
    }).await;
    h.pass().await.unwrap();
    h.pass().await.unwrap();
    assert_eq!(h.directory.count("sp.delete"), 1);
    assert!(h.record().await.status.dependent_id.is_empty());
}

#[tokio::test]
async fn test_deletion_tears_down_dependent_before_primary() {
    let mut declared = spec(None);
    declared.service_principal = Some(ServicePrincipalSpec {
        enabled: true,
        ..Default::default()
    });
    let h = Harness::new(declared);
    h.pass().await.unwrap();
    h.pass().await.unwrap();
    let record = h.record().await;

    h.store.request_deletion(&h.key).unwrap();
    h.directory.clear_calls();
    let action = h.pass().await.unwrap();
    assert_eq!(action, Action::AwaitChange);

    assert_eq!(
        h.directory.calls(),
        vec![
            format!("sp.delete:{}", record.status.dependent_id),
            format!("app.delete:{}", record.status.external_object_id),
        ]
    );
    assert!(h.store.get(&h.key).await.unwrap().is_none());
    assert_eq!(h.directory.application_count(), 0);
}

#[tokio::test]
async fn test_failed_delete_keeps_finalizer() {
    let h = Harness::new(spec(None));
    h.pass().await.unwrap();
    h.pass().await.unwrap();

    h.directory
        .fail("app.delete", DirectoryError::Transient("service unavailable".into()));
    h.store.request_deletion(&h.key).unwrap();

    for _ in 0..2 {
        let err = h.pass().await.unwrap_err();
        assert_eq!(
            h.controller.error_policy(&h.key, &err),
            Action::Requeue(h.config.error_retry())
        );
        let record = h.record().await;
        assert!(record.metadata.has_finalizer(FINALIZER));
        assert_eq!(record.lifecycle(FINALIZER), LifecycleState::Deleting);
    }

    h.directory.heal();
    h.pass().await.unwrap();
    assert!(h.store.get(&h.key).await.unwrap().is_none());
}

#[tokio::test]
async fn test_deletion_tolerates_missing_remote() {
    let h = Harness::new(spec(None));
    h.pass().await.unwrap();
    let object_id = h.record().await.status.external_object_id;
    h.directory.drop_application(&object_id);

    h.store.request_deletion(&h.key).unwrap();
    assert_eq!(h.pass().await.unwrap(), Action::AwaitChange);
    assert!(h.store.get(&h.key).await.unwrap().is_none());
}

#[tokio::test]
async fn test_deletion_before_create_only_releases_finalizer() {
    let h = Harness::new(AppRegistrationSpec {
        for_provider: None,
        ..spec(None)
    });
    h.pass().await.unwrap();
    h.store.request_deletion(&h.key).unwrap();

    assert_eq!(h.pass().await.unwrap(), Action::AwaitChange);
    assert!(h.store.get(&h.key).await.unwrap().is_none());
    assert!(h.directory.calls().is_empty());
}

#[tokio::test]
async fn test_remote_not_found_clears_status_then_recreates() {
    let mut declared = spec(Some(&["u1"]));
    declared.service_principal = Some(ServicePrincipalSpec {
        enabled: true,
        ..Default::default()
    });
    let h = Harness::new(declared);
    h.pass().await.unwrap();
    h.pass().await.unwrap();
    let before = h.record().await;
    h.directory.drop_application(&before.status.external_object_id);

    let action = h.pass().await.unwrap();
    assert_eq!(action, Action::Requeue(h.config.status_retry()));
    let cleared = h.record().await;
    assert!(cleared.status.external_id.is_empty());
    assert!(cleared.status.external_object_id.is_empty());
    assert!(cleared.status.dependent_id.is_empty());
    assert!(cleared.status.managed_owners.is_empty());
    assert_eq!(cleared.status.phase, Some(Phase::Pending));
    assert_eq!(ready(&cleared).reason, "RemoteNotFound");

    h.pass().await.unwrap();
    let recreated = h.record().await;
    assert!(!recreated.status.external_id.is_empty());
    assert_ne!(recreated.status.external_id, before.status.external_id);
    assert_eq!(h.directory.count("app.create"), 2);
}

#[tokio::test]
async fn test_missing_provider_is_terminal() {
    let h = Harness::new(AppRegistrationSpec {
        for_provider: None,
        ..spec(None)
    });

    let action = h.pass().await.unwrap();
    assert_eq!(action, Action::Requeue(h.config.resync_interval()));

    let record = h.record().await;
    assert!(record.metadata.has_finalizer(FINALIZER));
    assert_eq!(record.status.phase, Some(Phase::Failed));
    assert_eq!(ready(&record).reason, "ConfigurationError");
    assert!(h.directory.calls().is_empty());
}

#[tokio::test]
async fn test_workload_identity_is_unsupported() {
    let h = Harness::new(AppRegistrationSpec {
        for_provider: Some(CredentialRef {
            credential_secret_ref: None,
            service_account_ref: Some("entra-sa".into()),
        }),
        ..spec(None)
    });

    h.pass().await.unwrap();
    let record = h.record().await;
    assert_eq!(record.status.phase, Some(Phase::Failed));
    assert!(record.status.message.contains("workload identity"));
}

#[tokio::test]
async fn test_transient_get_failure_is_retried() {
    let h = Harness::new(spec(None));
    h.pass().await.unwrap();

    h.directory
        .fail("app.get", DirectoryError::Throttled { retry_after_secs: Some(5) });
    let err = h.pass().await.unwrap_err();
    assert_eq!(
        h.controller.error_policy(&h.key, &err),
        Action::Requeue(h.config.error_retry())
    );

    let record = h.record().await;
    assert_eq!(record.status.phase, Some(Phase::Warning));
    assert!(!record.status.external_id.is_empty());
    assert_eq!(h.directory.count("app.create"), 1);
}

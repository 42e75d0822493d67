//! Control loop for EntraSecurityGroup

use super::{persist_status, reason, requeue_for_error, Action, Reconciler, Report, ReportedStatus};
use crate::adapter::{DirectoryClient, GroupApi};
use crate::builder;
use crate::config::ControllerConfig;
use crate::credentials::{client_for, CredentialResolver};
use crate::drift;
use crate::error::{ControlError, ControlResult};
use crate::finalizer;
use crate::relationship::{self, GroupEdges};
use crate::store::RecordStore;
use async_trait::async_trait;
use entra_types::{
    ConditionStatus, EntraSecurityGroup, GroupRelation, ManagedObject, Phase, RelationshipSet,
    ResourceKey,
};
use std::sync::Arc;

/// Reconciles security groups with their owner and member sets
pub struct SecurityGroupController {
    store: Arc<dyn RecordStore<EntraSecurityGroup>>,
    resolver: Arc<dyn CredentialResolver>,
    config: ControllerConfig,
}

impl SecurityGroupController {
    pub fn new(
        store: Arc<dyn RecordStore<EntraSecurityGroup>>,
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
        &self.config.security_group_finalizer
    }

    async fn client(&self, group: &EntraSecurityGroup) -> ControlResult<Arc<dyn DirectoryClient>> {
        client_for(
            self.resolver.as_ref(),
            group.spec.for_provider.as_ref(),
            &group.metadata.namespace,
        )
        .await
    }

    async fn persist(&self, group: &mut EntraSecurityGroup) -> ControlResult<()> {
        *group =
            persist_status(self.store.as_ref(), group, self.config.status_update_attempts).await?;
        Ok(())
    }

    async fn converge(&self, group: &mut EntraSecurityGroup) -> ControlResult<Action> {
        let client = self.client(group).await?;
        let groups = client.groups();
        if group.status.external_id.is_empty() {
            self.create(group, groups).await
        } else {
            self.sync(group, groups).await
        }
    }

    async fn create(
        &self,
        group: &mut EntraSecurityGroup,
        groups: Arc<dyn GroupApi>,
    ) -> ControlResult<Action> {
        let key = group.key();
        let request = builder::group_create(&group.spec)?;
        let created = groups.create(&request).await?;

        tracing::info!(resource = %key, group_id = %created.id, "Created security group");

        let generation = group.metadata.generation;
        let status = &mut group.status;
        status.external_id = created.id.clone();
        status.display_name = created.display_name;
        status.managed_owners = RelationshipSet::new();
        status.managed_members = RelationshipSet::new();
        status.apply_report(
            Report::new(
                Phase::Pending,
                ConditionStatus::False,
                reason::CREATING,
                "group created, waiting for first sync",
            ),
            generation,
        );

        if let Err(e) = self.persist(group).await {
            tracing::error!(
                resource = %key,
                group_id = %created.id,
                error = %e,
                "Group created but its identifier could not be recorded"
            );
            return Err(e);
        }
        Ok(Action::Requeue(self.config.status_retry()))
    }

    async fn sync(
        &self,
        group: &mut EntraSecurityGroup,
        groups: Arc<dyn GroupApi>,
    ) -> ControlResult<Action> {
        let key = group.key();
        let group_id = group.status.external_id.clone();

        let observed = match groups.get(&group_id).await {
            Ok(observed) => observed,
            Err(e) if e.is_not_found() => return self.forget_remote(group).await,
            Err(e) => return Err(e.into()),
        };

        let desired = builder::group_fields(&group.spec)?;
        let plan = drift::plan_group(&observed.fields, &desired);
        if plan.changed {
            groups.patch(&group_id, &plan.patch).await?;
            tracing::info!(resource = %key, group_id = %group_id, "Patched security group");
        }

        let mut warnings = Vec::new();

        let owners = builder::desired_owners(group.spec.owners.as_ref());
        group.status.managed_owners = sync_relation(
            &key,
            &groups,
            &group_id,
            GroupRelation::Owners,
            owners,
            &group.status.managed_owners,
            &mut warnings,
        )
        .await;

        let members = builder::desired_members(group.spec.members.as_ref());
        group.status.managed_members = sync_relation(
            &key,
            &groups,
            &group_id,
            GroupRelation::Members,
            members,
            &group.status.managed_members,
            &mut warnings,
        )
        .await;

        if !warnings.is_empty() {
            tracing::warn!(resource = %key, warnings = %warnings.join("; "), "Group partially synced");
        }

        let generation = group.metadata.generation;
        group.status.display_name = desired.display_name;
        group
            .status
            .apply_report(Report::from_warnings("group in sync", &warnings), generation);
        self.persist(group).await?;

        Ok(Action::Requeue(self.config.resync_interval()))
    }

    async fn forget_remote(&self, group: &mut EntraSecurityGroup) -> ControlResult<Action> {
        let message = format!(
            "group {} was not found in the directory and will be re-created",
            group.status.external_id
        );
        tracing::warn!(resource = %group.key(), group_id = %group.status.external_id, "Group disappeared from the directory");

        let generation = group.metadata.generation;
        let status = &mut group.status;
        status.external_id.clear();
        status.managed_owners = RelationshipSet::new();
        status.managed_members = RelationshipSet::new();
        status.apply_report(
            Report::new(
                Phase::Pending,
                ConditionStatus::False,
                reason::REMOTE_NOT_FOUND,
                message,
            ),
            generation,
        );
        self.persist(group).await?;

        Ok(Action::Requeue(self.config.status_retry()))
    }

    async fn finalize(&self, group: &mut EntraSecurityGroup) -> ControlResult<()> {
        let key = group.key();

        if !group.status.external_id.is_empty() {
            let client = self.client(group).await?;
            match client.groups().delete(&group.status.external_id).await {
                Ok(()) => {
                    tracing::info!(resource = %key, group_id = %group.status.external_id, "Deleted security group")
                }
                Err(e) if e.is_not_found() => {
                    tracing::info!(resource = %key, group_id = %group.status.external_id, "Security group already deleted")
                }
                Err(e) => return Err(e.into()),
            }
        }

        finalizer::release(self.store.as_ref(), group.clone(), self.finalizer()).await
    }

    async fn record_failure(&self, group: &mut EntraSecurityGroup, error: &ControlError) {
        let generation = group.metadata.generation;
        group.status.apply_report(Report::from_error(error), generation);
        if let Err(e) = self.persist(group).await {
            tracing::warn!(resource = %group.key(), error = %e, "Failed to record reconcile error in status");
        }
    }
}

/// Runs one group relationship and returns the managed set to record.
/// Unmanaged (`None`) relations record an empty set.
async fn sync_relation(
    key: &ResourceKey,
    groups: &Arc<dyn GroupApi>,
    group_id: &str,
    relation: GroupRelation,
    desired: Option<RelationshipSet>,
    managed: &RelationshipSet,
    warnings: &mut Vec<String>,
) -> RelationshipSet {
    let Some(desired) = desired else {
        return RelationshipSet::new();
    };

    let edges = GroupEdges {
        api: groups.clone(),
        group_id: group_id.to_string(),
        relation,
    };
    match relationship::reconcile(&edges, &desired, managed).await {
        Ok(outcome) => {
            if outcome.mutated() {
                tracing::info!(
                    resource = %key,
                    relation = relation.as_str(),
                    added = outcome.added.len(),
                    removed = outcome.removed.len(),
                    "Synced group relationship"
                );
            }
            if let Some(summary) = outcome.failure_summary(relation.as_str()) {
                warnings.push(summary);
            }
            outcome.managed
        }
        Err(e) => {
            warnings.push(format!("failed to read {}: {}", relation, e));
            managed.clone()
        }
    }
}

#[async_trait]
impl Reconciler for SecurityGroupController {
    fn kind(&self) -> &'static str {
        EntraSecurityGroup::KIND
    }

    async fn reconcile(&self, key: &ResourceKey) -> ControlResult<Action> {
        let Some(group) = self.store.get(key).await? else {
            tracing::debug!(resource = %key, "Record no longer exists");
            return Ok(Action::AwaitChange);
        };

        if group.metadata.is_deleting() {
            if !group.metadata.has_finalizer(self.finalizer()) {
                return Ok(Action::AwaitChange);
            }
            let mut group = group;
            return match self.finalize(&mut group).await {
                Ok(()) => Ok(Action::AwaitChange),
                Err(e @ ControlError::Store(_)) => Err(e),
                Err(e) => {
                    tracing::warn!(resource = %key, error = %e, "Deletion blocked; finalizer kept");
                    self.record_failure(&mut group, &e).await;
                    Err(e)
                }
            };
        }

        let mut group = finalizer::ensure(self.store.as_ref(), group, self.finalizer()).await?;

        match self.converge(&mut group).await {
            Ok(action) => Ok(action),
            Err(e @ ControlError::Store(_)) => Err(e),
            Err(e) if e.is_configuration() => {
                tracing::warn!(resource = %key, error = %e, "Configuration error; waiting for a spec change");
                self.record_failure(&mut group, &e).await;
                Ok(Action::Requeue(self.config.resync_interval()))
            }
            Err(e) => {
                self.record_failure(&mut group, &e).await;
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

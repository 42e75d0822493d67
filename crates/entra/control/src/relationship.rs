//! Relationship reconciler for owner and member sets
//!
//! The baseline a desired set is diffed against is the bookkeeping set
//! (`managed`) when the resource spec changed since the last pass, and the live
//! remote set when it did not, so out-of-band edits are caught. Mutations go
//! out as one batch first and fall back to one call per identifier when the
//! batch is rejected, so a single bad reference cannot block the rest.

use crate::adapter::{ApplicationApi, GroupApi};
use async_trait::async_trait;
use entra_types::{DirectoryError, DirectoryResult, GroupRelation, RelationshipSet};
use std::sync::Arc;

/// One relationship edge set of one remote entity
#[async_trait]
pub trait RelationshipEdges: Send + Sync {
    /// Label used in logs and status messages
    fn relation(&self) -> &'static str;

    async fn list(&self) -> DirectoryResult<Vec<String>>;

    async fn add(&self, ids: &[String]) -> DirectoryResult<()>;

    async fn remove(&self, ids: &[String]) -> DirectoryResult<()>;
}

/// Owners of an application
pub struct ApplicationOwners {
    pub api: Arc<dyn ApplicationApi>,
    pub object_id: String,
}

#[async_trait]
impl RelationshipEdges for ApplicationOwners {
    fn relation(&self) -> &'static str {
        "owners"
    }

    async fn list(&self) -> DirectoryResult<Vec<String>> {
        self.api.list_owners(&self.object_id).await
    }

    async fn add(&self, ids: &[String]) -> DirectoryResult<()> {
        self.api.add_owners(&self.object_id, ids).await
    }

    async fn remove(&self, ids: &[String]) -> DirectoryResult<()> {
        self.api.remove_owners(&self.object_id, ids).await
    }
}

/// Owners or members of a group
pub struct GroupEdges {
    pub api: Arc<dyn GroupApi>,
    pub group_id: String,
    pub relation: GroupRelation,
}

#[async_trait]
impl RelationshipEdges for GroupEdges {
    fn relation(&self) -> &'static str {
        self.relation.as_str()
    }

    async fn list(&self) -> DirectoryResult<Vec<String>> {
        self.api.list_relations(&self.group_id, self.relation).await
    }

    async fn add(&self, ids: &[String]) -> DirectoryResult<()> {
        self.api.add_relations(&self.group_id, self.relation, ids).await
    }

    async fn remove(&self, ids: &[String]) -> DirectoryResult<()> {
        self.api.remove_relations(&self.group_id, self.relation, ids).await
    }
}

/// Additions and removals needed to move `baseline` to `desired`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelationshipPlan {
    pub to_add: Vec<String>,
    pub to_remove: Vec<String>,
}

impl RelationshipPlan {
    pub fn is_empty(&self) -> bool {
        self.to_add.is_empty() && self.to_remove.is_empty()
    }
}

/// Set difference in both directions.
pub fn plan(desired: &RelationshipSet, baseline: &RelationshipSet) -> RelationshipPlan {
    RelationshipPlan {
        to_add: desired.difference(baseline),
        to_remove: baseline.difference(desired),
    }
}

/// Result of applying a relationship plan
#[derive(Debug, Clone, Default)]
pub struct RelationshipOutcome {
    /// Bookkeeping set to persist: what is now known to be applied remotely
    pub managed: RelationshipSet,
    pub added: Vec<String>,
    pub removed: Vec<String>,
    /// Identifiers whose failure was tolerated (already present / already gone)
    pub tolerated: Vec<String>,
    pub failed: Vec<(String, DirectoryError)>,
    /// Whether the live remote set was fetched as the baseline
    pub fetched_current: bool,
}

impl RelationshipOutcome {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn mutated(&self) -> bool {
        !self.added.is_empty() || !self.removed.is_empty()
    }

    /// Human-readable summary of failures, if any
    pub fn failure_summary(&self, relation: &str) -> Option<String> {
        if self.failed.is_empty() {
            return None;
        }
        let details: Vec<String> = self
            .failed
            .iter()
            .map(|(id, err)| format!("{}: {}", id, err))
            .collect();
        Some(format!(
            "failed to sync {} {}: {}",
            self.failed.len(),
            relation,
            details.join("; ")
        ))
    }
}

#[derive(Debug, Clone, Copy)]
enum Mutation {
    Add,
    Remove,
}

impl Mutation {
    fn tolerates(&self, err: &DirectoryError) -> bool {
        match self {
            Mutation::Add => err.is_tolerated_on_add(),
            Mutation::Remove => err.is_not_found(),
        }
    }
}

async fn mutate(edges: &dyn RelationshipEdges, op: Mutation, ids: &[String]) -> DirectoryResult<()> {
    match op {
        Mutation::Add => edges.add(ids).await,
        Mutation::Remove => edges.remove(ids).await,
    }
}

/// Applies one batch, falling back to per-identifier calls on failure.
///
/// Returns `(applied, tolerated, failed)`.
async fn apply_batch(
    edges: &dyn RelationshipEdges,
    op: Mutation,
    ids: &[String],
) -> (Vec<String>, Vec<String>, Vec<(String, DirectoryError)>) {
    let mut applied = Vec::new();
    let mut tolerated = Vec::new();
    let mut failed = Vec::new();

    if ids.is_empty() {
        return (applied, tolerated, failed);
    }

    let batch_err = match mutate(edges, op, ids).await {
        Ok(()) => return (ids.to_vec(), tolerated, failed),
        Err(e) => e,
    };

    if ids.len() == 1 {
        if op.tolerates(&batch_err) {
            tolerated.push(ids[0].clone());
        } else {
            failed.push((ids[0].clone(), batch_err));
        }
        return (applied, tolerated, failed);
    }

    tracing::warn!(
        relation = edges.relation(),
        operation = ?op,
        count = ids.len(),
        error = %batch_err,
        "Batch relationship update rejected, retrying individually"
    );

    for id in ids {
        match mutate(edges, op, std::slice::from_ref(id)).await {
            Ok(()) => applied.push(id.clone()),
            Err(e) if op.tolerates(&e) => {
                tracing::debug!(relation = edges.relation(), id = %id, error = %e, "Tolerated relationship response");
                tolerated.push(id.clone());
            }
            Err(e) => failed.push((id.clone(), e)),
        }
    }

    (applied, tolerated, failed)
}

/// Reconciles one relationship set.
///
/// Only a failure to read the live set is returned as an error; individual
/// add/remove failures are reported in the outcome, and the returned
/// `managed` set leaves out additions that did not land and keeps removals
/// that did not land.
pub async fn reconcile(
    edges: &dyn RelationshipEdges,
    desired: &RelationshipSet,
    managed: &RelationshipSet,
) -> DirectoryResult<RelationshipOutcome> {
    if desired.is_empty() && managed.is_empty() {
        return Ok(RelationshipOutcome::default());
    }

    let fetched_current = desired == managed;
    let baseline: RelationshipSet = if fetched_current {
        edges.list().await?.into_iter().collect()
    } else {
        managed.clone()
    };

    let delta = plan(desired, &baseline);
    if delta.is_empty() {
        return Ok(RelationshipOutcome {
            managed: desired.clone(),
            fetched_current,
            ..Default::default()
        });
    }

    tracing::debug!(
        relation = edges.relation(),
        to_add = delta.to_add.len(),
        to_remove = delta.to_remove.len(),
        from_remote = fetched_current,
        "Relationship plan"
    );

    let (added, tolerated_add, failed_add) = apply_batch(edges, Mutation::Add, &delta.to_add).await;
    let (removed, tolerated_remove, failed_remove) =
        apply_batch(edges, Mutation::Remove, &delta.to_remove).await;

    let mut next = desired.clone();
    for (id, _) in &failed_add {
        next.remove(id);
    }
    for (id, _) in &failed_remove {
        next.insert(id.clone());
    }

    let mut tolerated = tolerated_add;
    tolerated.extend(tolerated_remove);
    let mut failed = failed_add;
    failed.extend(failed_remove);

    Ok(RelationshipOutcome {
        managed: next,
        added,
        removed,
        tolerated,
        failed,
        fetched_current,
    })
}

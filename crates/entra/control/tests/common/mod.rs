//! Shared fakes for control-loop tests

#![allow(dead_code)]

use async_trait::async_trait;
use entra_control::{
    ApplicationApi, CredentialResolver, DirectoryClient, GroupApi, ServicePrincipalApi,
};
use entra_types::{
    Application, ApplicationCreate, ApplicationPatch, CreatedApplication, CreatedGroup,
    CredentialSource, DirectoryError, DirectoryResult, Group, GroupCreate, GroupPatch,
    GroupRelation, ServicePrincipalCreate,
};
use parking_lot::Mutex;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

#[derive(Default)]
pub struct DirectoryState {
    pub applications: HashMap<String, Application>,
    pub app_owners: HashMap<String, BTreeSet<String>>,
    pub service_principals: HashMap<String, ServicePrincipalCreate>,
    pub groups: HashMap<String, Group>,
    pub group_edges: HashMap<(String, GroupRelation), BTreeSet<String>>,
    /// Mutating calls in order, e.g. `app.create`, `group.members.add:u1,u2`
    pub calls: Vec<String>,
    /// Operation (optionally `op:id`) to the error it should return
    pub failures: HashMap<String, DirectoryError>,
    next_id: u64,
}

impl DirectoryState {
    fn id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{}-{}", prefix, self.next_id)
    }

    fn check(&self, op: &str, ids: &[String]) -> DirectoryResult<()> {
        if let Some(e) = self.failures.get(op) {
            return Err(e.clone());
        }
        for id in ids {
            if let Some(e) = self.failures.get(&format!("{}:{}", op, id)) {
                return Err(e.clone());
            }
        }
        Ok(())
    }
}

/// In-memory directory that records every mutating call
#[derive(Clone, Default)]
pub struct FakeDirectory {
    pub state: Arc<Mutex<DirectoryState>>,
}

impl FakeDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail(&self, op: &str, error: DirectoryError) {
        self.state.lock().failures.insert(op.to_string(), error);
    }

    pub fn heal(&self) {
        self.state.lock().failures.clear();
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state.lock().calls.clear();
    }

    /// Calls whose name starts with `prefix`
    pub fn count(&self, prefix: &str) -> usize {
        self.state
            .lock()
            .calls
            .iter()
            .filter(|c| c.starts_with(prefix))
            .count()
    }

    pub fn application(&self, object_id: &str) -> Option<Application> {
        self.state.lock().applications.get(object_id).cloned()
    }

    pub fn application_count(&self) -> usize {
        self.state.lock().applications.len()
    }

    pub fn owners_of_app(&self, object_id: &str) -> Vec<String> {
        self.state
            .lock()
            .app_owners
            .get(object_id)
            .map(|s| s.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Out-of-band owner change, as made by a human in the portal
    pub fn set_app_owners(&self, object_id: &str, owners: &[&str]) {
        self.state.lock().app_owners.insert(
            object_id.to_string(),
            owners.iter().map(|s| s.to_string()).collect(),
        );
    }

    pub fn service_principal_count(&self) -> usize {
        self.state.lock().service_principals.len()
    }

    pub fn service_principal(&self, id: &str) -> Option<ServicePrincipalCreate> {
        self.state.lock().service_principals.get(id).cloned()
    }

    pub fn group(&self, id: &str) -> Option<Group> {
        self.state.lock().groups.get(id).cloned()
    }

    pub fn group_edges(&self, id: &str, relation: GroupRelation) -> Vec<String> {
        self.state
            .lock()
            .group_edges
            .get(&(id.to_string(), relation))
            .map(|s| s.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn set_group_edges(&self, id: &str, relation: GroupRelation, ids: &[&str]) {
        self.state.lock().group_edges.insert(
            (id.to_string(), relation),
            ids.iter().map(|s| s.to_string()).collect(),
        );
    }

    /// Removes an application out of band
    pub fn drop_application(&self, object_id: &str) {
        let mut state = self.state.lock();
        state.applications.remove(object_id);
        state.app_owners.remove(object_id);
    }

    pub fn drop_group(&self, id: &str) {
        self.state.lock().groups.remove(id);
    }

    /// Edits an application out of band
    pub fn edit_application(&self, object_id: &str, edit: impl FnOnce(&mut Application)) {
        if let Some(app) = self.state.lock().applications.get_mut(object_id) {
            edit(app);
        }
    }
}

fn apply_text(target: &mut Option<String>, patch: &Option<Option<String>>) {
    if let Some(value) = patch {
        *target = value.clone();
    }
}

#[async_trait]
impl ApplicationApi for FakeDirectory {
    async fn get(&self, object_id: &str) -> DirectoryResult<Application> {
        let state = self.state.lock();
        state.check("app.get", &[])?;
        state
            .applications
            .get(object_id)
            .cloned()
            .ok_or_else(|| DirectoryError::NotFound(object_id.to_string()))
    }

    async fn create(&self, request: &ApplicationCreate) -> DirectoryResult<CreatedApplication> {
        let mut state = self.state.lock();
        state.calls.push("app.create".to_string());
        state.check("app.create", &[])?;
        let object_id = state.id("obj");
        let app_id = state.id("app");
        state.applications.insert(
            object_id.clone(),
            Application {
                object_id: object_id.clone(),
                app_id: app_id.clone(),
                fields: request.fields.clone(),
            },
        );
        Ok(CreatedApplication { app_id, object_id })
    }

    async fn patch(&self, object_id: &str, patch: &ApplicationPatch) -> DirectoryResult<()> {
        let mut state = self.state.lock();
        state.calls.push(format!("app.patch:{}", object_id));
        state.check("app.patch", &[])?;
        let app = state
            .applications
            .get_mut(object_id)
            .ok_or_else(|| DirectoryError::NotFound(object_id.to_string()))?;
        let fields = &mut app.fields;
        if let Some(name) = &patch.display_name {
            fields.display_name = name.clone();
        }
        apply_text(&mut fields.description, &patch.description);
        apply_text(&mut fields.notes, &patch.notes);
        if let Some(tags) = &patch.tags {
            fields.tags = tags.clone();
        }
        apply_text(&mut fields.sign_in_audience, &patch.sign_in_audience);
        apply_text(&mut fields.saml_metadata_url, &patch.saml_metadata_url);
        if let Some(v) = patch.is_fallback_public_client {
            fields.is_fallback_public_client = v;
        }
        if let Some(v) = patch.is_device_only_auth_supported {
            fields.is_device_only_auth_supported = v;
        }
        apply_text(&mut fields.group_membership_claims, &patch.group_membership_claims);
        if let Some(uris) = &patch.identifier_uris {
            fields.identifier_uris = uris.clone();
        }
        apply_text(
            &mut fields.service_management_reference,
            &patch.service_management_reference,
        );
        Ok(())
    }

    async fn delete(&self, object_id: &str) -> DirectoryResult<()> {
        let mut state = self.state.lock();
        state.calls.push(format!("app.delete:{}", object_id));
        state.check("app.delete", &[])?;
        state.app_owners.remove(object_id);
        state
            .applications
            .remove(object_id)
            .map(|_| ())
            .ok_or_else(|| DirectoryError::NotFound(object_id.to_string()))
    }

    async fn list_owners(&self, object_id: &str) -> DirectoryResult<Vec<String>> {
        let state = self.state.lock();
        state.check("app.owners.list", &[])?;
        Ok(state
            .app_owners
            .get(object_id)
            .map(|s| s.iter().cloned().collect())
            .unwrap_or_default())
    }

    async fn add_owners(&self, object_id: &str, owner_ids: &[String]) -> DirectoryResult<()> {
        let mut state = self.state.lock();
        state.calls.push(format!("app.owners.add:{}", owner_ids.join(",")));
        state.check("app.owners.add", owner_ids)?;
        let owners = state.app_owners.entry(object_id.to_string()).or_default();
        if owner_ids.iter().any(|id| owners.contains(id)) {
            return Err(DirectoryError::AlreadyExists(
                "One or more added object references already exist".into(),
            ));
        }
        owners.extend(owner_ids.iter().cloned());
        Ok(())
    }

    async fn remove_owners(&self, object_id: &str, owner_ids: &[String]) -> DirectoryResult<()> {
        let mut state = self.state.lock();
        state.calls.push(format!("app.owners.remove:{}", owner_ids.join(",")));
        state.check("app.owners.remove", owner_ids)?;
        let owners = state.app_owners.entry(object_id.to_string()).or_default();
        for id in owner_ids {
            if !owners.remove(id) {
                return Err(DirectoryError::NotFound(id.clone()));
            }
        }
        Ok(())
    }
}

#[async_trait]
impl ServicePrincipalApi for FakeDirectory {
    async fn create(&self, request: &ServicePrincipalCreate) -> DirectoryResult<String> {
        let mut state = self.state.lock();
        state.calls.push(format!("sp.create:{}", request.app_id));
        state.check("sp.create", &[])?;
        let id = state.id("sp");
        state.service_principals.insert(id.clone(), request.clone());
        Ok(id)
    }

    async fn delete(&self, id: &str) -> DirectoryResult<()> {
        let mut state = self.state.lock();
        state.calls.push(format!("sp.delete:{}", id));
        state.check("sp.delete", &[])?;
        state
            .service_principals
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| DirectoryError::NotFound(id.to_string()))
    }
}

#[async_trait]
impl GroupApi for FakeDirectory {
    async fn get(&self, id: &str) -> DirectoryResult<Group> {
        let state = self.state.lock();
        state.check("group.get", &[])?;
        state
            .groups
            .get(id)
            .cloned()
            .ok_or_else(|| DirectoryError::NotFound(id.to_string()))
    }

    async fn create(&self, request: &GroupCreate) -> DirectoryResult<CreatedGroup> {
        let mut state = self.state.lock();
        state.calls.push("group.create".to_string());
        state.check("group.create", &[])?;
        let id = state.id("grp");
        state.groups.insert(
            id.clone(),
            Group {
                id: id.clone(),
                fields: request.fields.clone(),
                group_types: request.group_types.clone(),
                mail_enabled: request.mail_enabled,
            },
        );
        Ok(CreatedGroup {
            id,
            display_name: request.fields.display_name.clone(),
        })
    }

    async fn patch(&self, id: &str, patch: &GroupPatch) -> DirectoryResult<()> {
        let mut state = self.state.lock();
        state.calls.push(format!("group.patch:{}", id));
        state.check("group.patch", &[])?;
        let group = state
            .groups
            .get_mut(id)
            .ok_or_else(|| DirectoryError::NotFound(id.to_string()))?;
        if let Some(name) = &patch.display_name {
            group.fields.display_name = name.clone();
        }
        apply_text(&mut group.fields.description, &patch.description);
        if let Some(nickname) = &patch.mail_nickname {
            group.fields.mail_nickname = nickname.clone();
        }
        if let Some(v) = patch.security_enabled {
            group.fields.security_enabled = v;
        }
        Ok(())
    }

    async fn delete(&self, id: &str) -> DirectoryResult<()> {
        let mut state = self.state.lock();
        state.calls.push(format!("group.delete:{}", id));
        state.check("group.delete", &[])?;
        state.group_edges.retain(|(group, _), _| group != id);
        state
            .groups
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| DirectoryError::NotFound(id.to_string()))
    }

    async fn list_relations(
        &self,
        id: &str,
        relation: GroupRelation,
    ) -> DirectoryResult<Vec<String>> {
        let state = self.state.lock();
        state.check(&format!("group.{}.list", relation), &[])?;
        Ok(state
            .group_edges
            .get(&(id.to_string(), relation))
            .map(|s| s.iter().cloned().collect())
            .unwrap_or_default())
    }

    async fn add_relations(
        &self,
        id: &str,
        relation: GroupRelation,
        object_ids: &[String],
    ) -> DirectoryResult<()> {
        let op = format!("group.{}.add", relation);
        let mut state = self.state.lock();
        state.calls.push(format!("{}:{}", op, object_ids.join(",")));
        state.check(&op, object_ids)?;
        let edges = state.group_edges.entry((id.to_string(), relation)).or_default();
        if object_ids.iter().any(|o| edges.contains(o)) {
            return Err(DirectoryError::AlreadyExists(
                "One or more added object references already exist".into(),
            ));
        }
        edges.extend(object_ids.iter().cloned());
        Ok(())
    }

    async fn remove_relations(
        &self,
        id: &str,
        relation: GroupRelation,
        object_ids: &[String],
    ) -> DirectoryResult<()> {
        let op = format!("group.{}.remove", relation);
        let mut state = self.state.lock();
        state.calls.push(format!("{}:{}", op, object_ids.join(",")));
        state.check(&op, object_ids)?;
        let edges = state.group_edges.entry((id.to_string(), relation)).or_default();
        for object_id in object_ids {
            if !edges.remove(object_id) {
                return Err(DirectoryError::NotFound(object_id.clone()));
            }
        }
        Ok(())
    }
}

impl DirectoryClient for FakeDirectory {
    fn applications(&self) -> Arc<dyn ApplicationApi> {
        Arc::new(self.clone())
    }

    fn service_principals(&self) -> Arc<dyn ServicePrincipalApi> {
        Arc::new(self.clone())
    }

    fn groups(&self) -> Arc<dyn GroupApi> {
        Arc::new(self.clone())
    }
}

/// Resolves every secret to the same fake directory
pub struct FakeResolver {
    pub directory: FakeDirectory,
    pub resolved: Mutex<Vec<CredentialSource>>,
}

impl FakeResolver {
    pub fn new(directory: FakeDirectory) -> Self {
        Self {
            directory,
            resolved: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl CredentialResolver for FakeResolver {
    async fn resolve(&self, source: &CredentialSource) -> DirectoryResult<Arc<dyn DirectoryClient>> {
        self.resolved.lock().push(source.clone());
        match source {
            CredentialSource::Secret { name, .. } if name == "missing" => Err(
                DirectoryError::Configuration(format!("secret {} not found", source)),
            ),
            CredentialSource::Secret { .. } => Ok(Arc::new(self.directory.clone())),
            CredentialSource::WorkloadIdentity { .. } => Err(DirectoryError::Unsupported(
                "workload identity is not implemented".into(),
            )),
        }
    }
}

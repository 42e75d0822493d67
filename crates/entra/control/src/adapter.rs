//! Remote resource adapter contracts
//!
//! One trait per directory entity kind. Implementations map their transport
//! errors into [`DirectoryError`](entra_types::DirectoryError) so the core
//! only branches on that taxonomy. Every call is expected to be safe to
//! retry.

use async_trait::async_trait;
use entra_types::{
    Application, ApplicationCreate, ApplicationPatch, CreatedApplication, CreatedGroup,
    DirectoryResult, Group, GroupCreate, GroupPatch, GroupRelation, ServicePrincipalCreate,
};
use std::sync::Arc;

/// Application registrations
#[async_trait]
pub trait ApplicationApi: Send + Sync {
    /// Fetch by directory object ID
    async fn get(&self, object_id: &str) -> DirectoryResult<Application>;

    async fn create(&self, request: &ApplicationCreate) -> DirectoryResult<CreatedApplication>;

    async fn patch(&self, object_id: &str, patch: &ApplicationPatch) -> DirectoryResult<()>;

    async fn delete(&self, object_id: &str) -> DirectoryResult<()>;

    async fn list_owners(&self, object_id: &str) -> DirectoryResult<Vec<String>>;

    /// Adds owners; an existing edge surfaces as `AlreadyExists`
    async fn add_owners(&self, object_id: &str, owner_ids: &[String]) -> DirectoryResult<()>;

    async fn remove_owners(&self, object_id: &str, owner_ids: &[String]) -> DirectoryResult<()>;
}

/// Service principals (the dependent entity of an application)
#[async_trait]
pub trait ServicePrincipalApi: Send + Sync {
    /// Creates the service principal for an app ID, returning its object ID
    async fn create(&self, request: &ServicePrincipalCreate) -> DirectoryResult<String>;

    async fn delete(&self, id: &str) -> DirectoryResult<()>;
}

/// Security groups
#[async_trait]
pub trait GroupApi: Send + Sync {
    async fn get(&self, id: &str) -> DirectoryResult<Group>;

    async fn create(&self, request: &GroupCreate) -> DirectoryResult<CreatedGroup>;

    async fn patch(&self, id: &str, patch: &GroupPatch) -> DirectoryResult<()>;

    async fn delete(&self, id: &str) -> DirectoryResult<()>;

    async fn list_relations(&self, id: &str, relation: GroupRelation)
        -> DirectoryResult<Vec<String>>;

    /// Adds edges; an existing edge surfaces as `AlreadyExists`
    async fn add_relations(
        &self,
        id: &str,
        relation: GroupRelation,
        object_ids: &[String],
    ) -> DirectoryResult<()>;

    async fn remove_relations(
        &self,
        id: &str,
        relation: GroupRelation,
        object_ids: &[String],
    ) -> DirectoryResult<()>;
}

/// An authenticated directory client, as handed out by a
/// [`CredentialResolver`](crate::credentials::CredentialResolver)
pub trait DirectoryClient: Send + Sync {
    fn applications(&self) -> Arc<dyn ApplicationApi>;
    fn service_principals(&self) -> Arc<dyn ServicePrincipalApi>;
    fn groups(&self) -> Arc<dyn GroupApi>;
}

//! Credential resolution contract

use crate::adapter::DirectoryClient;
use crate::error::{ControlError, ControlResult};
use async_trait::async_trait;
use entra_types::{CredentialRef, CredentialSource, DirectoryResult};
use std::sync::Arc;

/// Maps a credential location to an authenticated directory client.
///
/// Unknown secrets and unusable secret contents surface as
/// `DirectoryError::Configuration`; unimplemented mechanisms as
/// `DirectoryError::Unsupported`.
#[async_trait]
pub trait CredentialResolver: Send + Sync {
    async fn resolve(&self, source: &CredentialSource) -> DirectoryResult<Arc<dyn DirectoryClient>>;
}

/// Resolves the `forProvider` block of a record into a client.
pub async fn client_for(
    resolver: &dyn CredentialResolver,
    for_provider: Option<&CredentialRef>,
    namespace: &str,
) -> ControlResult<Arc<dyn DirectoryClient>> {
    let reference =
        for_provider.ok_or_else(|| ControlError::Config("forProvider is not set".to_string()))?;
    let source = reference.source(namespace).ok_or_else(|| {
        ControlError::Config("forProvider has no credentialSecretRef or serviceAccountRef".to_string())
    })?;

    Ok(resolver.resolve(&source).await?)
}

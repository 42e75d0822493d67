//! Credential resolution backed by Graph client credentials
//!
//! A credential secret is a string map with the keys `tenantId`, `clientId`
//! and `clientSecret`. Resolved clients are cached per credential location
//! and rebuilt when the secret contents change.

use crate::auth::{ClientCredentials, TokenCache};
use crate::client::GraphClient;
use crate::cloud::GraphSettings;
use async_trait::async_trait;
use dashmap::DashMap;
use entra_control::{CredentialResolver, DirectoryClient};
use entra_types::{CredentialSource, DirectoryError, DirectoryResult};
use secrecy::{ExposeSecret, SecretString};
use std::collections::HashMap;
use std::sync::Arc;

pub const TENANT_ID_KEY: &str = "tenantId";
pub const CLIENT_ID_KEY: &str = "clientId";
pub const CLIENT_SECRET_KEY: &str = "clientSecret";

/// Contents of a named secret
pub type SecretData = HashMap<String, SecretString>;

/// Where credential secrets are read from
#[async_trait]
pub trait SecretSource: Send + Sync {
    /// Returns `None` when no secret with that name exists in the namespace.
    async fn get(&self, namespace: &str, name: &str) -> Option<SecretData>;
}

/// Secrets held in memory, keyed by `(namespace, name)`
#[derive(Default)]
pub struct StaticSecretSource {
    secrets: DashMap<(String, String), SecretData>,
}

impl StaticSecretSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, namespace: impl Into<String>, name: impl Into<String>, data: SecretData) {
        self.secrets.insert((namespace.into(), name.into()), data);
    }

    pub fn remove(&self, namespace: &str, name: &str) {
        self.secrets.remove(&(namespace.to_string(), name.to_string()));
    }

    pub fn len(&self) -> usize {
        self.secrets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.secrets.is_empty()
    }
}

#[async_trait]
impl SecretSource for StaticSecretSource {
    async fn get(&self, namespace: &str, name: &str) -> Option<SecretData> {
        self.secrets
            .get(&(namespace.to_string(), name.to_string()))
            .map(|entry| entry.value().clone())
    }
}

struct CachedClient {
    credentials: ClientCredentials,
    client: GraphClient,
}

impl CachedClient {
    fn matches(&self, credentials: &ClientCredentials) -> bool {
        self.credentials.tenant_id == credentials.tenant_id
            && self.credentials.client_id == credentials.client_id
            && self.credentials.client_secret.expose_secret()
                == credentials.client_secret.expose_secret()
    }
}

/// Resolves credential locations into authenticated [`GraphClient`]s
pub struct GraphCredentialResolver {
    secrets: Arc<dyn SecretSource>,
    settings: GraphSettings,
    http: reqwest::Client,
    clients: DashMap<CredentialSource, CachedClient>,
}

impl GraphCredentialResolver {
    pub fn new(secrets: Arc<dyn SecretSource>, settings: GraphSettings) -> DirectoryResult<Self> {
        let http = GraphClient::http_client(&settings)?;
        Ok(Self {
            secrets,
            settings,
            http,
            clients: DashMap::new(),
        })
    }

    async fn credentials(&self, namespace: &str, name: &str) -> DirectoryResult<ClientCredentials> {
        let data = self.secrets.get(namespace, name).await.ok_or_else(|| {
            DirectoryError::Configuration(format!("secret {}/{} not found", namespace, name))
        })?;

        let field = |key: &str| -> DirectoryResult<&SecretString> {
            data.get(key)
                .filter(|v| !v.expose_secret().trim().is_empty())
                .ok_or_else(|| {
                    DirectoryError::Configuration(format!(
                        "secret {}/{} has no {}",
                        namespace, name, key
                    ))
                })
        };

        Ok(ClientCredentials {
            tenant_id: field(TENANT_ID_KEY)?.expose_secret().trim().to_string(),
            client_id: field(CLIENT_ID_KEY)?.expose_secret().trim().to_string(),
            client_secret: field(CLIENT_SECRET_KEY)?.clone(),
        })
    }
}

#[async_trait]
impl CredentialResolver for GraphCredentialResolver {
    async fn resolve(&self, source: &CredentialSource) -> DirectoryResult<Arc<dyn DirectoryClient>> {
        let (namespace, name) = match source {
            CredentialSource::Secret { namespace, name } => (namespace, name),
            CredentialSource::WorkloadIdentity { .. } => {
                return Err(DirectoryError::Unsupported(
                    "workload identity is not implemented".to_string(),
                ))
            }
        };

        let credentials = self.credentials(namespace, name).await?;

        if let Some(cached) = self.clients.get(source) {
            if cached.matches(&credentials) {
                return Ok(Arc::new(cached.client.clone()));
            }
        }

        tracing::debug!(credential = %source, tenant_id = %credentials.tenant_id, "Building Graph client");
        let tokens = TokenCache::new(credentials.clone(), &self.settings, self.http.clone());
        let client = GraphClient::new(tokens, &self.settings, self.http.clone());
        self.clients.insert(
            source.clone(),
            CachedClient {
                credentials,
                client: client.clone(),
            },
        );
        Ok(Arc::new(client))
    }
}

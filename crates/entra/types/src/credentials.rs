//! Credential references carried in a resource spec

use serde::{Deserialize, Serialize};

/// `forProvider` block of a spec: which credential to act with
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialRef {
    /// Name of a secret in the resource's namespace holding
    /// `tenantId`, `clientId` and `clientSecret`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credential_secret_ref: Option<String>,

    /// Name of a service account for workload identity federation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_account_ref: Option<String>,
}

impl CredentialRef {
    pub fn secret(name: impl Into<String>) -> Self {
        Self {
            credential_secret_ref: Some(name.into()),
            service_account_ref: None,
        }
    }

    /// Resolves the reference against a namespace.
    ///
    /// A secret reference wins over a service account reference. Returns
    /// `None` when neither is set to a non-empty value.
    pub fn source(&self, namespace: &str) -> Option<CredentialSource> {
        let non_empty = |v: &Option<String>| v.as_deref().filter(|s| !s.trim().is_empty()).map(str::to_string);

        if let Some(name) = non_empty(&self.credential_secret_ref) {
            return Some(CredentialSource::Secret {
                namespace: namespace.to_string(),
                name,
            });
        }
        non_empty(&self.service_account_ref).map(|service_account| {
            CredentialSource::WorkloadIdentity {
                namespace: namespace.to_string(),
                service_account,
            }
        })
    }
}

/// A fully-qualified credential location handed to the resolver
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CredentialSource {
    Secret { namespace: String, name: String },
    WorkloadIdentity { namespace: String, service_account: String },
}

impl std::fmt::Display for CredentialSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CredentialSource::Secret { namespace, name } => {
                write!(f, "secret:{}/{}", namespace, name)
            }
            CredentialSource::WorkloadIdentity {
                namespace,
                service_account,
            } => write!(f, "serviceaccount:{}/{}", namespace, service_account),
        }
    }
}

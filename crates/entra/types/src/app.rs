//! EntraAppRegistration: an application registration plus its optional
//! service principal

use crate::credentials::CredentialRef;
use crate::meta::{ManagedObject, ObjectMeta};
use crate::relationship::RelationshipSet;
use crate::status::{Condition, LifecycleState, Phase};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Declared application registration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntraAppRegistration {
    pub metadata: ObjectMeta,
    pub spec: AppRegistrationSpec,
    #[serde(default)]
    pub status: AppRegistrationStatus,
}

impl EntraAppRegistration {
    pub fn new(metadata: ObjectMeta, spec: AppRegistrationSpec) -> Self {
        Self {
            metadata,
            spec,
            status: AppRegistrationStatus::default(),
        }
    }

    pub fn lifecycle(&self, finalizer: &str) -> LifecycleState {
        LifecycleState::derive(
            self.metadata.is_deleting(),
            self.metadata.has_finalizer(finalizer),
            &self.status.external_id,
            self.status.phase,
        )
    }
}

impl ManagedObject for EntraAppRegistration {
    const KIND: &'static str = "EntraAppRegistration";

    type Spec = AppRegistrationSpec;
    type Status = AppRegistrationStatus;

    fn from_parts(metadata: ObjectMeta, spec: Self::Spec, status: Self::Status) -> Self {
        Self {
            metadata,
            spec,
            status,
        }
    }

    fn metadata(&self) -> &ObjectMeta {
        &self.metadata
    }

    fn metadata_mut(&mut self) -> &mut ObjectMeta {
        &mut self.metadata
    }

    fn spec(&self) -> &Self::Spec {
        &self.spec
    }

    fn spec_mut(&mut self) -> &mut Self::Spec {
        &mut self.spec
    }

    fn status(&self) -> &Self::Status {
        &self.status
    }

    fn status_mut(&mut self) -> &mut Self::Status {
        &mut self.status
    }
}

/// Desired state of an application registration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppRegistrationSpec {
    /// Credential used for every remote call on behalf of this resource
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub for_provider: Option<CredentialRef>,

    /// Display name of the application
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,

    /// Defaults to `AzureADMyOrg`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sign_in_audience: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saml_metadata_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_fallback_public_client: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_device_only_auth_supported: Option<bool>,

    /// `None`, `SecurityGroup`, `DirectoryRole`, `ApplicationGroup` or `All`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_membership_claims: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub identifier_uris: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_management_reference: Option<String>,

    /// Applied on create only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub info: Option<InformationalUrls>,

    /// Applied on create only
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required_resource_access: Vec<RequiredResourceAccess>,

    /// Owner object IDs; `None` leaves owners unmanaged
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owners: Option<Vec<String>>,

    /// Dependent service principal
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_principal: Option<ServicePrincipalSpec>,
}

impl AppRegistrationSpec {
    /// True when the dependent service principal should exist
    pub fn service_principal_enabled(&self) -> bool {
        self.service_principal
            .as_ref()
            .map(|sp| sp.enabled)
            .unwrap_or(false)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InformationalUrls {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub marketing_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub privacy_statement_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub support_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub terms_of_service_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequiredResourceAccess {
    pub resource_app_id: String,
    #[serde(default)]
    pub resource_access: Vec<ResourceAccess>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceAccess {
    pub id: String,
    /// `Scope` (delegated) or `Role` (application); matched case-insensitively
    #[serde(rename = "type")]
    pub access_type: String,
}

/// Service principal toggle and creation settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServicePrincipalSpec {
    #[serde(default)]
    pub enabled: bool,

    /// Defaults to true
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_enabled: Option<bool>,

    /// Hides the enterprise app from guest users (`HideApp` tag)
    #[serde(default)]
    pub disable_visibility_for_guests: bool,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

/// Observed state of an application registration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppRegistrationStatus {
    #[serde(default)]
    pub observed_generation: i64,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<Phase>,

    /// Application (client) ID; empty until a create is confirmed
    #[serde(default)]
    pub external_id: String,

    /// Directory object ID, used for patch and owner operations
    #[serde(default)]
    pub external_object_id: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub display_name: String,

    /// Owners this controller last applied remotely
    #[serde(default, skip_serializing_if = "RelationshipSet::is_empty")]
    pub managed_owners: RelationshipSet,

    /// Service principal object ID; empty when disabled
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub dependent_id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_run: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spec_deserializes_camel_case() {
        let spec: AppRegistrationSpec = serde_json::from_value(serde_json::json!({
            "name": "svc-a",
            "forProvider": { "credentialSecretRef": "graph-creds" },
            "signInAudience": "AzureADMultipleOrgs",
            "tags": ["b", "a"],
            "owners": [],
            "servicePrincipal": { "enabled": true, "disableVisibilityForGuests": true }
        }))
        .unwrap();

        assert_eq!(spec.name, "svc-a");
        assert_eq!(spec.owners, Some(vec![]));
        assert!(spec.service_principal_enabled());
        assert_eq!(
            spec.for_provider.unwrap().credential_secret_ref.as_deref(),
            Some("graph-creds")
        );
    }

    #[test]
    fn test_lifecycle_of_fresh_record() {
        let app = EntraAppRegistration::new(
            ObjectMeta::new("team-a", "svc-a"),
            AppRegistrationSpec {
                name: "svc-a".into(),
                ..Default::default()
            },
        );
        assert_eq!(app.lifecycle("f"), LifecycleState::Absent);
        assert!(!app.spec.service_principal_enabled());
    }
}

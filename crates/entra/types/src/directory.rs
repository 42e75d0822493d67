//! Plain data-transfer structs exchanged with a directory adapter
//!
//! Every optional attribute is an explicit `Option`. Text fields are
//! normalised so that an absent value and an empty string compare equal,
//! and set-valued fields are kept sorted so comparisons never depend on
//! the order the directory happened to return them in.

use crate::app::{InformationalUrls, RequiredResourceAccess};
use serde::{Deserialize, Serialize};

const GRAPH_HOST_PREFIXES: &[&str] = &[
    "https://graph.microsoft.com/",
    "https://graph.microsoft.us/",
    "https://dod-graph.microsoft.us/",
    "https://microsoftgraph.chinacloudapi.cn/",
];

/// Maps empty strings to `None`.
pub fn normalize_text(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

/// Sorts and de-duplicates a set-valued field, dropping empty entries.
pub fn normalize_set(values: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut out: Vec<String> = values.into_iter().filter(|v| !v.is_empty()).collect();
    out.sort();
    out.dedup();
    out
}

/// Extracts the object ID from a member reference.
///
/// Accepts a bare object ID or a full directory URL such as
/// `https://graph.microsoft.com/v1.0/directoryObjects/{id}`.
pub fn member_reference_id(reference: &str) -> String {
    let trimmed = reference.trim();
    if GRAPH_HOST_PREFIXES.iter().any(|p| trimmed.starts_with(p)) {
        return trimmed
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .unwrap_or(trimmed)
            .to_string();
    }
    trimmed.to_string()
}

/// Patchable attributes of an application, as compared by drift detection
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationFields {
    pub display_name: String,
    pub description: Option<String>,
    pub notes: Option<String>,
    /// Sorted
    pub tags: Vec<String>,
    pub sign_in_audience: Option<String>,
    pub saml_metadata_url: Option<String>,
    pub is_fallback_public_client: bool,
    pub is_device_only_auth_supported: bool,
    pub group_membership_claims: Option<String>,
    /// Sorted
    pub identifier_uris: Vec<String>,
    pub service_management_reference: Option<String>,
}

impl ApplicationFields {
    /// Applies the text and set normalisation rules in place.
    pub fn normalized(mut self) -> Self {
        self.description = normalize_text(self.description);
        self.notes = normalize_text(self.notes);
        self.tags = normalize_set(self.tags);
        self.sign_in_audience = normalize_text(self.sign_in_audience);
        self.saml_metadata_url = normalize_text(self.saml_metadata_url);
        self.group_membership_claims = normalize_text(self.group_membership_claims);
        self.identifier_uris = normalize_set(self.identifier_uris);
        self.service_management_reference = normalize_text(self.service_management_reference);
        self
    }
}

/// Application as observed in the directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Application {
    pub object_id: String,
    pub app_id: String,
    pub fields: ApplicationFields,
}

/// Request to create an application
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplicationCreate {
    pub fields: ApplicationFields,
    pub info: Option<InformationalUrls>,
    pub required_resource_access: Vec<RequiredResourceAccess>,
}

/// Identifiers returned by a successful application create
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedApplication {
    pub app_id: String,
    pub object_id: String,
}

/// Minimal application patch.
///
/// `None` leaves a field untouched. For nullable text fields `Some(None)`
/// clears the value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sign_in_audience: Option<Option<String>>,
    #[serde(rename = "samlMetadataUrl", skip_serializing_if = "Option::is_none")]
    pub saml_metadata_url: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_fallback_public_client: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_device_only_auth_supported: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_membership_claims: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identifier_uris: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_management_reference: Option<Option<String>>,
}

impl ApplicationPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Request to create (or upsert) the service principal of an application
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServicePrincipalCreate {
    pub app_id: String,
    pub display_name: String,
    pub account_enabled: bool,
    /// Sorted
    pub tags: Vec<String>,
}

/// Patchable attributes of a group, as compared by drift detection
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupFields {
    pub display_name: String,
    pub description: Option<String>,
    pub mail_nickname: String,
    pub security_enabled: bool,
}

impl GroupFields {
    pub fn normalized(mut self) -> Self {
        self.description = normalize_text(self.description);
        self
    }
}

/// Group as observed in the directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    pub id: String,
    pub fields: GroupFields,
    pub group_types: Vec<String>,
    pub mail_enabled: bool,
}

/// Request to create a group
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupCreate {
    pub fields: GroupFields,
    pub group_types: Vec<String>,
    pub mail_enabled: bool,
}

/// Identifiers returned by a successful group create
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedGroup {
    pub id: String,
    pub display_name: String,
}

/// Minimal group patch; `None` leaves a field untouched
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mail_nickname: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub security_enabled: Option<bool>,
}

impl GroupPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Relationship edge kinds on a group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GroupRelation {
    Owners,
    Members,
}

impl GroupRelation {
    /// Navigation property name in the directory API
    pub fn as_str(&self) -> &'static str {
        match self {
            GroupRelation::Owners => "owners",
            GroupRelation::Members => "members",
        }
    }
}

impl std::fmt::Display for GroupRelation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

//! EntraSecurityGroup: a directory security group with owners and members

use crate::credentials::CredentialRef;
use crate::meta::{ManagedObject, ObjectMeta};
use crate::relationship::RelationshipSet;
use crate::status::{Condition, LifecycleState, Phase};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Declared security group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntraSecurityGroup {
    pub metadata: ObjectMeta,
    pub spec: SecurityGroupSpec,
    #[serde(default)]
    pub status: SecurityGroupStatus,
}

impl EntraSecurityGroup {
    pub fn new(metadata: ObjectMeta, spec: SecurityGroupSpec) -> Self {
        Self {
            metadata,
            spec,
            status: SecurityGroupStatus::default(),
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

impl ManagedObject for EntraSecurityGroup {
    const KIND: &'static str = "EntraSecurityGroup";

    type Spec = SecurityGroupSpec;
    type Status = SecurityGroupStatus;

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

fn default_security_enabled() -> bool {
    true
}

/// Desired state of a security group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityGroupSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub for_provider: Option<CredentialRef>,

    /// Display name of the group
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// e.g. `Unified`, `DynamicMembership`; applied on create only
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub group_types: Vec<String>,

    /// Derived from the name when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mail_nickname: Option<String>,

    #[serde(default)]
    pub mail_enabled: bool,

    #[serde(default = "default_security_enabled")]
    pub security_enabled: bool,

    /// Owner object IDs; `None` leaves owners unmanaged
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owners: Option<Vec<String>>,

    /// Member object IDs or directory object URLs; `None` leaves members unmanaged
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub members: Option<Vec<String>>,
}

impl Default for SecurityGroupSpec {
    fn default() -> Self {
        Self {
            for_provider: None,
            name: String::new(),
            description: None,
            group_types: Vec::new(),
            mail_nickname: None,
            mail_enabled: false,
            security_enabled: true,
            owners: None,
            members: None,
        }
    }
}

/// Observed state of a security group
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityGroupStatus {
    #[serde(default)]
    pub observed_generation: i64,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<Phase>,

    /// Group object ID; empty until a create is confirmed
    #[serde(default)]
    pub external_id: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub display_name: String,

    #[serde(default, skip_serializing_if = "RelationshipSet::is_empty")]
    pub managed_owners: RelationshipSet,

    #[serde(default, skip_serializing_if = "RelationshipSet::is_empty")]
    pub managed_members: RelationshipSet,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_run: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,
}

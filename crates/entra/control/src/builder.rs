//! Desired-state builder
//!
//! Pure mappings from a declared spec to the adapter's request shapes. All
//! normalisation happens here so that drift detection sees the same desired
//! value on every pass.

use crate::error::{ControlError, ControlResult};
use entra_types::directory::{member_reference_id, normalize_set, normalize_text};
use entra_types::{
    AppRegistrationSpec, ApplicationCreate, ApplicationFields, GroupCreate, GroupFields,
    RelationshipSet, RequiredResourceAccess, ResourceAccess, SecurityGroupSpec,
    ServicePrincipalCreate,
};

/// Sign-in audience applied when the resource spec leaves it unset
pub const DEFAULT_SIGN_IN_AUDIENCE: &str = "AzureADMyOrg";

/// Service principal tag that hides the enterprise app from guests
pub const HIDE_APP_TAG: &str = "HideApp";

fn require_name(name: &str) -> ControlResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ControlError::Config("spec.name must not be empty".to_string()));
    }
    Ok(name.to_string())
}

/// Patchable application attributes wanted by the resource spec
pub fn application_fields(spec: &AppRegistrationSpec) -> ControlResult<ApplicationFields> {
    Ok(ApplicationFields {
        display_name: require_name(&spec.name)?,
        description: spec.description.clone(),
        notes: spec.notes.clone(),
        tags: spec.tags.clone(),
        sign_in_audience: normalize_text(spec.sign_in_audience.clone())
            .or_else(|| Some(DEFAULT_SIGN_IN_AUDIENCE.to_string())),
        saml_metadata_url: spec.saml_metadata_url.clone(),
        is_fallback_public_client: spec.is_fallback_public_client.unwrap_or(false),
        is_device_only_auth_supported: spec.is_device_only_auth_supported.unwrap_or(false),
        group_membership_claims: spec.group_membership_claims.clone(),
        identifier_uris: spec.identifier_uris.clone(),
        service_management_reference: spec.service_management_reference.clone(),
    }
    .normalized())
}

/// Create request for the application, including create-only attributes
pub fn application_create(spec: &AppRegistrationSpec) -> ControlResult<ApplicationCreate> {
    let required_resource_access = spec
        .required_resource_access
        .iter()
        .map(normalize_resource_access)
        .collect::<ControlResult<Vec<_>>>()?;

    Ok(ApplicationCreate {
        fields: application_fields(spec)?,
        info: spec.info.clone(),
        required_resource_access,
    })
}

fn normalize_resource_access(entry: &RequiredResourceAccess) -> ControlResult<RequiredResourceAccess> {
    let resource_access = entry
        .resource_access
        .iter()
        .map(|access| {
            let access_type = match access.access_type.to_ascii_lowercase().as_str() {
                "scope" | "delegated" => "Scope",
                "role" | "application" => "Role",
                other => {
                    return Err(ControlError::Config(format!(
                        "unknown permission type '{}' for resource {}",
                        other, entry.resource_app_id
                    )))
                }
            };
            Ok(ResourceAccess {
                id: access.id.clone(),
                access_type: access_type.to_string(),
            })
        })
        .collect::<ControlResult<Vec<_>>>()?;

    Ok(RequiredResourceAccess {
        resource_app_id: entry.resource_app_id.clone(),
        resource_access,
    })
}

/// Create request for the dependent service principal
pub fn service_principal_create(spec: &AppRegistrationSpec, app_id: &str) -> ServicePrincipalCreate {
    let settings = spec.service_principal.clone().unwrap_or_default();
    let mut tags = settings.tags;
    if settings.disable_visibility_for_guests {
        tags.push(HIDE_APP_TAG.to_string());
    }

    ServicePrincipalCreate {
        app_id: app_id.to_string(),
        display_name: spec.name.trim().to_string(),
        account_enabled: settings.account_enabled.unwrap_or(true),
        tags: normalize_set(tags),
    }
}

/// Owner set wanted by the resource spec; `None` when owners are unmanaged
pub fn desired_owners(owners: Option<&Vec<String>>) -> Option<RelationshipSet> {
    owners.map(|ids| ids.iter().map(|id| id.trim()).collect())
}

/// Member set wanted by the resource spec, with directory URLs reduced to object IDs
pub fn desired_members(members: Option<&Vec<String>>) -> Option<RelationshipSet> {
    members.map(|refs| refs.iter().map(|r| member_reference_id(r)).collect())
}

/// Mail nickname used when the resource spec gives none: the display name
/// reduced to ASCII alphanumerics, `-`, `_` and `.`, capped at 64 characters.
/// Falls back to `group` when nothing is left.
pub fn derive_mail_nickname(display_name: &str) -> String {
    let nickname: String = display_name
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        .take(64)
        .collect();
    if nickname.is_empty() {
        "group".to_string()
    } else {
        nickname
    }
}

/// Patchable group attributes wanted by the resource spec
pub fn group_fields(spec: &SecurityGroupSpec) -> ControlResult<GroupFields> {
    let display_name = require_name(&spec.name)?;
    let mail_nickname = normalize_text(spec.mail_nickname.clone())
        .unwrap_or_else(|| derive_mail_nickname(&display_name));

    Ok(GroupFields {
        display_name,
        description: spec.description.clone(),
        mail_nickname,
        security_enabled: spec.security_enabled,
    }
    .normalized())
}

/// Create request for the group
pub fn group_create(spec: &SecurityGroupSpec) -> ControlResult<GroupCreate> {
    Ok(GroupCreate {
        fields: group_fields(spec)?,
        group_types: normalize_set(spec.group_types.clone()),
        mail_enabled: spec.mail_enabled,
    })
}

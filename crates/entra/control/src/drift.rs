//! Drift detector and patch planner
//!
//! Compares an observed entity with the desired one field by field and
//! produces a patch that carries only the mismatching fields. Scalars use
//! plain equality; set-valued fields are compared order-independently and,
//! on mismatch, the whole desired set is sent since the directory replaces
//! such fields wholesale.

use entra_types::directory::normalize_set;
use entra_types::{ApplicationFields, ApplicationPatch, GroupFields, GroupPatch};

/// Planned patch and whether any field differs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchPlan<P> {
    pub patch: P,
    pub changed: bool,
}

/// Order-independent comparison of two string sets
pub fn same_set(observed: &[String], desired: &[String]) -> bool {
    normalize_set(observed.iter().cloned()) == normalize_set(desired.iter().cloned())
}

fn scalar<T: PartialEq + Clone>(observed: &T, desired: &T, changed: &mut bool) -> Option<T> {
    if observed == desired {
        return None;
    }
    *changed = true;
    Some(desired.clone())
}

fn set(observed: &[String], desired: &[String], changed: &mut bool) -> Option<Vec<String>> {
    if same_set(observed, desired) {
        return None;
    }
    *changed = true;
    Some(desired.to_vec())
}

/// Plans the application patch.
///
/// Both sides are normalised first so an absent value and an empty string
/// never register as drift.
pub fn plan_application(
    observed: &ApplicationFields,
    desired: &ApplicationFields,
) -> PatchPlan<ApplicationPatch> {
    let observed = observed.clone().normalized();
    let desired = desired.clone().normalized();
    let mut changed = false;

    let patch = ApplicationPatch {
        display_name: scalar(&observed.display_name, &desired.display_name, &mut changed),
        description: scalar(&observed.description, &desired.description, &mut changed),
        notes: scalar(&observed.notes, &desired.notes, &mut changed),
        tags: set(&observed.tags, &desired.tags, &mut changed),
        sign_in_audience: scalar(
            &observed.sign_in_audience,
            &desired.sign_in_audience,
            &mut changed,
        ),
        saml_metadata_url: scalar(
            &observed.saml_metadata_url,
            &desired.saml_metadata_url,
            &mut changed,
        ),
        is_fallback_public_client: scalar(
            &observed.is_fallback_public_client,
            &desired.is_fallback_public_client,
            &mut changed,
        ),
        is_device_only_auth_supported: scalar(
            &observed.is_device_only_auth_supported,
            &desired.is_device_only_auth_supported,
            &mut changed,
        ),
        group_membership_claims: scalar(
            &observed.group_membership_claims,
            &desired.group_membership_claims,
            &mut changed,
        ),
        identifier_uris: set(&observed.identifier_uris, &desired.identifier_uris, &mut changed),
        service_management_reference: scalar(
            &observed.service_management_reference,
            &desired.service_management_reference,
            &mut changed,
        ),
    };

    PatchPlan { patch, changed }
}

/// Plans the group patch.
pub fn plan_group(observed: &GroupFields, desired: &GroupFields) -> PatchPlan<GroupPatch> {
    let observed = observed.clone().normalized();
    let desired = desired.clone().normalized();
    let mut changed = false;

    let patch = GroupPatch {
        display_name: scalar(&observed.display_name, &desired.display_name, &mut changed),
        description: scalar(&observed.description, &desired.description, &mut changed),
        mail_nickname: scalar(&observed.mail_nickname, &desired.mail_nickname, &mut changed),
        security_enabled: scalar(
            &observed.security_enabled,
            &desired.security_enabled,
            &mut changed,
        ),
    };

    PatchPlan { patch, changed }
}

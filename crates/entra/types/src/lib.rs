//! Entra Types - declared resources and directory shapes
//!
//! Shared vocabulary for the Entra governance controller. Nothing in this
//! crate performs I/O.
//!
//! ## Key Concepts
//!
//! - **Managed resource**: a user-declared record (`EntraAppRegistration`,
//!   `EntraSecurityGroup`) holding a desired `spec` and an observed `status`
//! - **Object metadata**: generation, finalizers and the deletion marker that
//!   gate removal of a record until remote cleanup is confirmed
//! - **Relationship set**: unordered owner/member identifiers
//! - **Directory types**: plain value structs exchanged with the remote
//!   directory adapter, with explicit present/absent semantics

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]

pub mod app;
pub mod credentials;
pub mod directory;
pub mod error;
pub mod group;
pub mod meta;
pub mod relationship;
pub mod status;

pub use app::{
    AppRegistrationSpec, AppRegistrationStatus, EntraAppRegistration, InformationalUrls,
    RequiredResourceAccess, ResourceAccess, ServicePrincipalSpec,
};
pub use credentials::{CredentialRef, CredentialSource};
pub use directory::{
    Application, ApplicationCreate, ApplicationFields, ApplicationPatch, CreatedApplication,
    CreatedGroup, Group, GroupCreate, GroupFields, GroupPatch, GroupRelation,
    ServicePrincipalCreate,
};
pub use error::{DirectoryError, DirectoryResult};
pub use group::{EntraSecurityGroup, SecurityGroupSpec, SecurityGroupStatus};
pub use meta::{ManagedObject, ObjectMeta, ResourceKey};
pub use relationship::RelationshipSet;
pub use status::{Condition, ConditionStatus, LifecycleState, Phase, READY_CONDITION};

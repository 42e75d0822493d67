//! Entra Control - reconciliation core
//!
//! Drives declared `EntraAppRegistration` and `EntraSecurityGroup` records
//! toward convergence with the remote directory:
//!
//! - **Desired-state builder** (`builder`): spec to adapter request shapes
//! - **Drift detector** (`drift`): observed vs desired, minimal patch
//! - **Relationship reconciler** (`relationship`): owner/member set deltas
//! - **Dependent orchestrator** (`dependent`): the service principal toggle
//! - **Control loops** (`controller`): finalizers, create, sync, delete
//! - **Runner** (`runner`): keyed work queue, bounded concurrency, deadlines
//!
//! The remote directory, credential resolution and record storage are
//! reached only through the traits in `adapter`, `credentials` and `store`.

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]

pub mod adapter;
pub mod builder;
pub mod config;
pub mod controller;
pub mod credentials;
pub mod dependent;
pub mod drift;
pub mod error;
pub mod finalizer;
pub mod relationship;
pub mod runner;
pub mod store;
pub mod trigger;

pub use adapter::{ApplicationApi, DirectoryClient, GroupApi, ServicePrincipalApi};
pub use config::ControllerConfig;
pub use controller::{
    Action, AppRegistrationController, Reconciler, SecurityGroupController,
};
pub use credentials::CredentialResolver;
pub use error::{ControlError, ControlResult};
pub use runner::ControllerRunner;
pub use store::{InMemoryStore, RecordStore, StoreError, StoreResult};
pub use trigger::{ReconcileTrigger, WorkQueue};

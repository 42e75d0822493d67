//! Entra Graph - Microsoft Graph adapter
//!
//! Implements the directory adapter traits of `entra-control` against the
//! Microsoft Graph REST API, plus the credential resolver that turns a
//! credential secret into an authenticated client.
//!
//! ## Layout
//!
//! - `auth`: OAuth2 client-credentials token cache
//! - `client`: authenticated HTTP plumbing, paging, error mapping
//! - `applications`, `service_principals`, `groups`: one adapter per entity
//! - `resolver`: secret lookup and per-credential client cache

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]

mod applications;
pub mod auth;
pub mod client;
pub mod cloud;
pub mod error;
mod groups;
pub mod resolver;
mod service_principals;

pub use auth::{ClientCredentials, TokenCache};
pub use client::GraphClient;
pub use cloud::{GraphCloud, GraphSettings};
pub use error::{GraphError, GraphResult};
pub use resolver::{GraphCredentialResolver, SecretData, SecretSource, StaticSecretSource};

//! Entra Daemon library
//!
//! Components of the `entrad` service:
//! - REST API for declaring, reading and deleting managed resources
//! - Configuration loading
//! - Server lifecycle: controller runners, graceful shutdown

pub mod api;
pub mod config;
pub mod error;
pub mod server;

pub use config::DaemonConfig;
pub use error::{ApiError, DaemonError};
pub use server::Server;

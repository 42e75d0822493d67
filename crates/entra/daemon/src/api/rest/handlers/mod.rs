//! REST API handlers

pub mod health;
pub mod resources;

pub use health::{daemon_status, health_check};

//! API layer

pub mod rest;

pub use rest::router::create_router;
pub use rest::state::{AppState, KindHandle};

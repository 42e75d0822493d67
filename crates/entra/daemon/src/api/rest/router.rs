//! API Router configuration

use super::handlers::{self, resources};
use super::state::{AppState, StateKind};
use axum::{routing::get, Router};
use entra_types::{EntraAppRegistration, EntraSecurityGroup};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// `/{collection}` and `/{collection}/:namespace/:name` for one kind
fn kind_routes<R: StateKind>() -> Router<AppState> {
    Router::new()
        .route(&format!("/{}", R::COLLECTION), get(resources::list::<R>))
        .route(
            &format!("/{}/:namespace/:name", R::COLLECTION),
            get(resources::get::<R>)
                .put(resources::apply::<R>)
                .delete(resources::delete::<R>),
        )
}

/// Create the main API router
pub fn create_router(state: AppState, enable_cors: bool) -> Router {
    let api_routes = Router::new()
        // Health and status
        .route("/health", get(handlers::health_check))
        .route("/status", get(handlers::daemon_status))
        // Managed resources
        .merge(kind_routes::<EntraAppRegistration>())
        .merge(kind_routes::<EntraSecurityGroup>());

    let router = Router::new()
        .nest("/api/v1", api_routes)
        .layer(TraceLayer::new_for_http());

    let router = if enable_cors {
        router.layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
    } else {
        router
    };

    router.with_state(state)
}

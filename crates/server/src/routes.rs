//! Route configuration.

use crate::handlers;
use crate::metrics::metrics_handler;
use crate::state::{AppState, Role};
use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::get;
use tower_http::trace::TraceLayer;

/// Create the application router for the role in `state`.
pub fn create_router(state: AppState) -> Router {
    let role_routes = match &state.role {
        Role::Metadata { .. } => Router::new().route(
            "/v1/files/{filename}",
            get(handlers::read_file)
                .put(handlers::modify_file)
                .delete(handlers::delete_file)
                .layer(DefaultBodyLimit::max(
                    state.config.server.max_file_request_bytes,
                )),
        ),
        Role::Block { .. } => Router::new().route(
            "/v1/blocks/{hash}",
            get(handlers::get_block)
                .head(handlers::has_block)
                .put(handlers::put_block),
        ),
    };

    let mut router = Router::new()
        .route("/v1/health", get(handlers::health_check))
        .merge(role_routes);

    // The endpoint is unauthenticated; restrict it at the network level.
    if state.config.server.metrics_enabled {
        let metrics_routes = Router::new().route("/metrics", get(metrics_handler));
        router = router.merge(metrics_routes);
    }

    router.layer(TraceLayer::new_for_http()).with_state(state)
}

//! Health endpoint.

use crate::error::ApiResult;
use crate::state::{AppState, Role};
use axum::Json;
use axum::extract::State;
use shardfs_core::protocol::HealthResponse;

/// GET /v1/health
///
/// A block store checks its backend. The metadata store only reports that it
/// is serving; shard reachability is checked once at startup.
pub async fn health_check(State(state): State<AppState>) -> ApiResult<Json<HealthResponse>> {
    if let Role::Block { store, .. } = &state.role {
        store.health_check().await?;
    }

    Ok(Json(HealthResponse {
        status: "ok".to_string(),
        role: state.role.name().to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    }))
}

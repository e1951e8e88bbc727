//! HTTP servers for shardfs.
//!
//! One binary serves either role of a deployment:
//! - Metadata store: versioned `read` / `modify` / `delete` over `/v1/files`
//! - Block store: content-addressed `has` / `get` / `put` over `/v1/blocks`
//!
//! Both roles expose `/v1/health` and, when enabled, Prometheus `/metrics`.

pub mod error;
pub mod handlers;
pub mod metrics;
pub mod routes;
pub mod state;

pub use error::ApiError;
pub use routes::create_router;
pub use state::{AppState, Role};

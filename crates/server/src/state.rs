//! Application state shared across handlers.

use crate::error::{ApiError, ApiResult};
use shardfs_core::config::AppConfig;
use shardfs_metadata::MetadataStore;
use shardfs_storage::BlockStore;
use std::sync::Arc;

/// The part of a deployment this process serves.
#[derive(Clone)]
pub enum Role {
    /// The single metadata store.
    Metadata { store: Arc<MetadataStore> },
    /// Block-store shard number `index`.
    Block {
        index: usize,
        store: Arc<dyn BlockStore>,
    },
}

impl Role {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Metadata { .. } => "metadata",
            Self::Block { .. } => "block",
        }
    }
}

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Arc<AppConfig>,
    /// Role served by this process.
    pub role: Role,
}

impl AppState {
    /// State for the metadata role.
    pub fn metadata(config: AppConfig, store: Arc<MetadataStore>) -> Self {
        Self::new(config, Role::Metadata { store })
    }

    /// State for block-store shard `index`.
    pub fn block(config: AppConfig, index: usize, store: Arc<dyn BlockStore>) -> Self {
        Self::new(config, Role::Block { index, store })
    }

    fn new(config: AppConfig, role: Role) -> Self {
        if !config.server.metrics_enabled {
            tracing::info!("Prometheus /metrics endpoint disabled");
        }
        Self {
            config: Arc::new(config),
            role,
        }
    }

    /// The metadata store, if this process serves the metadata role.
    pub fn metadata_store(&self) -> ApiResult<&Arc<MetadataStore>> {
        match &self.role {
            Role::Metadata { store } => Ok(store),
            Role::Block { .. } => Err(ApiError::Internal(
                "metadata route reached on a block store".to_string(),
            )),
        }
    }

    /// The local block store, if this process serves a block-store shard.
    pub fn block_store(&self) -> ApiResult<&Arc<dyn BlockStore>> {
        match &self.role {
            Role::Block { store, .. } => Ok(store),
            Role::Metadata { .. } => Err(ApiError::Internal(
                "block route reached on the metadata store".to_string(),
            )),
        }
    }
}

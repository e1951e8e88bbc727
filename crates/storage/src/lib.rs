//! Block storage abstraction and backends for shardfs.
//!
//! This crate provides:
//! - The content-addressed `BlockStore` capability (`has`, `get`, `put`)
//! - Backends: local filesystem, in-memory, and remote HTTP shards
//! - `ShardSet`, which routes each block to its owning shard

pub mod backends;
pub mod error;
pub mod shards;
pub mod traits;

pub use backends::{filesystem::FilesystemBackend, http::HttpBackend, memory::MemoryBackend};
pub use error::{StorageError, StorageResult};
pub use shards::ShardSet;
pub use traits::BlockStore;

use shardfs_core::config::StorageConfig;
use std::sync::Arc;

/// Create a block store from configuration.
pub async fn from_config(config: &StorageConfig) -> StorageResult<Arc<dyn BlockStore>> {
    match config {
        StorageConfig::Filesystem { path } => {
            let backend = FilesystemBackend::new(path).await?;
            Ok(Arc::new(backend))
        }
        StorageConfig::Memory => Ok(Arc::new(MemoryBackend::new())),
    }
}

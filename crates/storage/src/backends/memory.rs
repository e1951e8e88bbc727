//! In-memory storage backend.

use crate::error::{StorageError, StorageResult};
use crate::traits::BlockStore;
use async_trait::async_trait;
use bytes::Bytes;
use shardfs_core::BlockHash;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Volatile block store backed by a hash map.
#[derive(Default)]
pub struct MemoryBackend {
    blocks: RwLock<HashMap<BlockHash, Bytes>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored blocks.
    pub async fn len(&self) -> usize {
        self.blocks.read().await.len()
    }
}

#[async_trait]
impl BlockStore for MemoryBackend {
    async fn has(&self, hash: &BlockHash) -> StorageResult<bool> {
        Ok(self.blocks.read().await.contains_key(hash))
    }

    async fn get(&self, hash: &BlockHash) -> StorageResult<Bytes> {
        self.blocks
            .read()
            .await
            .get(hash)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(hash.to_hex()))
    }

    async fn put(&self, hash: &BlockHash, data: Bytes) -> StorageResult<()> {
        self.blocks.write().await.entry(*hash).or_insert(data);
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

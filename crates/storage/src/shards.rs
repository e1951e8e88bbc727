//! Routing of block operations onto the owning shard.

use crate::backends::http::HttpBackend;
use crate::error::{StorageError, StorageResult};
use crate::traits::BlockStore;
use bytes::Bytes;
use shardfs_core::config::Deployment;
use shardfs_core::{BlockHash, ShardRouter};
use std::sync::Arc;
use std::time::Duration;

/// The full set of block-store shards, indexed by shard number.
#[derive(Clone)]
pub struct ShardSet {
    router: ShardRouter,
    stores: Vec<Arc<dyn BlockStore>>,
}

impl ShardSet {
    /// Build a shard set. The number of stores must equal the router's shard count.
    pub fn new(router: ShardRouter, stores: Vec<Arc<dyn BlockStore>>) -> StorageResult<Self> {
        if stores.len() != router.shard_count() {
            return Err(StorageError::Config(format!(
                "shard count is {} but {} block stores were supplied",
                router.shard_count(),
                stores.len()
            )));
        }
        Ok(Self { router, stores })
    }

    /// Remote shards listed in a deployment file.
    pub fn from_deployment(deployment: &Deployment, timeout: Duration) -> StorageResult<Self> {
        let router = deployment.router()?;
        let stores = deployment
            .block_stores
            .iter()
            .map(|ep| HttpBackend::new(&ep.base_url(), timeout).map(|b| Arc::new(b) as Arc<dyn BlockStore>))
            .collect::<StorageResult<Vec<_>>>()?;
        Self::new(router, stores)
    }

    pub fn router(&self) -> &ShardRouter {
        &self.router
    }

    /// Shard index owning `hash`.
    pub fn shard_of(&self, hash: &BlockHash) -> usize {
        self.router.shard_of(hash)
    }

    /// Store owning `hash`.
    pub fn store_for(&self, hash: &BlockHash) -> &Arc<dyn BlockStore> {
        &self.stores[self.shard_of(hash)]
    }

    /// Store at shard `index`, if it exists.
    pub fn store(&self, index: usize) -> Option<&Arc<dyn BlockStore>> {
        self.stores.get(index)
    }

    pub async fn has(&self, hash: &BlockHash) -> StorageResult<bool> {
        self.store_for(hash).has(hash).await
    }

    pub async fn get(&self, hash: &BlockHash) -> StorageResult<Bytes> {
        self.store_for(hash).get(hash).await
    }

    pub async fn put(&self, hash: &BlockHash, data: Bytes) -> StorageResult<()> {
        self.store_for(hash).put(hash, data).await
    }

    /// Check every shard is reachable.
    pub async fn health_check(&self) -> StorageResult<()> {
        for store in &self.stores {
            store.health_check().await?;
        }
        Ok(())
    }
}

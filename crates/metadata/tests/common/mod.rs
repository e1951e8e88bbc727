//! Shared fixtures for metadata integration tests.

use bytes::Bytes;
use shardfs_core::{ShardRouter, SplitFile};
use shardfs_metadata::MetadataStore;
use shardfs_storage::{BlockStore, MemoryBackend, ShardSet};
use std::sync::Arc;

/// A metadata store over `n` in-memory shards, with the shards exposed.
pub struct TestCluster {
    pub store: Arc<MetadataStore>,
    pub backends: Vec<Arc<MemoryBackend>>,
}

impl TestCluster {
    pub fn new(n: usize) -> Self {
        let backends: Vec<_> = (0..n).map(|_| Arc::new(MemoryBackend::new())).collect();
        let stores = backends
            .iter()
            .map(|b| b.clone() as Arc<dyn BlockStore>)
            .collect();
        let shards = ShardSet::new(ShardRouter::new(n).unwrap(), stores).unwrap();
        Self {
            store: Arc::new(MetadataStore::new(shards)),
            backends,
        }
    }

    pub fn router(&self) -> ShardRouter {
        *self.store.shards().router()
    }

    /// Push every block of `split` to its owning shard.
    #[allow(dead_code)]
    pub async fn push_all(&self, split: &SplitFile) {
        for (hash, data) in &split.blocks {
            self.store.shards().put(hash, data.clone()).await.unwrap();
        }
    }
}

/// Deterministic pseudo-random bytes (simple LCG).
#[allow(dead_code)]
pub fn seeded_bytes(seed: u64, len: usize) -> Bytes {
    let mut data = vec![0u8; len];
    let mut state = seed;
    for chunk in data.chunks_mut(8) {
        state = state.wrapping_mul(6364136223846793005).wrapping_add(1);
        let bytes = state.to_le_bytes();
        for (i, byte) in chunk.iter_mut().enumerate() {
            *byte = bytes[i % 8];
        }
    }
    Bytes::from(data)
}

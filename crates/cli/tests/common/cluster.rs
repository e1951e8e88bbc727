//! In-process deployment for client tests.

use async_trait::async_trait;
use bytes::Bytes;
use shardfs_cli::Client;
use shardfs_core::config::RetryConfig;
use shardfs_core::{BlockHash, FileRecord, Hashlist, ShardRouter};
use shardfs_metadata::{MetadataError, MetadataResult, MetadataService, MetadataStore};
use shardfs_storage::{BlockStore, MemoryBackend, ShardSet, StorageResult};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Mutex;

/// Block store wrapper counting `get` calls.
#[derive(Default)]
pub struct CountingStore {
    inner: MemoryBackend,
    pub gets: AtomicUsize,
}

#[async_trait]
impl BlockStore for CountingStore {
    async fn has(&self, hash: &BlockHash) -> StorageResult<bool> {
        self.inner.has(hash).await
    }

    async fn get(&self, hash: &BlockHash) -> StorageResult<Bytes> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        self.inner.get(hash).await
    }

    async fn put(&self, hash: &BlockHash, data: Bytes) -> StorageResult<()> {
        self.inner.put(hash, data).await
    }

    fn backend_name(&self) -> &'static str {
        "counting"
    }
}

/// Metadata service wrapper recording every modify outcome.
pub struct RecordingMetadata {
    pub inner: Arc<MetadataStore>,
    /// `(proposed version, number of missing blocks or None on other outcomes)`.
    pub modifies: Mutex<Vec<(u64, Option<usize>)>>,
}

#[async_trait]
impl MetadataService for RecordingMetadata {
    async fn read_file(&self, filename: &str) -> MetadataResult<FileRecord> {
        self.inner.read_file(filename).await
    }

    async fn modify_file(
        &self,
        filename: &str,
        version: u64,
        hashlist: Hashlist,
    ) -> MetadataResult<()> {
        let result = self.inner.modify_file(filename, version, hashlist).await;
        let missing = match &result {
            Ok(()) => Some(0),
            Err(MetadataError::MissingBlocks { hashes }) => Some(hashes.len()),
            Err(_) => None,
        };
        self.modifies.lock().await.push((version, missing));
        result
    }

    async fn delete_file(&self, filename: &str, version: u64) -> MetadataResult<()> {
        self.inner.delete_file(filename, version).await
    }
}

/// Shards, store and a client over them.
#[allow(dead_code)]
pub struct TestCluster {
    pub shards: ShardSet,
    pub stores: Vec<Arc<CountingStore>>,
    pub store: Arc<MetadataStore>,
    pub metadata: Arc<RecordingMetadata>,
    pub client: Client,
}

#[allow(dead_code)]
impl TestCluster {
    pub fn new(n: usize) -> Self {
        let stores: Vec<_> = (0..n).map(|_| Arc::new(CountingStore::default())).collect();
        let shards = ShardSet::new(
            ShardRouter::new(n).unwrap(),
            stores
                .iter()
                .map(|s| s.clone() as Arc<dyn BlockStore>)
                .collect(),
        )
        .unwrap();
        let store = Arc::new(MetadataStore::new(shards.clone()));
        let metadata = Arc::new(RecordingMetadata {
            inner: store.clone(),
            modifies: Mutex::new(Vec::new()),
        });
        let client = Client::new(metadata.clone(), shards.clone(), fast_retry(64));
        Self {
            shards,
            stores,
            store,
            metadata,
            client,
        }
    }

    /// A second client sharing this cluster's stores.
    pub fn client_with(&self, metadata: Arc<dyn MetadataService>, retry: RetryConfig) -> Client {
        Client::new(metadata, self.shards.clone(), retry)
    }

    pub fn total_gets(&self) -> usize {
        self.stores.iter().map(|s| s.gets.load(Ordering::SeqCst)).sum()
    }
}

/// Retry policy with millisecond backoff.
pub fn fast_retry(max_attempts: u32) -> RetryConfig {
    RetryConfig {
        max_attempts,
        initial_backoff_ms: 1,
        max_backoff_ms: 5,
    }
}

/// Deterministic pseudo-random bytes (simple LCG).
pub fn seeded_bytes(seed: u64, len: usize) -> Vec<u8> {
    let mut data = vec![0u8; len];
    let mut state = seed;
    for chunk in data.chunks_mut(8) {
        state = state.wrapping_mul(6364136223846793005).wrapping_add(1);
        let bytes = state.to_le_bytes();
        for (i, byte) in chunk.iter_mut().enumerate() {
            *byte = bytes[i % 8];
        }
    }
    data
}

/// Write `data` to `dir/name` and return the path.
pub fn write_file(dir: &Path, name: &str, data: &[u8]) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, data).unwrap();
    path
}

//! Storage trait definitions.

use crate::error::StorageResult;
use async_trait::async_trait;
use bytes::Bytes;
use shardfs_core::BlockHash;

/// Content-addressed block store: one shard of the block space.
///
/// Implementations must be idempotent under content addressing: storing the
/// same hash twice with the same bytes never corrupts state.
#[async_trait]
pub trait BlockStore: Send + Sync + 'static {
    /// Check if a block exists.
    async fn has(&self, hash: &BlockHash) -> StorageResult<bool>;

    /// Get a block's content. Fails with `NotFound` if absent.
    async fn get(&self, hash: &BlockHash) -> StorageResult<Bytes>;

    /// Store a block. Storing an already-present block is a no-op.
    async fn put(&self, hash: &BlockHash, data: Bytes) -> StorageResult<()>;

    /// Get the name of this storage backend.
    ///
    /// Returns a static string identifier for the backend type (e.g., "filesystem", "http").
    /// Used for metrics and logging.
    fn backend_name(&self) -> &'static str;

    /// Verify storage backend connectivity.
    ///
    /// The default implementation returns Ok(()), suitable for backends that
    /// don't require connectivity verification (e.g., memory).
    async fn health_check(&self) -> StorageResult<()> {
        Ok(())
    }
}

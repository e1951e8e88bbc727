//! The metadata capability shared by the in-process store and remote clients.

use crate::error::MetadataResult;
use async_trait::async_trait;
use shardfs_core::{FileRecord, Hashlist};

/// Filename to (version, hashlist) table with version-gated mutation.
#[async_trait]
pub trait MetadataService: Send + Sync {
    /// Current record for `filename`; `(0, None)` if it was never created.
    async fn read_file(&self, filename: &str) -> MetadataResult<FileRecord>;

    /// Propose `hashlist` as version `version` of `filename`.
    ///
    /// Fails with `WrongVersion` unless `version` is the current version plus
    /// one, and with `MissingBlocks` when any referenced block is absent from
    /// its owning shard.
    async fn modify_file(
        &self,
        filename: &str,
        version: u64,
        hashlist: Hashlist,
    ) -> MetadataResult<()>;

    /// Tombstone `filename` at `version`.
    async fn delete_file(&self, filename: &str, version: u64) -> MetadataResult<()>;
}

//! In-memory metadata store.
//!
//! Every operation, including reads, runs under one exclusive async mutex.
//! A modify holds the lock across its block-presence checks, so two proposals
//! for the same version are fully serialized: the second one always observes
//! the first one's commit.

use crate::error::{MetadataError, MetadataResult};
use crate::service::MetadataService;
use async_trait::async_trait;
use futures::{StreamExt, TryStreamExt, stream};
use shardfs_core::config::Deployment;
use shardfs_core::file::validate_filename;
use shardfs_core::{BlockHash, FileRecord, Hashlist};
use shardfs_storage::ShardSet;
use std::collections::{HashMap, HashSet};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::instrument;

/// Block-presence lookups in flight per modify.
pub const BLOCK_CHECK_CONCURRENCY: usize = 32;

#[derive(Debug)]
struct StoredRecord {
    record: FileRecord,
    /// Committed while some of its blocks were absent.
    speculative: bool,
}

/// Authoritative filename table.
pub struct MetadataStore {
    files: Mutex<HashMap<String, StoredRecord>>,
    shards: ShardSet,
}

impl MetadataStore {
    /// Create an empty store that checks block presence against `shards`.
    pub fn new(shards: ShardSet) -> Self {
        Self {
            files: Mutex::new(HashMap::new()),
            shards,
        }
    }

    /// Create a store whose shards are the remote block stores of `deployment`.
    pub fn from_deployment(deployment: &Deployment, timeout: Duration) -> MetadataResult<Self> {
        let shards = ShardSet::from_deployment(deployment, timeout)?;
        Ok(Self::new(shards))
    }

    pub fn shards(&self) -> &ShardSet {
        &self.shards
    }

    /// Number of filenames ever created, tombstones included.
    pub async fn file_count(&self) -> usize {
        self.files.lock().await.len()
    }

    /// Check every block-store shard is reachable.
    pub async fn health_check(&self) -> MetadataResult<()> {
        self.shards.health_check().await?;
        Ok(())
    }

    /// Hashes in `hashlist` absent from their owning shard, deduplicated in
    /// first-occurrence order. At most `BLOCK_CHECK_CONCURRENCY` lookups are
    /// in flight.
    async fn missing_blocks(&self, hashlist: &[BlockHash]) -> MetadataResult<Vec<BlockHash>> {
        let mut seen = HashSet::with_capacity(hashlist.len());
        let unique: Vec<BlockHash> = hashlist
            .iter()
            .filter(|hash| seen.insert(**hash))
            .copied()
            .collect();

        let present: Vec<(BlockHash, bool)> = stream::iter(unique)
            .map(|hash| async move { self.shards.has(&hash).await.map(|p| (hash, p)) })
            .buffered(BLOCK_CHECK_CONCURRENCY)
            .try_collect()
            .await?;

        Ok(present
            .into_iter()
            .filter_map(|(hash, present)| (!present).then_some(hash))
            .collect())
    }
}

#[async_trait]
impl MetadataService for MetadataStore {
    #[instrument(skip(self))]
    async fn read_file(&self, filename: &str) -> MetadataResult<FileRecord> {
        let files = self.files.lock().await;
        Ok(files
            .get(filename)
            .map(|stored| stored.record.clone())
            .unwrap_or_default())
    }

    #[instrument(skip(self, hashlist), fields(blocks = hashlist.len()))]
    async fn modify_file(
        &self,
        filename: &str,
        version: u64,
        hashlist: Hashlist,
    ) -> MetadataResult<()> {
        validate_filename(filename)?;
        let mut files = self.files.lock().await;

        let stored = files.get(filename);
        let current = stored.map_or(0, |s| s.record.version);
        let resubmission = stored.is_some_and(|s| {
            s.speculative
                && s.record.version == version
                && s.record.hashlist.as_ref() == Some(&hashlist)
        });
        if !resubmission && current.checked_add(1) != Some(version) {
            tracing::debug!(current, "rejecting stale proposal");
            return Err(MetadataError::WrongVersion { current });
        }

        let missing = self.missing_blocks(&hashlist).await?;
        let speculative = !missing.is_empty();
        files.insert(
            filename.to_string(),
            StoredRecord {
                record: FileRecord::live(version, hashlist),
                speculative,
            },
        );

        if speculative {
            tracing::debug!(missing = missing.len(), "committed speculatively");
            return Err(MetadataError::MissingBlocks { hashes: missing });
        }
        tracing::debug!("committed");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete_file(&self, filename: &str, version: u64) -> MetadataResult<()> {
        validate_filename(filename)?;
        let mut files = self.files.lock().await;

        let current = match files.get(filename) {
            Some(stored) if stored.record.version > 0 => stored.record.version,
            _ => return Err(MetadataError::FileNotFound(filename.to_string())),
        };
        if current.checked_add(1) != Some(version) {
            return Err(MetadataError::WrongVersion { current });
        }

        files.insert(
            filename.to_string(),
            StoredRecord {
                record: FileRecord::tombstone(version),
                speculative: false,
            },
        );
        tracing::debug!("tombstoned");
        Ok(())
    }
}

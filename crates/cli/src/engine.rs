//! Client reconciliation engine.
//!
//! Upload drives the metadata store to convergence: it proposes the next
//! version, pushes whatever blocks the store reports missing and resubmits the
//! same version, and on a version conflict resynchronizes and proposes again.
//! A timed-out mutation has an unknown outcome, so the engine re-reads the
//! current record before deciding what to do next.

use crate::api_client::RemoteMetadata;
use crate::error::{ClientError, ClientResult};
use bytes::Bytes;
use futures::{StreamExt, TryStreamExt, stream};
use shardfs_core::config::{Deployment, RetryConfig};
use shardfs_core::file::validate_filename;
use shardfs_core::{Block, BlockHash, FileRecord, SplitFile, split};
use shardfs_metadata::{MetadataError, MetadataService};
use shardfs_storage::ShardSet;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::instrument;
use uuid::Uuid;

/// Block transfers in flight per operation.
const TRANSFER_CONCURRENCY: usize = 16;

/// Terminal result of a client operation that did not abort.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    Ok,
    NotFound,
}

/// A client bound to one deployment.
pub struct Client {
    metadata: Arc<dyn MetadataService>,
    shards: ShardSet,
    retry: RetryConfig,
}

impl Client {
    pub fn new(metadata: Arc<dyn MetadataService>, shards: ShardSet, retry: RetryConfig) -> Self {
        Self {
            metadata,
            shards,
            retry,
        }
    }

    /// Client for the remote servers listed in `deployment`.
    pub fn from_deployment(
        deployment: &Deployment,
        timeout: Duration,
        retry: RetryConfig,
    ) -> ClientResult<Self> {
        let metadata = RemoteMetadata::new(&deployment.metadata.base_url(), timeout)?;
        let shards = ShardSet::from_deployment(deployment, timeout)?;
        Ok(Self::new(Arc::new(metadata), shards, retry))
    }

    /// Upload the file at `path` under its final path component.
    #[instrument(skip(self, path), fields(path = %path.display()))]
    pub async fn upload(&self, path: &Path) -> ClientResult<Outcome> {
        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| ClientError::InvalidPath(path.display().to_string()))?;

        match fs::metadata(path).await {
            Ok(meta) if meta.is_file() => {}
            Ok(_) => {
                return Err(ClientError::InvalidPath(format!(
                    "{} is not a file",
                    path.display()
                )));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Outcome::NotFound),
            Err(e) => return Err(e.into()),
        }

        let current = self.metadata.read_file(filename).await?;
        let file = split(path, self.shards.router()).await?;
        self.commit(filename, &file, current.version).await?;
        Ok(Outcome::Ok)
    }

    /// Propose `file` as the next version of `filename` until it is accepted.
    ///
    /// Version conflicts and unknown outcomes each use up one of
    /// `max_attempts`. Pushing reported missing blocks and resubmitting does
    /// not, but at most `max_attempts` pushes are made for one version.
    async fn commit(&self, filename: &str, file: &SplitFile, last_known: u64) -> ClientResult<()> {
        let mut proposed = next_version(filename, last_known)?;
        let mut conflicts = 0;
        let mut attempts = 0;
        let mut pushes = 0;

        loop {
            let result = self
                .metadata
                .modify_file(filename, proposed, file.hashlist.clone())
                .await;

            match result {
                Ok(()) => {
                    tracing::info!(filename, version = proposed, attempts, "upload committed");
                    return Ok(());
                }
                Err(MetadataError::MissingBlocks { hashes }) => {
                    pushes += 1;
                    if pushes > self.retry.max_attempts {
                        break;
                    }
                    tracing::debug!(
                        filename,
                        version = proposed,
                        missing = hashes.len(),
                        "pushing missing blocks"
                    );
                    self.push_blocks(file, &hashes).await?;
                }
                Err(MetadataError::WrongVersion { current }) => {
                    attempts += 1;
                    if attempts >= self.retry.max_attempts {
                        break;
                    }
                    conflicts += 1;
                    proposed = next_version(filename, current)?;
                    pushes = 0;
                    tracing::debug!(filename, current, conflicts, "version conflict");
                    tokio::time::sleep(self.retry.backoff(conflicts)).await;
                }
                Err(e) if e.is_transient() => {
                    tracing::warn!(
                        filename,
                        version = proposed,
                        error = %e,
                        "outcome unknown, re-reading version"
                    );
                    let record = self.metadata.read_file(filename).await?;
                    if record.version == proposed && record.hashlist.as_ref() == Some(&file.hashlist) {
                        // Our proposal landed; make sure it is not waiting on blocks.
                        let missing = self.missing_blocks(&file.hashlist).await?;
                        if missing.is_empty() {
                            tracing::info!(filename, version = proposed, "upload committed");
                            return Ok(());
                        }
                        self.push_blocks(file, &missing).await?;
                    } else {
                        proposed = next_version(filename, record.version)?;
                        pushes = 0;
                    }
                    attempts += 1;
                    if attempts >= self.retry.max_attempts {
                        break;
                    }
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(ClientError::RetriesExhausted {
            attempts: self.retry.max_attempts,
        })
    }

    /// Put the blocks named by `hashes` onto their owning shards.
    async fn push_blocks(&self, file: &SplitFile, hashes: &[BlockHash]) -> ClientResult<()> {
        let blocks = hashes
            .iter()
            .map(|hash| {
                file.block(hash)
                    .cloned()
                    .map(|data| (*hash, data))
                    .ok_or(ClientError::UnknownBlock(*hash))
            })
            .collect::<ClientResult<Vec<_>>>()?;

        stream::iter(blocks)
            .map(|(hash, data)| async move { self.shards.put(&hash, data).await })
            .buffer_unordered(TRANSFER_CONCURRENCY)
            .try_collect::<Vec<_>>()
            .await?;
        Ok(())
    }

    async fn missing_blocks(&self, hashlist: &[BlockHash]) -> ClientResult<Vec<BlockHash>> {
        let mut seen = HashSet::new();
        let unique: Vec<BlockHash> = hashlist
            .iter()
            .filter(|h| seen.insert(**h))
            .copied()
            .collect();
        let present: Vec<(BlockHash, bool)> = stream::iter(unique)
            .map(|hash| async move { self.shards.has(&hash).await.map(|p| (hash, p)) })
            .buffered(TRANSFER_CONCURRENCY)
            .try_collect()
            .await?;
        Ok(present
            .into_iter()
            .filter_map(|(hash, present)| (!present).then_some(hash))
            .collect())
    }

    /// Tombstone `filename`. A version conflict is retried once after re-reading.
    #[instrument(skip(self))]
    pub async fn delete(&self, filename: &str) -> ClientResult<Outcome> {
        let record = self.metadata.read_file(filename).await?;
        match self.delete_at(filename, &record).await {
            Err(ClientError::Metadata(MetadataError::WrongVersion { current })) => {
                tracing::debug!(filename, current, "version conflict, retrying delete");
                let record = self.metadata.read_file(filename).await?;
                self.delete_at(filename, &record).await
            }
            other => other,
        }
    }

    async fn delete_at(&self, filename: &str, record: &FileRecord) -> ClientResult<Outcome> {
        if !record.exists() {
            return Ok(Outcome::NotFound);
        }
        let version = next_version(filename, record.version)?;
        match self.metadata.delete_file(filename, version).await {
            Ok(()) => {
                tracing::info!(filename, version, "file deleted");
                Ok(Outcome::Ok)
            }
            Err(MetadataError::FileNotFound(_)) => Ok(Outcome::NotFound),
            Err(e) => Err(e.into()),
        }
    }

    /// Current record of `filename`, or `None` when absent or deleted.
    pub async fn read(&self, filename: &str) -> ClientResult<Option<FileRecord>> {
        let record = self.metadata.read_file(filename).await?;
        Ok(record.exists().then_some(record))
    }

    /// Reconstruct `filename` as `dest_dir/filename`.
    ///
    /// Blocks already present in an existing destination file are reused; the
    /// rest are fetched once each from their owning shard and verified. The
    /// result replaces the destination atomically.
    #[instrument(skip(self, dest_dir), fields(dest = %dest_dir.display()))]
    pub async fn download(&self, filename: &str, dest_dir: &Path) -> ClientResult<Outcome> {
        validate_filename(filename)?;
        let record = self.metadata.read_file(filename).await?;
        let Some(hashlist) = record.hashlist else {
            return Ok(Outcome::NotFound);
        };

        fs::create_dir_all(dest_dir).await?;
        let dest = dest_dir.join(filename);

        let mut blocks: HashMap<BlockHash, Bytes> = match fs::metadata(&dest).await {
            Ok(meta) if meta.is_file() => split(&dest, self.shards.router()).await?.blocks,
            _ => HashMap::new(),
        };
        let reused = blocks.len();

        let mut seen = HashSet::new();
        let needed: Vec<BlockHash> = hashlist
            .iter()
            .filter(|h| !blocks.contains_key(*h) && seen.insert(**h))
            .copied()
            .collect();
        let fetched: Vec<(BlockHash, Bytes)> = stream::iter(needed)
            .map(|hash| async move { self.fetch_block(hash).await })
            .buffer_unordered(TRANSFER_CONCURRENCY)
            .try_collect()
            .await?;
        tracing::debug!(filename, fetched = fetched.len(), reused, "blocks gathered");
        blocks.extend(fetched);

        let temp_path = dest_dir.join(format!(".{}.tmp.{}", filename, Uuid::new_v4()));
        if let Err(e) = write_blocks(&temp_path, &hashlist, &blocks).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e);
        }
        if let Err(e) = fs::rename(&temp_path, &dest).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e.into());
        }

        tracing::info!(filename, version = record.version, "file downloaded");
        Ok(Outcome::Ok)
    }

    async fn fetch_block(&self, hash: BlockHash) -> ClientResult<(BlockHash, Bytes)> {
        let block = Block::new(self.shards.get(&hash).await?);
        match block.verify(&hash) {
            Ok(()) => Ok((hash, block.data)),
            Err(shardfs_core::Error::HashMismatch { expected, actual }) => {
                Err(ClientError::CorruptBlock {
                    hash: expected,
                    actual,
                })
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// The version after `current`; the version space is finite.
fn next_version(filename: &str, current: u64) -> ClientResult<u64> {
    current
        .checked_add(1)
        .ok_or_else(|| ClientError::VersionsExhausted(filename.to_string()))
}

async fn write_blocks(
    path: &Path,
    hashlist: &[BlockHash],
    blocks: &HashMap<BlockHash, Bytes>,
) -> ClientResult<()> {
    let mut file = fs::File::create(path).await?;
    for hash in hashlist {
        let data = blocks.get(hash).ok_or(ClientError::UnknownBlock(*hash))?;
        file.write_all(data).await?;
    }
    file.sync_all().await?;
    Ok(())
}

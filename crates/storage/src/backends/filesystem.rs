//! Local filesystem storage backend.

use crate::error::{StorageError, StorageResult};
use crate::traits::BlockStore;
use async_trait::async_trait;
use bytes::Bytes;
use shardfs_core::BlockHash;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::instrument;
use uuid::Uuid;

/// Local filesystem block store.
///
/// Blocks live at `<root>/blocks/<aa>/<bb>/<hash>`. Keys are derived from
/// parsed hashes, so no caller-controlled path ever reaches the filesystem.
pub struct FilesystemBackend {
    root: PathBuf,
}

impl FilesystemBackend {
    /// Create a new filesystem backend.
    pub async fn new(root: impl AsRef<Path>) -> StorageResult<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root).await?;
        Ok(Self { root })
    }

    fn block_path(&self, hash: &BlockHash) -> PathBuf {
        self.root.join(hash.to_object_key())
    }

    /// Ensure parent directory exists.
    async fn ensure_parent(&self, path: &Path) -> StorageResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl BlockStore for FilesystemBackend {
    #[instrument(skip(self), fields(backend = "filesystem"))]
    async fn has(&self, hash: &BlockHash) -> StorageResult<bool> {
        let path = self.block_path(hash);
        fs::try_exists(&path).await.map_err(StorageError::Io)
    }

    #[instrument(skip(self), fields(backend = "filesystem"))]
    async fn get(&self, hash: &BlockHash) -> StorageResult<Bytes> {
        let path = self.block_path(hash);
        let data = fs::read(&path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                StorageError::NotFound(hash.to_hex())
            } else {
                StorageError::Io(e)
            }
        })?;
        Ok(Bytes::from(data))
    }

    #[instrument(skip(self, data), fields(backend = "filesystem", size = data.len()))]
    async fn put(&self, hash: &BlockHash, data: Bytes) -> StorageResult<()> {
        let path = self.block_path(hash);

        // Content addressing makes an existing block identical to this one.
        if fs::try_exists(&path).await.map_err(StorageError::Io)? {
            tracing::debug!(hash = %hash, "block already present");
            return Ok(());
        }

        self.ensure_parent(&path).await?;

        // Write to a uniquely named temp file, fsync, then rename so concurrent
        // writers of the same block never observe a partial file.
        let temp_name = format!(".tmp.{}", Uuid::new_v4());
        let temp_path = path.with_file_name(
            path.file_name()
                .map(|n| format!("{}{}", n.to_string_lossy(), temp_name))
                .unwrap_or_else(|| temp_name.clone()),
        );
        write_atomically(&temp_path, &path, &data).await?;
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "filesystem"
    }

    async fn health_check(&self) -> StorageResult<()> {
        let meta = fs::metadata(&self.root).await?;
        if !meta.is_dir() {
            return Err(StorageError::Config(format!(
                "storage root is not a directory: {}",
                self.root.display()
            )));
        }
        Ok(())
    }
}

/// Write `data` to `temp_path`, fsync, and rename it to `path`. The temp file
/// is removed if any step fails.
async fn write_atomically(temp_path: &Path, path: &Path, data: &[u8]) -> std::io::Result<()> {
    let result = async {
        let mut file = fs::File::create(temp_path).await?;
        file.write_all(data).await?;
        file.sync_all().await?;
        drop(file);
        fs::rename(temp_path, path).await
    }
    .await;

    if result.is_err() {
        let _ = fs::remove_file(temp_path).await;
    }
    result
}

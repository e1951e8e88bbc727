//! Client error types.

use shardfs_core::BlockHash;
use shardfs_metadata::MetadataError;
use shardfs_storage::StorageError;
use thiserror::Error;

/// Reasons a client operation was aborted.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Metadata(#[from] MetadataError),

    #[error("block store error: {0}")]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Core(#[from] shardfs_core::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("gave up after {attempts} commit attempts")]
    RetriesExhausted { attempts: u32 },

    #[error("block {hash} is corrupt: content hashes to {actual}")]
    CorruptBlock { hash: BlockHash, actual: BlockHash },

    #[error("metadata store reported block {0} which is not part of the file")]
    UnknownBlock(BlockHash),

    #[error("invalid path: {0}")]
    InvalidPath(String),

    #[error("{0} has reached the highest representable version")]
    VersionsExhausted(String),
}

/// Result type for client operations.
pub type ClientResult<T> = std::result::Result<T, ClientError>;

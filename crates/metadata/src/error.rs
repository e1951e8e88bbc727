//! Metadata store error types.

use shardfs_core::BlockHash;
use shardfs_storage::StorageError;
use thiserror::Error;

/// Format missing blocks for display, capping at MAX_DISPLAYED to prevent log/response bloat.
fn format_missing_blocks(hashes: &[BlockHash]) -> String {
    const MAX_DISPLAYED: usize = 5;
    let sample: Vec<String> = hashes.iter().take(MAX_DISPLAYED).map(|h| h.to_hex()).collect();
    if hashes.len() <= MAX_DISPLAYED {
        format!("{:?}", sample)
    } else {
        format!("{:?} (and {} more)", sample, hashes.len() - MAX_DISPLAYED)
    }
}

/// Metadata operation errors.
///
/// The first three variants are protocol outcomes that travel across the
/// network unchanged; the rest are failures of the call itself.
#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("wrong version: current version is {current}")]
    WrongVersion { current: u64 },

    #[error("missing {} blocks: {}", .hashes.len(), format_missing_blocks(.hashes))]
    MissingBlocks { hashes: Vec<BlockHash> },

    #[error("file not found: {0}")]
    FileNotFound(String),

    #[error("invalid filename: {0}")]
    InvalidFilename(String),

    /// The request was refused before reaching the table.
    #[error("request rejected: {0}")]
    InvalidRequest(String),

    #[error("block store error: {0}")]
    Storage(#[from] StorageError),

    #[error("metadata request timed out: {0}")]
    Timeout(String),

    #[error("metadata store unavailable: {0}")]
    Unavailable(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl MetadataError {
    /// True when the outcome of a mutation is unknown and the caller should
    /// re-read the current version before deciding what to do next.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Timeout(_) | Self::Unavailable(_) => true,
            Self::Storage(e) => e.is_timeout(),
            _ => false,
        }
    }
}

impl From<shardfs_core::Error> for MetadataError {
    fn from(e: shardfs_core::Error) -> Self {
        match e {
            shardfs_core::Error::InvalidFilename(name) => Self::InvalidFilename(name),
            other => Self::Internal(other.to_string()),
        }
    }
}

/// Result type for metadata operations.
pub type MetadataResult<T> = std::result::Result<T, MetadataError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn hashes(n: u8) -> Vec<BlockHash> {
        (0..n).map(|i| BlockHash::compute(&[i])).collect()
    }

    #[test]
    fn test_missing_blocks_format_small() {
        let hashes = hashes(2);
        let msg = MetadataError::MissingBlocks {
            hashes: hashes.clone(),
        }
        .to_string();
        assert!(msg.starts_with("missing 2 blocks"));
        assert!(msg.contains(&hashes[1].to_hex()));
    }

    #[test]
    fn test_missing_blocks_format_large() {
        let msg = MetadataError::MissingBlocks { hashes: hashes(8) }.to_string();
        assert!(msg.contains("missing 8 blocks"));
        assert!(msg.contains("and 3 more"));
    }

    #[test]
    fn test_transient_classification() {
        assert!(MetadataError::Timeout("t".into()).is_transient());
        assert!(MetadataError::Unavailable("down".into()).is_transient());
        assert!(MetadataError::Storage(StorageError::Timeout("slow".into())).is_transient());
        assert!(!MetadataError::WrongVersion { current: 1 }.is_transient());
        assert!(!MetadataError::Storage(StorageError::NotFound("x".into())).is_transient());
    }
}

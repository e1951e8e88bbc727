//! Error types for the core domain.

use crate::hash::BlockHash;
use thiserror::Error;

/// Core domain error type.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid hash: {0}")]
    InvalidHash(String),

    #[error("hash mismatch: expected {expected}, got {actual}")]
    HashMismatch { expected: BlockHash, actual: BlockHash },

    #[error("invalid shard count: {0}")]
    InvalidShardCount(usize),

    #[error("invalid filename: {0}")]
    InvalidFilename(String),

    #[error("deployment config error (line {line}): {message}")]
    Deployment { line: usize, message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, Error>;

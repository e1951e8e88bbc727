//! Core domain types and shared logic for shardfs.
//!
//! This crate defines the canonical data model used across all other crates:
//! - Block hashes and content addressing
//! - Fixed-window chunking of files into blocks
//! - Deterministic hash-to-shard routing
//! - File records (version + ordered hashlist, or tombstone)
//! - Wire protocol types shared by server and client
//! - Deployment and server configuration

pub mod block;
pub mod config;
pub mod error;
pub mod file;
pub mod hash;
pub mod protocol;
pub mod shard;

pub use block::{Block, SplitFile, chunk_bytes, split};
pub use error::{Error, Result};
pub use file::{FileRecord, Hashlist};
pub use hash::BlockHash;
pub use shard::ShardRouter;

/// Fixed block size: 4 KiB.
pub const BLOCK_SIZE: usize = 4096;

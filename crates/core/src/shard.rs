//! Deterministic block-to-shard routing.
//!
//! Placement is `integer(hex(hash)) mod shard_count` over the full 256-bit
//! digest. Client and metadata store must route with the same shard count;
//! changing it after data exists invalidates every prior placement.

use crate::hash::BlockHash;

/// Maps block hashes onto a fixed number of block-store shards.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ShardRouter {
    shard_count: usize,
}

impl ShardRouter {
    /// Create a router over `shard_count` shards.
    pub fn new(shard_count: usize) -> crate::Result<Self> {
        if shard_count == 0 {
            return Err(crate::Error::InvalidShardCount(shard_count));
        }
        Ok(Self { shard_count })
    }

    /// Number of shards.
    pub fn shard_count(&self) -> usize {
        self.shard_count
    }

    /// Index of the shard that owns `hash`.
    pub fn shard_of(&self, hash: &BlockHash) -> usize {
        let modulus = self.shard_count as u128;
        let rem = hash
            .as_bytes()
            .iter()
            .fold(0u128, |acc, &b| (acc * 256 + b as u128) % modulus);
        rem as usize
    }
}

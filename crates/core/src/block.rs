//! Block types and fixed-window chunking.

use crate::BLOCK_SIZE;
use crate::hash::BlockHash;
use crate::shard::ShardRouter;
use bytes::Bytes;
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use tokio::io::AsyncReadExt;

/// A block with its data.
#[derive(Clone)]
pub struct Block {
    /// The block hash (computed from data).
    pub hash: BlockHash,
    /// The block data.
    pub data: Bytes,
}

impl Block {
    /// Create a new block from data, computing the hash.
    pub fn new(data: Bytes) -> Self {
        let hash = BlockHash::compute(&data);
        Self { hash, data }
    }

    /// Verify that the data matches the expected hash.
    pub fn verify(&self, expected: &BlockHash) -> crate::Result<()> {
        if &self.hash != expected {
            return Err(crate::Error::HashMismatch {
                expected: *expected,
                actual: self.hash,
            });
        }
        Ok(())
    }
}

impl fmt::Debug for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Block")
            .field("hash", &self.hash)
            .field("size", &self.data.len())
            .finish()
    }
}

/// The result of chunking a file: block contents, shard placement and the
/// ordered hashlist that reconstructs the original byte stream.
#[derive(Clone, Debug, Default)]
pub struct SplitFile {
    /// Block contents keyed by hash. Repeated content is stored once.
    pub blocks: HashMap<BlockHash, Bytes>,
    /// Owning shard of every block.
    pub shards: HashMap<BlockHash, usize>,
    /// Block identities in file order. May contain duplicates.
    pub hashlist: Vec<BlockHash>,
}

impl SplitFile {
    fn push(&mut self, data: Bytes, router: &ShardRouter) {
        let block = Block::new(data);
        self.shards
            .entry(block.hash)
            .or_insert_with(|| router.shard_of(&block.hash));
        self.hashlist.push(block.hash);
        self.blocks.entry(block.hash).or_insert(block.data);
    }

    /// Block data for `hash`, if this file contains it.
    pub fn block(&self, hash: &BlockHash) -> Option<&Bytes> {
        self.blocks.get(hash)
    }
}

/// Split in-memory data into fixed-size blocks.
pub fn chunk_bytes(data: &[u8], router: &ShardRouter) -> SplitFile {
    let mut split = SplitFile::default();
    for window in data.chunks(BLOCK_SIZE) {
        split.push(Bytes::copy_from_slice(window), router);
    }
    split
}

/// Split the file at `path` into fixed-size blocks.
///
/// The file is read sequentially; every window is filled to `BLOCK_SIZE`
/// unless end of file is reached, so short reads never change block
/// boundaries.
pub async fn split(path: impl AsRef<Path>, router: &ShardRouter) -> crate::Result<SplitFile> {
    let mut file = tokio::fs::File::open(path.as_ref()).await?;
    let mut split = SplitFile::default();

    loop {
        let mut buf = vec![0u8; BLOCK_SIZE];
        let mut filled = 0;
        while filled < BLOCK_SIZE {
            let n = file.read(&mut buf[filled..]).await?;
            if n == 0 {
                break;
            }
            filled += n;
        }
        if filled == 0 {
            break;
        }
        buf.truncate(filled);
        split.push(Bytes::from(buf), router);
        if filled < BLOCK_SIZE {
            break;
        }
    }

    tracing::debug!(
        path = %path.as_ref().display(),
        blocks = split.hashlist.len(),
        distinct = split.blocks.len(),
        "split file into blocks"
    );
    Ok(split)
}

//! File records held by the metadata store.

use crate::hash::BlockHash;
use serde::{Deserialize, Serialize};

/// Ordered block identities reconstructing a file's byte stream.
pub type Hashlist = Vec<BlockHash>;

/// Versioned state of a single filename.
///
/// `hashlist == None` with `version > 0` is a tombstone: the file was deleted
/// but its version history is kept so later proposals stay well-defined.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    /// Current version (0 = never created).
    pub version: u64,
    /// Ordered hashlist, or `None` when unknown or deleted.
    pub hashlist: Option<Hashlist>,
}

impl FileRecord {
    /// Record reported for a filename that was never created.
    pub fn unknown() -> Self {
        Self::default()
    }

    /// Live record at `version`.
    pub fn live(version: u64, hashlist: Hashlist) -> Self {
        Self {
            version,
            hashlist: Some(hashlist),
        }
    }

    /// Tombstone at `version`.
    pub fn tombstone(version: u64) -> Self {
        Self {
            version,
            hashlist: None,
        }
    }

    /// True when the file has been created and then deleted.
    pub fn is_tombstone(&self) -> bool {
        self.version > 0 && self.hashlist.is_none()
    }

    /// True when the file currently has content.
    pub fn exists(&self) -> bool {
        self.hashlist.is_some()
    }
}

/// Validate a filename used as a metadata key.
///
/// Filenames are flat: no path separators, not empty, not `.`/`..`.
pub fn validate_filename(name: &str) -> crate::Result<()> {
    if name.is_empty() || name == "." || name == ".." {
        return Err(crate::Error::InvalidFilename(name.to_string()));
    }
    if name.contains('/') || name.contains('\\') || name.contains('\0') {
        return Err(crate::Error::InvalidFilename(name.to_string()));
    }
    Ok(())
}

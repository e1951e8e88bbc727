//! Wire types shared by the HTTP server and the remote clients.

use crate::file::{FileRecord, Hashlist};
use crate::hash::BlockHash;
use serde::{Deserialize, Serialize};

/// Error code: proposed version is not current + 1.
pub const WRONG_VERSION: &str = "WRONG_VERSION";
/// Error code: hashlist references blocks absent from their shards.
pub const MISSING_BLOCKS: &str = "MISSING_BLOCKS";
/// Error code: deleting a file that was never created.
pub const FILE_NOT_FOUND: &str = "FILE_NOT_FOUND";

/// Body of `GET /v1/files/{filename}`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadFileResponse {
    pub version: u64,
    pub hashlist: Option<Hashlist>,
}

impl From<FileRecord> for ReadFileResponse {
    fn from(record: FileRecord) -> Self {
        Self {
            version: record.version,
            hashlist: record.hashlist,
        }
    }
}

impl From<ReadFileResponse> for FileRecord {
    fn from(resp: ReadFileResponse) -> Self {
        Self {
            version: resp.version,
            hashlist: resp.hashlist,
        }
    }
}

/// Body of `PUT /v1/files/{filename}`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ModifyFileRequest {
    pub version: u64,
    pub hashlist: Hashlist,
}

/// Body of `DELETE /v1/files/{filename}`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DeleteFileRequest {
    pub version: u64,
}

/// Successful mutation response.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: String,
}

impl StatusResponse {
    pub fn ok() -> Self {
        Self {
            status: "OK".to_string(),
        }
    }
}

/// API error response.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error code for programmatic handling.
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    /// Server's current version, for `WRONG_VERSION`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_version: Option<u64>,
    /// Absent blocks, for `MISSING_BLOCKS`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub missing_blocks: Option<Vec<BlockHash>>,
}

/// Body of `GET /v1/health`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub role: String,
    pub version: String,
}

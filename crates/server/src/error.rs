//! API error types.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use shardfs_core::BlockHash;
use shardfs_core::protocol::{ErrorResponse, FILE_NOT_FOUND, MISSING_BLOCKS, WRONG_VERSION};
use shardfs_metadata::MetadataError;
use shardfs_storage::StorageError;

/// API error type.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    /// Request body the extractor refused, with the status it chose.
    #[error("rejected request body: {message}")]
    Rejected { status: StatusCode, message: String },

    #[error("hash mismatch: expected {expected}, got {actual}")]
    HashMismatch {
        expected: BlockHash,
        actual: BlockHash,
    },

    #[error("internal error: {0}")]
    Internal(String),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("{0}")]
    Metadata(#[from] MetadataError),
}

impl ApiError {
    /// Get the error code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::BadRequest(_) => "bad_request",
            Self::Rejected { status, .. } if *status == StatusCode::PAYLOAD_TOO_LARGE => {
                "payload_too_large"
            }
            Self::Rejected { .. } => "bad_request",
            Self::HashMismatch { .. } => "hash_mismatch",
            Self::Internal(_) => "internal_error",
            Self::Storage(e) => match e {
                StorageError::NotFound(_) => "not_found",
                _ => "storage_error",
            },
            Self::Metadata(e) => match e {
                MetadataError::WrongVersion { .. } => WRONG_VERSION,
                MetadataError::MissingBlocks { .. } => MISSING_BLOCKS,
                MetadataError::FileNotFound(_) => FILE_NOT_FOUND,
                MetadataError::InvalidFilename(_) | MetadataError::InvalidRequest(_) => {
                    "bad_request"
                }
                MetadataError::Storage(_)
                | MetadataError::Timeout(_)
                | MetadataError::Unavailable(_) => "storage_error",
                MetadataError::Internal(_) => "internal_error",
            },
        }
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Rejected { status, .. } => *status,
            Self::HashMismatch { .. } => StatusCode::BAD_REQUEST,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Storage(e) => storage_status(e),
            Self::Metadata(e) => match e {
                MetadataError::WrongVersion { .. } | MetadataError::MissingBlocks { .. } => {
                    StatusCode::CONFLICT
                }
                MetadataError::FileNotFound(_) => StatusCode::NOT_FOUND,
                MetadataError::InvalidFilename(_) | MetadataError::InvalidRequest(_) => {
                    StatusCode::BAD_REQUEST
                }
                MetadataError::Storage(e) => storage_status(e),
                MetadataError::Timeout(_) | MetadataError::Unavailable(_) => {
                    StatusCode::BAD_GATEWAY
                }
                MetadataError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    fn current_version(&self) -> Option<u64> {
        match self {
            Self::Metadata(MetadataError::WrongVersion { current }) => Some(*current),
            _ => None,
        }
    }
}

impl From<shardfs_core::Error> for ApiError {
    fn from(e: shardfs_core::Error) -> Self {
        match e {
            shardfs_core::Error::HashMismatch { expected, actual } => {
                Self::HashMismatch { expected, actual }
            }
            shardfs_core::Error::Io(e) => Self::Internal(e.to_string()),
            other => Self::BadRequest(other.to_string()),
        }
    }
}

/// Local disk failures are ours; everything else came from another shard.
fn storage_status(e: &StorageError) -> StatusCode {
    match e {
        StorageError::NotFound(_) => StatusCode::NOT_FOUND,
        StorageError::InvalidKey(_) => StatusCode::BAD_REQUEST,
        StorageError::Io(_) | StorageError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        StorageError::Http(_) | StorageError::Timeout(_) | StorageError::UnexpectedStatus { .. } => {
            StatusCode::BAD_GATEWAY
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.code();
        if status.is_server_error() {
            tracing::error!(code, error = %self, "request failed");
        }
        crate::metrics::record_error(code);

        let current_version = self.current_version();
        let message = self.to_string();
        let missing_blocks = match self {
            Self::Metadata(MetadataError::MissingBlocks { hashes }) => Some(hashes),
            _ => None,
        };
        let body = ErrorResponse {
            code: code.to_string(),
            message,
            current_version,
            missing_blocks,
        };
        (status, Json(body)).into_response()
    }
}

/// Result type for API handlers.
pub type ApiResult<T> = std::result::Result<T, ApiError>;

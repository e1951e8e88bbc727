use async_trait::async_trait;
use reqwest::Url;
use serde::de::DeserializeOwned;
use shardfs_core::protocol::{
    DeleteFileRequest, ErrorResponse, FILE_NOT_FOUND, MISSING_BLOCKS, ModifyFileRequest,
    ReadFileResponse, WRONG_VERSION,
};
use shardfs_core::{FileRecord, Hashlist};
use shardfs_metadata::{MetadataError, MetadataResult, MetadataService};
use shardfs_storage::StorageError;
use std::time::Duration;

/// `MetadataService` reached over HTTP.
///
/// Protocol errors in the response body are mapped back to the matching
/// `MetadataError` variant, so callers handle a remote store exactly like
/// an in-process one.
#[derive(Clone)]
pub struct RemoteMetadata {
    http: reqwest::Client,
    base_url: Url,
}

impl RemoteMetadata {
    pub fn new(base_url: &str, timeout: Duration) -> MetadataResult<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| MetadataError::Internal(format!("invalid metadata URL {base_url}: {e}")))?;
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| MetadataError::Internal(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { http, base_url })
    }

    fn file_url(&self, filename: &str) -> MetadataResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| MetadataError::Internal(format!("unusable base URL {}", self.base_url)))?
            .pop_if_empty()
            .extend(["v1", "files", filename]);
        Ok(url)
    }

    async fn send(
        &self,
        filename: &str,
        req: reqwest::RequestBuilder,
    ) -> MetadataResult<reqwest::Response> {
        let response = req.send().await.map_err(transport_error)?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(match serde_json::from_str::<ErrorResponse>(&body) {
            Ok(err) => protocol_error(filename, err),
            Err(_) if status.is_server_error() => {
                MetadataError::Unavailable(format!("metadata store returned {status}"))
            }
            Err(_) => MetadataError::Internal(format!("API error ({status}): {body}")),
        })
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        filename: &str,
        req: reqwest::RequestBuilder,
    ) -> MetadataResult<T> {
        let response = self.send(filename, req).await?;
        response
            .json()
            .await
            .map_err(|e| MetadataError::Internal(format!("invalid response body: {e}")))
    }
}

fn transport_error(e: reqwest::Error) -> MetadataError {
    if e.is_timeout() {
        MetadataError::Timeout(e.to_string())
    } else {
        MetadataError::Unavailable(e.to_string())
    }
}

fn protocol_error(filename: &str, err: ErrorResponse) -> MetadataError {
    match err.code.as_str() {
        WRONG_VERSION => MetadataError::WrongVersion {
            current: err.current_version.unwrap_or_default(),
        },
        MISSING_BLOCKS => MetadataError::MissingBlocks {
            hashes: err.missing_blocks.unwrap_or_default(),
        },
        FILE_NOT_FOUND => MetadataError::FileNotFound(filename.to_string()),
        "bad_request" | "payload_too_large" => MetadataError::InvalidRequest(err.message),
        "storage_error" => MetadataError::Storage(StorageError::Http(err.message)),
        _ => MetadataError::Internal(format!("{}: {}", err.code, err.message)),
    }
}

#[async_trait]
impl MetadataService for RemoteMetadata {
    async fn read_file(&self, filename: &str) -> MetadataResult<FileRecord> {
        let url = self.file_url(filename)?;
        let response: ReadFileResponse = self.send_json(filename, self.http.get(url)).await?;
        Ok(response.into())
    }

    async fn modify_file(
        &self,
        filename: &str,
        version: u64,
        hashlist: Hashlist,
    ) -> MetadataResult<()> {
        let url = self.file_url(filename)?;
        let body = ModifyFileRequest { version, hashlist };
        self.send(filename, self.http.put(url).json(&body)).await?;
        Ok(())
    }

    async fn delete_file(&self, filename: &str, version: u64) -> MetadataResult<()> {
        let url = self.file_url(filename)?;
        let body = DeleteFileRequest { version };
        self.send(filename, self.http.delete(url).json(&body)).await?;
        Ok(())
    }
}

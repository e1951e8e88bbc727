//! Remote block store reached over HTTP.

use crate::error::{StorageError, StorageResult};
use crate::traits::BlockStore;
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{StatusCode, Url};
use shardfs_core::BlockHash;
use std::time::Duration;
use tracing::instrument;

/// Client for a block-store shard served by `shardfsd block`.
#[derive(Clone)]
pub struct HttpBackend {
    http: reqwest::Client,
    base_url: Url,
}

impl HttpBackend {
    /// Create a client for the shard at `base_url`, applying `timeout` to every request.
    pub fn new(base_url: &str, timeout: Duration) -> StorageResult<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| StorageError::Config(format!("invalid block store URL {base_url}: {e}")))?;
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| StorageError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { http, base_url })
    }

    fn block_url(&self, hash: &BlockHash) -> StorageResult<Url> {
        self.base_url
            .join(&format!("/v1/blocks/{}", hash.to_hex()))
            .map_err(|e| StorageError::InvalidKey(e.to_string()))
    }

    fn unexpected(&self, status: StatusCode) -> StorageError {
        StorageError::UnexpectedStatus {
            backend: self.base_url.to_string(),
            status: status.as_u16(),
        }
    }
}

#[async_trait]
impl BlockStore for HttpBackend {
    #[instrument(skip(self), fields(backend = "http", url = %self.base_url))]
    async fn has(&self, hash: &BlockHash) -> StorageResult<bool> {
        let response = self.http.head(self.block_url(hash)?).send().await?;
        match response.status() {
            StatusCode::OK => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            status => Err(self.unexpected(status)),
        }
    }

    #[instrument(skip(self), fields(backend = "http", url = %self.base_url))]
    async fn get(&self, hash: &BlockHash) -> StorageResult<Bytes> {
        let response = self.http.get(self.block_url(hash)?).send().await?;
        match response.status() {
            StatusCode::OK => Ok(response.bytes().await?),
            StatusCode::NOT_FOUND => Err(StorageError::NotFound(hash.to_hex())),
            status => Err(self.unexpected(status)),
        }
    }

    #[instrument(skip(self, data), fields(backend = "http", url = %self.base_url, size = data.len()))]
    async fn put(&self, hash: &BlockHash, data: Bytes) -> StorageResult<()> {
        let response = self
            .http
            .put(self.block_url(hash)?)
            .header("content-type", "application/octet-stream")
            .body(data)
            .send()
            .await?;
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        if status == StatusCode::BAD_REQUEST {
            let body = response.text().await.unwrap_or_default();
            return Err(StorageError::Http(format!(
                "block store rejected {}: {}",
                hash, body
            )));
        }
        Err(self.unexpected(status))
    }

    fn backend_name(&self) -> &'static str {
        "http"
    }

    async fn health_check(&self) -> StorageResult<()> {
        let url = self
            .base_url
            .join("/v1/health")
            .map_err(|e| StorageError::InvalidKey(e.to_string()))?;
        let response = self.http.get(url).send().await?;
        if !response.status().is_success() {
            return Err(self.unexpected(response.status()));
        }
        Ok(())
    }
}

//! Server test utilities.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use bytes::Bytes;
use serde_json::Value;
use shardfs_core::config::AppConfig;
use shardfs_core::{BlockHash, ShardRouter};
use shardfs_metadata::MetadataStore;
use shardfs_server::{AppState, create_router};
use shardfs_storage::{BlockStore, FilesystemBackend, MemoryBackend, ShardSet};
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

/// A test server wrapper with all dependencies.
/// Note: #[allow(dead_code)] because each test file compiles common/ separately.
#[allow(dead_code)]
pub struct TestServer {
    pub router: axum::Router,
    pub state: AppState,
    /// Shards behind the metadata store; empty for a block server.
    pub shards: Vec<Arc<MemoryBackend>>,
    _temp_dir: Option<TempDir>,
}

#[allow(dead_code)]
impl TestServer {
    /// Metadata server over `n` in-memory shards.
    pub fn metadata(n: usize) -> Self {
        Self::metadata_with_config(n, AppConfig::for_testing())
    }

    pub fn metadata_with_config(n: usize, config: AppConfig) -> Self {
        shardfs_server::metrics::register_metrics();
        let shards: Vec<_> = (0..n).map(|_| Arc::new(MemoryBackend::new())).collect();
        let stores = shards
            .iter()
            .map(|s| s.clone() as Arc<dyn BlockStore>)
            .collect();
        let shard_set = ShardSet::new(ShardRouter::new(n).unwrap(), stores).unwrap();
        let state = AppState::metadata(config, Arc::new(MetadataStore::new(shard_set)));

        Self {
            router: create_router(state.clone()),
            state,
            shards,
            _temp_dir: None,
        }
    }

    /// Block server backed by a temporary directory.
    pub async fn block() -> Self {
        shardfs_server::metrics::register_metrics();
        let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");
        let store: Arc<dyn BlockStore> = Arc::new(
            FilesystemBackend::new(temp_dir.path().join("blocks"))
                .await
                .expect("Failed to create storage backend"),
        );
        let state = AppState::block(AppConfig::for_testing(), 0, store);

        Self {
            router: create_router(state.clone()),
            state,
            shards: Vec::new(),
            _temp_dir: Some(temp_dir),
        }
    }

    /// Store a block directly on its owning shard.
    pub async fn seed_block(&self, data: &'static [u8]) -> BlockHash {
        let hash = BlockHash::compute(data);
        let router = ShardRouter::new(self.shards.len()).unwrap();
        self.shards[router.shard_of(&hash)]
            .put(&hash, Bytes::from_static(data))
            .await
            .unwrap();
        hash
    }

    /// Send a request with an optional JSON body and decode the JSON reply.
    pub async fn json_request(
        &self,
        method: &str,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(v) => {
                builder = builder.header("Content-Type", "application/json");
                Body::from(serde_json::to_vec(&v).unwrap())
            }
            None => Body::empty(),
        };

        let (status, bytes) = self.raw_request(builder.body(body).unwrap()).await;
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, json)
    }

    /// Send a request and return the status and raw body.
    pub async fn raw_request(&self, request: Request<Body>) -> (StatusCode, Bytes) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, body)
    }
}

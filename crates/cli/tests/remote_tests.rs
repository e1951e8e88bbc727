//! Remote metadata client and full deployments over real sockets.

mod common;

use common::{fast_retry, seeded_bytes, write_file};
use httpmock::Method::{DELETE, GET, PUT};
use httpmock::MockServer;
use serde_json::json;
use shardfs_cli::{Client, Outcome, RemoteMetadata};
use shardfs_core::config::{AppConfig, Deployment};
use shardfs_core::{BlockHash, ShardRouter};
use shardfs_metadata::{MetadataError, MetadataService, MetadataStore};
use shardfs_server::{AppState, create_router};
use shardfs_storage::{BlockStore, MemoryBackend, ShardSet};
use std::net::TcpListener;
use std::sync::Arc;
use std::time::Duration;
use tempfile::tempdir;

fn can_bind_localhost() -> bool {
    TcpListener::bind("127.0.0.1:0").is_ok()
}

#[tokio::test]
async fn remote_metadata_maps_protocol_errors() {
    if !can_bind_localhost() {
        eprintln!("Skipping httpmock tests: cannot bind to localhost");
        return;
    }

    let server = MockServer::start_async().await;
    let missing = BlockHash::compute(b"gap");

    server
        .mock_async(|when, then| {
            when.method(GET).path("/v1/files/a.txt");
            then.status(200)
                .json_body(json!({"version": 4, "hashlist": [missing.to_hex()]}));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(PUT)
                .path("/v1/files/a.txt")
                .json_body(json!({"version": 5, "hashlist": [missing.to_hex()]}));
            then.status(409).json_body(json!({
                "code": "MISSING_BLOCKS",
                "message": "missing 1 blocks",
                "missing_blocks": [missing.to_hex()]
            }));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(PUT).path("/v1/files/a.txt").json_body(json!({
                "version": 3,
                "hashlist": []
            }));
            then.status(409).json_body(json!({
                "code": "WRONG_VERSION",
                "message": "wrong version",
                "current_version": 4
            }));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(DELETE).path("/v1/files/ghost");
            then.status(404)
                .json_body(json!({"code": "FILE_NOT_FOUND", "message": "file not found"}));
        })
        .await;

    let client = RemoteMetadata::new(&server.base_url(), Duration::from_secs(5)).unwrap();

    let record = client.read_file("a.txt").await.unwrap();
    assert_eq!(record.version, 4);
    assert_eq!(record.hashlist, Some(vec![missing]));

    match client.modify_file("a.txt", 5, vec![missing]).await {
        Err(MetadataError::MissingBlocks { hashes }) => assert_eq!(hashes, vec![missing]),
        other => panic!("expected MissingBlocks, got {other:?}"),
    }
    assert!(matches!(
        client.modify_file("a.txt", 3, vec![]).await,
        Err(MetadataError::WrongVersion { current: 4 })
    ));
    assert!(matches!(
        client.delete_file("ghost", 1).await,
        Err(MetadataError::FileNotFound(name)) if name == "ghost"
    ));
}

#[tokio::test]
async fn remote_metadata_classifies_transport_failures() {
    if !can_bind_localhost() {
        eprintln!("Skipping httpmock tests: cannot bind to localhost");
        return;
    }

    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(PUT).path("/v1/files/slow");
            then.status(200)
                .delay(Duration::from_secs(2))
                .json_body(json!({"status": "OK"}));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/v1/files/proxy");
            then.status(503).body("upstream unavailable");
        })
        .await;

    let client = RemoteMetadata::new(&server.base_url(), Duration::from_millis(200)).unwrap();
    let err = client.modify_file("slow", 1, vec![]).await.unwrap_err();
    assert!(matches!(err, MetadataError::Timeout(_)), "got {err:?}");
    assert!(err.is_transient());

    let err = client.read_file("proxy").await.unwrap_err();
    assert!(matches!(err, MetadataError::Unavailable(_)), "got {err:?}");
}

/// Bind a listener on an ephemeral port.
async fn listen() -> (tokio::net::TcpListener, u16) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    (listener, port)
}

/// Serve a metadata store over `shards` in-memory block stores; returns its URL.
async fn spawn_metadata(config: AppConfig, shards: usize) -> String {
    let stores = (0..shards)
        .map(|_| Arc::new(MemoryBackend::new()) as Arc<dyn BlockStore>)
        .collect();
    let shard_set = ShardSet::new(ShardRouter::new(shards).unwrap(), stores).unwrap();
    let router = create_router(AppState::metadata(
        config,
        Arc::new(MetadataStore::new(shard_set)),
    ));
    let (listener, port) = listen().await;
    tokio::spawn(async move { axum::serve(listener, router).await.unwrap() });
    format!("http://127.0.0.1:{port}")
}

#[tokio::test]
async fn large_hashlist_round_trips_through_remote_metadata() {
    shardfs_server::metrics::register_metrics();
    let url = spawn_metadata(AppConfig::for_testing(), 2).await;
    let client = RemoteMetadata::new(&url, Duration::from_secs(30)).unwrap();

    // 45k blocks is a ~180 MiB file; the hashlist alone is ~3 MB of JSON.
    let hashlist: Vec<BlockHash> = (0..45_000u32)
        .map(|i| BlockHash::compute(&i.to_le_bytes()))
        .collect();

    match client.modify_file("big.iso", 1, hashlist.clone()).await {
        Err(MetadataError::MissingBlocks { hashes }) => assert_eq!(hashes, hashlist),
        other => panic!("expected MissingBlocks, got {other:?}"),
    }

    let record = client.read_file("big.iso").await.unwrap();
    assert_eq!(record.version, 1);
    assert_eq!(record.hashlist, Some(hashlist));
}

#[tokio::test]
async fn oversized_request_is_rejected_as_invalid_request() {
    shardfs_server::metrics::register_metrics();
    let mut config = AppConfig::for_testing();
    config.server.max_file_request_bytes = 1024;
    let url = spawn_metadata(config, 1).await;
    let client = RemoteMetadata::new(&url, Duration::from_secs(5)).unwrap();

    let hashlist: Vec<BlockHash> = (0..100u32)
        .map(|i| BlockHash::compute(&i.to_le_bytes()))
        .collect();
    let err = client.modify_file("big.iso", 1, hashlist).await.unwrap_err();
    assert!(matches!(err, MetadataError::InvalidRequest(_)), "got {err:?}");
    assert!(!err.is_transient());

    // Nothing reached the table.
    assert_eq!(client.read_file("big.iso").await.unwrap().version, 0);
}

#[tokio::test]
async fn full_deployment_round_trip() {
    shardfs_server::metrics::register_metrics();

    let (meta_listener, meta_port) = listen().await;
    let mut block_listeners = Vec::new();
    for _ in 0..3 {
        block_listeners.push(listen().await);
    }

    let mut text = format!("B: 3\nmetadata: 127.0.0.1:{meta_port}\n");
    for (i, (_, port)) in block_listeners.iter().enumerate() {
        text.push_str(&format!("block{i}: 127.0.0.1:{port}\n"));
    }
    let deployment = Deployment::parse(&text).unwrap();

    for (index, (listener, _)) in block_listeners.into_iter().enumerate() {
        let store: Arc<dyn BlockStore> = Arc::new(MemoryBackend::new());
        let router = create_router(AppState::block(AppConfig::for_testing(), index, store));
        tokio::spawn(async move { axum::serve(listener, router).await.unwrap() });
    }

    let store = MetadataStore::from_deployment(&deployment, Duration::from_secs(5)).unwrap();
    let router = create_router(AppState::metadata(AppConfig::for_testing(), Arc::new(store)));
    tokio::spawn(async move { axum::serve(meta_listener, router).await.unwrap() });

    let client = Client::from_deployment(&deployment, Duration::from_secs(5), fast_retry(16)).unwrap();

    let src = tempdir().unwrap();
    let dst = tempdir().unwrap();
    let data = seeded_bytes(11, 10_000);
    let path = write_file(src.path(), "report.pdf", &data);

    assert_eq!(client.upload(&path).await.unwrap(), Outcome::Ok);
    assert_eq!(client.upload(&path).await.unwrap(), Outcome::Ok);
    let record = client.read("report.pdf").await.unwrap().unwrap();
    assert_eq!(record.version, 2);

    assert_eq!(client.download("report.pdf", dst.path()).await.unwrap(), Outcome::Ok);
    assert_eq!(std::fs::read(dst.path().join("report.pdf")).unwrap(), data);

    assert_eq!(client.delete("report.pdf").await.unwrap(), Outcome::Ok);
    assert!(client.read("report.pdf").await.unwrap().is_none());
    assert_eq!(client.delete("report.pdf").await.unwrap(), Outcome::NotFound);
}

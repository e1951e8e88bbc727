//! Prometheus metrics for the shardfs servers.
//!
//! Exposes counters for the metadata protocol outcomes and block traffic,
//! and a latency histogram for `modify`. Metrics carry no filenames or
//! hashes, only aggregate counts.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use prometheus::{
    self, Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry,
    TextEncoder,
};
use std::sync::{LazyLock, Once};

/// Global Prometheus registry for all metrics.
pub static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

// Metadata protocol metrics
pub static MODIFY_ACCEPTED: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "shardfs_modify_accepted_total",
        "Total number of modify requests committed",
    )
    .expect("metric creation failed")
});

pub static MODIFY_WRONG_VERSION: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "shardfs_modify_wrong_version_total",
        "Total number of modify requests rejected with a version conflict",
    )
    .expect("metric creation failed")
});

pub static MODIFY_MISSING_BLOCKS: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "shardfs_modify_missing_blocks_total",
        "Total number of modify requests that reported missing blocks",
    )
    .expect("metric creation failed")
});

pub static MISSING_BLOCKS_REPORTED: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "shardfs_missing_blocks_reported_total",
        "Total number of block hashes reported missing",
    )
    .expect("metric creation failed")
});

pub static DELETES_ACCEPTED: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "shardfs_deletes_accepted_total",
        "Total number of files tombstoned",
    )
    .expect("metric creation failed")
});

// Block metrics
pub static BLOCKS_STORED: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new("shardfs_blocks_stored_total", "Total number of new blocks stored")
        .expect("metric creation failed")
});

pub static BLOCKS_DEDUPLICATED: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "shardfs_blocks_deduplicated_total",
        "Total number of block puts skipped because the block already existed",
    )
    .expect("metric creation failed")
});

pub static BYTES_STORED: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "shardfs_bytes_stored_total",
        "Total bytes stored (new blocks only)",
    )
    .expect("metric creation failed")
});

pub static BLOCK_FETCHES: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new("shardfs_block_fetches_total", "Total number of blocks served")
        .expect("metric creation failed")
});

pub static BLOCK_HASH_MISMATCHES: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "shardfs_block_hash_mismatches_total",
        "Total number of block puts whose body did not match the declared hash",
    )
    .expect("metric creation failed")
});

// Timing metrics
pub static MODIFY_DURATION: LazyLock<Histogram> = LazyLock::new(|| {
    Histogram::with_opts(
        HistogramOpts::new(
            "shardfs_modify_duration_seconds",
            "Time taken to validate and commit a modify request",
        )
        .buckets(vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 5.0]),
    )
    .expect("metric creation failed")
});

// Error metrics
pub static REQUEST_ERRORS: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new(
            "shardfs_request_errors_total",
            "Total number of failed requests by error code",
        ),
        &["code"],
    )
    .expect("metric creation failed")
});

/// Guard to ensure metrics are only registered once.
static REGISTER_ONCE: Once = Once::new();

/// Register all metrics with the global registry.
///
/// This function is idempotent - subsequent calls after the first are no-ops.
/// This allows safe use in integration tests or when embedding multiple routers.
pub fn register_metrics() {
    REGISTER_ONCE.call_once(|| {
        REGISTRY
            .register(Box::new(MODIFY_ACCEPTED.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(MODIFY_WRONG_VERSION.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(MODIFY_MISSING_BLOCKS.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(MISSING_BLOCKS_REPORTED.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(DELETES_ACCEPTED.clone()))
            .expect("metric registration failed");

        REGISTRY
            .register(Box::new(BLOCKS_STORED.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(BLOCKS_DEDUPLICATED.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(BYTES_STORED.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(BLOCK_FETCHES.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(BLOCK_HASH_MISMATCHES.clone()))
            .expect("metric registration failed");

        REGISTRY
            .register(Box::new(MODIFY_DURATION.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(REQUEST_ERRORS.clone()))
            .expect("metric registration failed");
    });
}

/// GET /metrics - Prometheus metrics endpoint.
pub async fn metrics_handler() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();

    let mut buffer = Vec::new();
    match encoder.encode(&metric_families, &mut buffer) {
        Ok(()) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            buffer,
        ),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            [("content-type", "text/plain; charset=utf-8")],
            format!("Failed to encode metrics: {e}").into_bytes(),
        ),
    }
}

/// Helper to record failed requests by error code.
pub fn record_error(code: &str) {
    REQUEST_ERRORS.with_label_values(&[code]).inc();
}

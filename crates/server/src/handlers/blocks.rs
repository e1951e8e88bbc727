//! Block store endpoints.

use crate::error::{ApiError, ApiResult};
use crate::metrics::{
    BLOCK_FETCHES, BLOCK_HASH_MISMATCHES, BLOCKS_DEDUPLICATED, BLOCKS_STORED, BYTES_STORED,
};
use crate::state::AppState;
use axum::extract::{Path, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use shardfs_core::{BLOCK_SIZE, Block, BlockHash};

fn parse_hash(hash: &str) -> ApiResult<BlockHash> {
    BlockHash::from_hex(hash).map_err(|e| ApiError::BadRequest(format!("invalid block hash: {e}")))
}

/// HEAD /v1/blocks/{hash}
pub async fn has_block(
    State(state): State<AppState>,
    Path(hash): Path<String>,
) -> ApiResult<StatusCode> {
    let hash = parse_hash(&hash)?;
    if state.block_store()?.has(&hash).await? {
        Ok(StatusCode::OK)
    } else {
        Ok(StatusCode::NOT_FOUND)
    }
}

/// GET /v1/blocks/{hash}
pub async fn get_block(
    State(state): State<AppState>,
    Path(hash): Path<String>,
) -> ApiResult<Response> {
    let hash = parse_hash(&hash)?;
    let data = state.block_store()?.get(&hash).await?;
    BLOCK_FETCHES.inc();

    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/octet-stream")],
        data,
    )
        .into_response())
}

/// PUT /v1/blocks/{hash}
///
/// The body must hash to `{hash}`. Storing a block that already exists is a
/// no-op.
pub async fn put_block(
    State(state): State<AppState>,
    Path(hash): Path<String>,
    body: Bytes,
) -> ApiResult<StatusCode> {
    let expected = parse_hash(&hash)?;
    if body.len() > BLOCK_SIZE {
        return Err(ApiError::BadRequest(format!(
            "block size {} exceeds maximum {}",
            body.len(),
            BLOCK_SIZE
        )));
    }

    let block = Block::new(body);
    if let Err(e) = block.verify(&expected) {
        BLOCK_HASH_MISMATCHES.inc();
        return Err(e.into());
    }

    let store = state.block_store()?;
    if store.has(&expected).await? {
        BLOCKS_DEDUPLICATED.inc();
        return Ok(StatusCode::NO_CONTENT);
    }

    let size = block.data.len();
    store.put(&expected, block.data).await?;
    BLOCKS_STORED.inc();
    BYTES_STORED.inc_by(size as u64);
    tracing::debug!(hash = %expected, size, "block stored");
    Ok(StatusCode::NO_CONTENT)
}

//! Metadata store endpoints.

use crate::error::{ApiError, ApiResult};
use crate::metrics::{
    DELETES_ACCEPTED, MISSING_BLOCKS_REPORTED, MODIFY_ACCEPTED, MODIFY_DURATION,
    MODIFY_MISSING_BLOCKS, MODIFY_WRONG_VERSION,
};
use crate::state::AppState;
use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use shardfs_core::protocol::{
    DeleteFileRequest, ModifyFileRequest, ReadFileResponse, StatusResponse,
};
use shardfs_metadata::{MetadataError, MetadataService};
use std::time::Instant;

/// Malformed JSON is a protocol `bad_request`; any other rejection (body too
/// large, wrong content type) keeps the status the extractor chose.
fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> ApiResult<T> {
    payload.map(|Json(body)| body).map_err(|e| match e {
        JsonRejection::JsonDataError(_) | JsonRejection::JsonSyntaxError(_) => {
            ApiError::BadRequest(e.body_text())
        }
        other => ApiError::Rejected {
            status: other.status(),
            message: other.body_text(),
        },
    })
}

/// GET /v1/files/{filename}
pub async fn read_file(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> ApiResult<Json<ReadFileResponse>> {
    let record = state.metadata_store()?.read_file(&filename).await?;
    Ok(Json(record.into()))
}

/// PUT /v1/files/{filename}
pub async fn modify_file(
    State(state): State<AppState>,
    Path(filename): Path<String>,
    payload: Result<Json<ModifyFileRequest>, JsonRejection>,
) -> ApiResult<Json<StatusResponse>> {
    let request = json_body(payload)?;
    let store = state.metadata_store()?;

    let start_time = Instant::now();
    let result = store
        .modify_file(&filename, request.version, request.hashlist)
        .await;
    MODIFY_DURATION.observe(start_time.elapsed().as_secs_f64());

    match result {
        Ok(()) => {
            MODIFY_ACCEPTED.inc();
            tracing::info!(filename = %filename, version = request.version, "file modified");
            Ok(Json(StatusResponse::ok()))
        }
        Err(e) => {
            match &e {
                MetadataError::WrongVersion { current } => {
                    MODIFY_WRONG_VERSION.inc();
                    tracing::debug!(filename = %filename, proposed = request.version, current, "version conflict");
                }
                MetadataError::MissingBlocks { hashes } => {
                    MODIFY_MISSING_BLOCKS.inc();
                    MISSING_BLOCKS_REPORTED.inc_by(hashes.len() as u64);
                    tracing::debug!(filename = %filename, missing = hashes.len(), "blocks missing");
                }
                _ => {}
            }
            Err(e.into())
        }
    }
}

/// DELETE /v1/files/{filename}
pub async fn delete_file(
    State(state): State<AppState>,
    Path(filename): Path<String>,
    payload: Result<Json<DeleteFileRequest>, JsonRejection>,
) -> ApiResult<Json<StatusResponse>> {
    let request = json_body(payload)?;
    state
        .metadata_store()?
        .delete_file(&filename, request.version)
        .await?;

    DELETES_ACCEPTED.inc();
    tracing::info!(filename = %filename, version = request.version, "file deleted");
    Ok(Json(StatusResponse::ok()))
}

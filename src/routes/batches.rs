use axum::extract::{Multipart, Path, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::pipeline::batch::{read_batch, ReadStatus, SourceFile};
use crate::pipeline::route::build_route;
use crate::pipeline::summary::{self, DailyLoad, RunSummary};
use crate::pipeline::upload::{csrf_token_from_cookie, UploadOutcome, Uploader};
use crate::routes::views::{open_view, ViewResponse};
use crate::state::AppState;
use crate::types::activity::FileFormat;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/batches", post(create_batch))
        .route("/api/batches/:batch_id", get(get_batch).delete(clear_batch))
        .route("/api/batches/:batch_id/upload", post(upload_batch))
        .route("/api/batches/:batch_id/load", get(batch_load))
        .route("/api/batches/:batch_id/view", post(view_run))
}

#[derive(Debug, Deserialize)]
struct BatchQuery {
    format: Option<String>,
}

#[derive(Debug, Serialize)]
struct BatchResponse {
    batch_id: Uuid,
    status: String,
    files_submitted: usize,
    files_read: usize,
    runs: Vec<RunSummary>,
}

#[derive(Debug, Serialize)]
struct UploadResponse {
    endpoint: String,
    uploaded: usize,
    failed: usize,
    outcomes: Vec<UploadOutcome>,
}

#[derive(Debug, Deserialize)]
struct ViewRunRequest {
    key: String,
}

async fn create_batch(
    State(state): State<AppState>,
    Query(query): Query<BatchQuery>,
    mut multipart: Multipart,
) -> Result<Json<BatchResponse>, AppError> {
    let format = query
        .format
        .as_deref()
        .map(str::parse::<FileFormat>)
        .transpose()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let mut files = Vec::new();
    while let Some(field) = multipart.next_field().await.map_err(|e| {
        AppError::BadRequest(format!("Failed to read multipart field: {}", e))
    })? {
        let Some(filename) = field.file_name().map(|s| s.to_string()) else {
            continue;
        };
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(format!("Failed to read file bytes: {}", e)))?;
        files.push(SourceFile::Bytes {
            name: filename,
            bytes: bytes.to_vec(),
        });
    }

    if files.is_empty() {
        return Err(AppError::BadRequest("No files provided".to_string()));
    }

    tracing::info!(
        "Reading {} files as {}",
        files.len(),
        format.map(|f| f.as_str()).unwrap_or("detected format")
    );

    let status = read_batch(
        files,
        format,
        |status| tracing::debug!("{}", status.status_line()),
        |status| tracing::info!("Batch complete: {} runs", status.run_count()),
    )
    .await;

    let batch_id = state.insert_batch(status.clone());
    Ok(Json(batch_response(&state, batch_id, &status)))
}

async fn get_batch(
    State(state): State<AppState>,
    Path(batch_id): Path<Uuid>,
) -> Result<Json<BatchResponse>, AppError> {
    let status = load_batch(&state, &batch_id)?;
    Ok(Json(batch_response(&state, batch_id, &status)))
}

async fn clear_batch(
    State(state): State<AppState>,
    Path(batch_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    if !state.remove_batch(&batch_id) {
        return Err(AppError::NotFound(batch_id.to_string()));
    }
    tracing::info!("Cleared batch {}", batch_id);
    Ok(StatusCode::NO_CONTENT)
}

async fn upload_batch(
    State(state): State<AppState>,
    Path(batch_id): Path<Uuid>,
    headers: HeaderMap,
) -> Result<Json<UploadResponse>, AppError> {
    let status = load_batch(&state, &batch_id)?;
    if status.activities.is_empty() {
        return Err(AppError::BadRequest("Batch contains no runs to upload".to_string()));
    }

    let csrf_token = headers
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())
        .and_then(csrf_token_from_cookie)
        .or_else(|| state.config().csrf_token.clone());
    if csrf_token.is_none() {
        tracing::warn!("Uploading batch {} without a CSRF token", batch_id);
    }

    let uploader = Uploader::new(
        state.http().clone(),
        state.config().activities_endpoint(),
        csrf_token,
    );
    let outcomes = uploader.upload_all(&status).await;
    let uploaded = outcomes.iter().filter(|o| o.ok).count();
    let failed = outcomes.len() - uploaded;

    tracing::info!(
        "Batch {}: uploaded {} runs, {} failed",
        batch_id,
        uploaded,
        failed
    );

    Ok(Json(UploadResponse {
        endpoint: uploader.endpoint().to_string(),
        uploaded,
        failed,
        outcomes,
    }))
}

async fn batch_load(
    State(state): State<AppState>,
    Path(batch_id): Path<Uuid>,
) -> Result<Json<Vec<DailyLoad>>, AppError> {
    let status = load_batch(&state, &batch_id)?;
    Ok(Json(summary::training_load(
        status.activities.values(),
        &state.config().heart_rate,
    )))
}

async fn view_run(
    State(state): State<AppState>,
    Path(batch_id): Path<Uuid>,
    Json(req): Json<ViewRunRequest>,
) -> Result<Json<ViewResponse>, AppError> {
    let status = load_batch(&state, &batch_id)?;
    let activity = status
        .activities
        .get(&req.key)
        .ok_or_else(|| AppError::NotFound(format!("run {} in batch {}", req.key, batch_id)))?;
    open_view(&state, build_route(activity)).map(Json)
}

fn load_batch(state: &AppState, batch_id: &Uuid) -> Result<ReadStatus, AppError> {
    state
        .batch(batch_id)
        .ok_or_else(|| AppError::NotFound(batch_id.to_string()))
}

fn batch_response(state: &AppState, batch_id: Uuid, status: &ReadStatus) -> BatchResponse {
    let zones = &state.config().heart_rate;
    BatchResponse {
        batch_id,
        status: status.status_line(),
        files_submitted: status.submitted,
        files_read: status.completed,
        runs: status
            .activities
            .values()
            .map(|activity| summary::summarize(activity, zones))
            .collect(),
    }
}

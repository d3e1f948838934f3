use axum::extract::{Path, State};
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::pipeline::fetch::fetch_route;
use crate::pipeline::render::{self, ProgressUpdate, View};
use crate::state::AppState;
use crate::types::route::RouteCollection;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/views", post(create_view))
        .route("/api/views/:view_id/hover", post(hover))
}

#[derive(Debug, Deserialize)]
struct CreateViewRequest {
    activity_url: String,
}

#[derive(Debug, Deserialize)]
struct HoverRequest {
    index: u64,
}

#[derive(Debug, Serialize)]
pub struct ViewResponse {
    pub view_id: Uuid,
    #[serde(flatten)]
    pub view: View,
}

async fn create_view(
    State(state): State<AppState>,
    Json(req): Json<CreateViewRequest>,
) -> Result<Json<ViewResponse>, AppError> {
    let route = fetch_route(state.http(), &state.config().backend_url, &req.activity_url).await?;
    open_view(&state, route).map(Json)
}

async fn hover(
    State(state): State<AppState>,
    Path(view_id): Path<Uuid>,
    Json(req): Json<HoverRequest>,
) -> Result<Json<ProgressUpdate>, AppError> {
    let update = state
        .with_view(&view_id, |route| render::hover(route, req.index))
        .ok_or_else(|| AppError::NotFound(view_id.to_string()))??;
    Ok(Json(update))
}

/// Renders a route and keeps it so hover events can move its progress marker.
pub fn open_view(state: &AppState, route: RouteCollection) -> Result<ViewResponse, AppError> {
    let view = render::build_view(&route)?;
    let view_id = state.insert_view(route);
    tracing::info!(
        "Opened view {} ({} segments, fields: {})",
        view_id,
        view.chart.datasets.first().map(|d| d.data.len()).unwrap_or(0),
        view.fields.join(", ")
    );
    Ok(ViewResponse { view_id, view })
}

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("Invalid TCX: {0}")]
    InvalidTcx(String),
    #[error("Invalid GPX: {0}")]
    InvalidGpx(String),
    #[error("Unsupported format: {0}. Use 'tcx' or 'gpx'")]
    UnsupportedFormat(String),
}

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("Request to {url} failed: {message}")]
    Transport { url: String, message: String },
    #[error("Backend rejected activity with status {status}: {body}")]
    Rejected { status: u16, body: String },
}

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("Invalid activity URL: {0}")]
    InvalidUrl(String),
    #[error("Request to {url} failed: {message}")]
    Transport { url: String, message: String },
    #[error("Activity endpoint returned status {0}")]
    Status(u16),
    #[error("Activity response is not a route description: {0}")]
    Decode(String),
}

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("Route has no line segments")]
    EmptyRoute,
    #[error("Route has no {0} marker")]
    MissingMarker(&'static str),
    #[error("No route segment with index {0}")]
    UnknownSegment(u64),
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Invalid request: {0}")]
    BadRequest(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Render(_) | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Fetch(FetchError::InvalidUrl(_)) => StatusCode::BAD_REQUEST,
            AppError::Fetch(_) => StatusCode::BAD_GATEWAY,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
        };

        if status.is_server_error() {
            tracing::error!("{}", self);
        }

        let body = Json(json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}

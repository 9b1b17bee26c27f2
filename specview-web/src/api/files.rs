//! Stored file retrieval
//!
//! Names from the URL pass the same policy as on the way in and are resolved
//! inside the storage root before anything touches the filesystem. Audio is
//! served with the MIME type of its format class rather than a guess from the
//! file extension.

use axum::{
    body::Body,
    extract::{Path, Request, State},
    http::{header, HeaderValue},
    response::Response,
    routing::get,
    Router,
};
use specview_common::StorageArea;
use tower::ServiceExt;
use tower_http::services::ServeFile;
use tracing::debug;

use crate::{ApiResult, AppState};

/// Build file routes
pub fn file_routes() -> Router<AppState> {
    Router::new()
        .route("/uploads/:filename", get(serve_upload))
        .route("/results/:artifact", get(serve_result))
}

/// GET /uploads/:filename
pub async fn serve_upload(
    State(state): State<AppState>,
    Path(filename): Path<String>,
    request: Request,
) -> ApiResult<Response> {
    serve_from(&state.storage.uploads, &filename, request).await
}

/// GET /results/:artifact
pub async fn serve_result(
    State(state): State<AppState>,
    Path(artifact): Path<String>,
    request: Request,
) -> ApiResult<Response> {
    serve_from(&state.storage.results, &artifact, request).await
}

async fn serve_from(area: &StorageArea, raw: &str, request: Request) -> ApiResult<Response> {
    let (name, path) = area.resolve_existing(raw).await?;
    debug!("Serving {} from {}", name, area.root().display());

    let mut response = match ServeFile::new(path).oneshot(request).await {
        Ok(response) => response,
        Err(never) => match never {},
    };
    if let Some(format) = name.audio_format() {
        if response.status().is_success() {
            response.headers_mut().insert(
                header::CONTENT_TYPE,
                HeaderValue::from_static(format.mime_type()),
            );
        }
    }
    Ok(response.map(Body::new))
}

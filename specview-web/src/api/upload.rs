//! Upload endpoint
//!
//! `POST /uploader` takes a multipart form with a `file` field, stores the
//! bytes under the sanitized name and redirects to the transform route.

use axum::{
    extract::{multipart::MultipartRejection, DefaultBodyLimit, Multipart, State},
    response::Redirect,
    routing::post,
    Router,
};
use tracing::{debug, info, warn};

use crate::{ApiError, ApiResult, AppState};

/// Multipart field carrying the audio file
pub const FILE_FIELD: &str = "file";

/// Build upload routes with the request body capped at `max_upload_bytes`
pub fn upload_routes(max_upload_bytes: usize) -> Router<AppState> {
    Router::new()
        .route("/uploader", post(upload_file).get(upload_without_file))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
}

/// POST /uploader
///
/// Checks, in order: a `file` field exists, its filename passes the upload
/// policy, its content is non-empty. Nothing is written unless all pass.
pub async fn upload_file(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<Redirect> {
    // Not a multipart request, so there is no file part
    let mut multipart = multipart.map_err(|rejection| {
        debug!("Upload without multipart body: {}", rejection);
        ApiError::MissingFileField
    })?;

    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(FILE_FIELD) {
            debug!("Ignoring multipart field {:?}", field.name());
            continue;
        }

        let raw_name = field.file_name().unwrap_or_default().to_string();
        let name = state.storage.uploads.validate(&raw_name)?;
        if raw_name != name.as_str() {
            debug!("Sanitized upload name {:?} -> {}", raw_name, name);
        }

        let bytes = field.bytes().await?;
        if bytes.is_empty() {
            return Err(ApiError::EmptyUpload);
        }

        let asset = state
            .storage
            .uploads
            .store_upload(&raw_name, name, &bytes)
            .await?;
        if asset.stored.replaced {
            warn!("Upload {} replaced an existing file", asset.name);
        }
        info!(
            "Uploaded {} ({}, {} bytes) to {}",
            asset.name,
            asset.format.mime_type(),
            asset.stored.size,
            asset.stored.path.display()
        );

        return Ok(Redirect::to(&format!("/audio_transform/{}", asset.name)));
    }

    Err(ApiError::MissingFileField)
}

/// GET /uploader
///
/// A plain GET carries no file.
pub async fn upload_without_file() -> ApiError {
    ApiError::MissingFileField
}

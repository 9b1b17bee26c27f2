//! Spectrogram endpoint

use axum::{
    extract::{Path, State},
    http::{header, HeaderName},
    response::IntoResponse,
    routing::get,
    Router,
};
use tracing::info;

use crate::transform::{self, SpectrogramArtifact};
use crate::{ApiResult, AppState};

/// Response header pointing at the persisted image
pub const ARTIFACT_HEADER: HeaderName = HeaderName::from_static("x-spectrogram-artifact");

/// Build transform routes
pub fn transform_routes() -> Router<AppState> {
    Router::new().route("/audio_transform/:filename", get(audio_transform))
}

/// Render, persist and return the spectrogram of an upload
pub async fn transform_upload(state: &AppState, filename: &str) -> ApiResult<SpectrogramArtifact> {
    let (name, path) = state.storage.uploads.resolve_existing(filename).await?;
    let config = state.config.spectrogram.clone();

    let artifact =
        tokio::task::spawn_blocking(move || transform::render_upload(&name, &path, &config))
            .await??;

    transform::persist(&state.storage.results, &artifact).await?;
    Ok(artifact)
}

/// GET /audio_transform/:filename
pub async fn audio_transform(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let artifact = transform_upload(&state, &filename).await?;
    info!(
        "Transformed {} ({:.2}s, {} bins x {} frames, {:+.1}..{:+.1} dB)",
        artifact.source,
        artifact.duration_secs,
        artifact.n_bins,
        artifact.n_frames,
        artifact.db_range.0,
        artifact.db_range.1
    );

    let headers = [
        (header::CONTENT_TYPE, "image/png".to_string()),
        (ARTIFACT_HEADER, artifact.url()),
    ];
    Ok((headers, artifact.png))
}

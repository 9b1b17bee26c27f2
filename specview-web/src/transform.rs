//! Upload-to-image pipeline
//!
//! decode → resample → STFT → dB → render. Everything here is CPU bound and
//! synchronous; handlers run it on the blocking pool and persist the result
//! through [`persist`].

use std::path::Path;

use specview_common::config::SpectrogramConfig;
use specview_common::storage::{StorageArea, StoredFile};
use specview_common::SanitizedFilename;
use tracing::{debug, info};

use crate::audio::{self, AudioError};
use crate::render::{self, RenderError, RenderOptions};
use crate::spectrum::{Spectrogram, SpectrumError};

#[derive(thiserror::Error, Debug)]
pub enum TransformError {
    #[error(transparent)]
    Audio(#[from] AudioError),

    #[error(transparent)]
    Spectrum(#[from] SpectrumError),

    #[error(transparent)]
    Render(#[from] RenderError),
}

/// A rendered spectrogram and the parameters that produced it
#[derive(Debug, Clone)]
pub struct SpectrogramArtifact {
    /// Upload the image was computed from
    pub source: String,
    /// File name inside the results area
    pub artifact_name: String,
    pub png: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub sample_rate: u32,
    pub n_fft: usize,
    pub hop_length: usize,
    pub n_frames: usize,
    pub n_bins: usize,
    pub duration_secs: f64,
    pub db_range: (f32, f32),
    pub annotated: bool,
}

impl SpectrogramArtifact {
    /// URL the persisted image is served from
    pub fn url(&self) -> String {
        format!("/results/{}", self.artifact_name)
    }
}

/// Decode a stored upload and compute its spectrogram
pub fn analyze(path: &Path, config: &SpectrogramConfig) -> Result<Spectrogram, TransformError> {
    let audio = audio::load(path, config.analysis_sample_rate, config.max_duration_secs)?;
    debug!(
        "Loaded {}: {:.2}s at {}Hz, {} channel(s)",
        path.display(),
        audio.duration_secs(),
        audio.sample_rate,
        audio.channels
    );
    Ok(Spectrogram::compute(
        &audio.samples,
        audio.sample_rate,
        config,
    )?)
}

/// Full pipeline for one upload, without touching the results area
pub fn render_upload(
    name: &SanitizedFilename,
    path: &Path,
    config: &SpectrogramConfig,
) -> Result<SpectrogramArtifact, TransformError> {
    let spectrogram = analyze(path, config)?;
    let rendered = render::render_png(&spectrogram, &RenderOptions::from(config))?;

    Ok(SpectrogramArtifact {
        source: name.to_string(),
        artifact_name: name.artifact_name(),
        png: rendered.png,
        width: rendered.width,
        height: rendered.height,
        sample_rate: spectrogram.sample_rate,
        n_fft: spectrogram.n_fft,
        hop_length: spectrogram.hop_length,
        n_frames: spectrogram.n_frames(),
        n_bins: spectrogram.n_bins(),
        duration_secs: spectrogram.duration_secs(),
        db_range: rendered.db_range,
        annotated: rendered.annotated,
    })
}

/// Write the artifact into the results area
pub async fn persist(
    results: &StorageArea,
    artifact: &SpectrogramArtifact,
) -> specview_common::Result<StoredFile> {
    let name = results.validate(&artifact.artifact_name)?;
    let stored = results.write(&name, &artifact.png).await?;
    info!(
        "Stored spectrogram {} ({} bytes, {}x{}, {} frames)",
        stored.path.display(),
        stored.size,
        artifact.width,
        artifact.height,
        artifact.n_frames
    );
    Ok(stored)
}

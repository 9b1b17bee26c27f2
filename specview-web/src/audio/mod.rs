//! Audio loading: decode stored bytes to mono samples at the analysis rate
//!
//! **Architecture:** symphonia decode → per-packet channel average → chunked rubato resample

pub mod decoder;
pub mod resampler;

pub use decoder::{AudioDecoder, DecodedAudio};
pub use resampler::Resampler;

use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Errors produced while turning a stored file into samples
#[derive(Error, Debug)]
pub enum AudioError {
    /// The file could not be opened
    #[error("Failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Container or codec not recognised, or the stream is corrupt
    #[error("Unsupported or corrupt audio: {0}")]
    Format(String),

    /// The container holds no decodable audio track
    #[error("No audio track found")]
    NoTrack,

    /// Decoding succeeded but produced no samples
    #[error("Audio stream contains no samples")]
    Empty,

    /// Longer than the configured analysis limit
    #[error("Audio is longer than the {limit_secs} s analysis limit")]
    TooLong { limit_secs: f64 },

    #[error("Resampling failed: {0}")]
    Resample(String),
}

impl AudioError {
    /// True when the underlying file does not exist
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Open { source, .. } if source.kind() == std::io::ErrorKind::NotFound)
    }
}

/// Decode `path` to mono and resample to `target_rate` (0 keeps the native rate)
///
/// Audio longer than `max_duration_secs` is refused with [`AudioError::TooLong`].
pub fn load(path: &Path, target_rate: u32, max_duration_secs: f64) -> Result<DecodedAudio, AudioError> {
    let decoded = AudioDecoder::decode_file(path, max_duration_secs)?;

    if target_rate == 0 || target_rate == decoded.sample_rate {
        return Ok(decoded);
    }

    let samples = Resampler::resample(&decoded.samples, decoded.sample_rate, target_rate)?;
    debug!(
        "Resampled {} from {}Hz to {}Hz ({} -> {} samples)",
        path.display(),
        decoded.sample_rate,
        target_rate,
        decoded.samples.len(),
        samples.len()
    );

    Ok(DecodedAudio {
        samples,
        sample_rate: target_rate,
        channels: decoded.channels,
    })
}

//! Audio resampling using rubato
//!
//! Brings decoded audio to the analysis sample rate so that spectrograms of
//! files recorded at different rates share the same frequency grid.

use rubato::{FastFixedIn, PolynomialDegree, Resampler as RubatoResampler};
use tracing::debug;

use super::AudioError;

/// Input frames fed to rubato per call
pub const CHUNK_FRAMES: usize = 4096;

/// Mono resampler backed by rubato
pub struct Resampler;

impl Resampler {
    /// Resample mono audio from `input_rate` to `output_rate`
    ///
    /// The signal is fed through one resampler in [`CHUNK_FRAMES`] chunks, so
    /// rubato's working buffers stay the same size for any clip length. The
    /// resampler's delay is trimmed from the front and the output is cut to
    /// `ceil(len * output_rate / input_rate)` samples.
    pub fn resample(input: &[f32], input_rate: u32, output_rate: u32) -> Result<Vec<f32>, AudioError> {
        if input_rate == output_rate {
            debug!("Sample rate already at {}Hz, skipping resample", output_rate);
            return Ok(input.to_vec());
        }
        if input_rate == 0 || output_rate == 0 {
            return Err(AudioError::Resample(format!(
                "invalid rates {}Hz -> {}Hz",
                input_rate, output_rate
            )));
        }
        if input.is_empty() {
            return Ok(Vec::new());
        }

        let ratio = output_rate as f64 / input_rate as f64;
        let expected_len = (input.len() as f64 * ratio).ceil() as usize;

        let mut resampler = FastFixedIn::<f32>::new(
            ratio,
            1.0, // no runtime ratio changes
            PolynomialDegree::Septic,
            CHUNK_FRAMES,
            1,
        )
        .map_err(|e| AudioError::Resample(format!("Failed to create resampler: {}", e)))?;

        let delay = resampler.output_delay();
        let mut output = Vec::with_capacity(expected_len + delay + CHUNK_FRAMES);

        let mut chunks = input.chunks_exact(CHUNK_FRAMES);
        for chunk in chunks.by_ref() {
            let frames = resampler
                .process(&[chunk], None)
                .map_err(|e| AudioError::Resample(e.to_string()))?;
            output.extend_from_slice(&frames[0]);
        }

        let remainder = chunks.remainder();
        if !remainder.is_empty() {
            let frames = resampler
                .process_partial(Some(&[remainder][..]), None)
                .map_err(|e| AudioError::Resample(e.to_string()))?;
            output.extend_from_slice(&frames[0]);
        }

        // Flush the samples still held back by the resampler's delay line
        while output.len() < expected_len + delay {
            let frames = resampler
                .process_partial(None::<&[Vec<f32>]>, None)
                .map_err(|e| AudioError::Resample(e.to_string()))?;
            if frames[0].is_empty() {
                break;
            }
            output.extend_from_slice(&frames[0]);
        }

        output.drain(..delay.min(output.len()));
        output.truncate(expected_len);

        Ok(output)
    }
}

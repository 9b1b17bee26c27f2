//! Audio decoder using symphonia
//!
//! Decodes WAV and MP3 (plus the other formats in symphonia's default set) to
//! mono f32 samples in [-1.0, 1.0]. Multi-channel audio is averaged into a
//! single channel.

use std::fs::File;
use std::path::Path;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::{debug, warn};

use super::AudioError;

/// Decoded mono audio
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedAudio {
    /// Mono samples
    pub samples: Vec<f32>,
    /// Rate of `samples`
    pub sample_rate: u32,
    /// Channel count of the source before downmixing
    pub channels: u16,
}

impl DecodedAudio {
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate as f64
    }
}

/// Whole-file decoder
pub struct AudioDecoder;

impl AudioDecoder {
    /// Decode an audio file from disk
    ///
    /// Each packet is downmixed as it is decoded, so only the mono signal is
    /// held in memory. Files longer than `max_duration_secs` fail with
    /// [`AudioError::TooLong`], from the container's frame count when it has
    /// one, otherwise as soon as decoding passes the limit.
    pub fn decode_file(path: &Path, max_duration_secs: f64) -> Result<DecodedAudio, AudioError> {
        debug!("Decoding entire file: {}", path.display());

        let file = File::open(path).map_err(|source| AudioError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        let mss = MediaSourceStream::new(Box::new(file), Default::default());

        // Hint from extension helps symphonia pick a reader
        let mut hint = Hint::new();
        if let Some(ext) = path.extension().and_then(|ext| ext.to_str()) {
            hint.with_extension(ext);
        }

        let detected = symphonia::default::get_probe()
            .format(
                &hint,
                mss,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .map_err(|e| AudioError::Format(format!("Failed to detect format: {}", e)))?;

        let mut format = detected.format;

        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or(AudioError::NoTrack)?;

        let track_id = track.id;
        let codec_params = track.codec_params.clone();

        if let (Some(frames), Some(rate)) = (codec_params.n_frames, codec_params.sample_rate) {
            check_duration(frames as usize, rate, max_duration_secs)?;
        }

        let mut decoder = symphonia::default::get_codecs()
            .make(&codec_params, &DecoderOptions::default())
            .map_err(|e| AudioError::Format(format!("Failed to create decoder: {}", e)))?;

        let mut sample_rate = codec_params.sample_rate;
        let mut channels = codec_params.channels.map(|c| c.count());
        let mut samples: Vec<f32> = Vec::new();
        let mut sample_buf: Option<SampleBuffer<f32>> = None;

        loop {
            let packet = match format.next_packet() {
                Ok(packet) => packet,
                Err(e) => {
                    stream_ended(e, samples.len(), path)?;
                    break;
                }
            };

            // Skip packets for other tracks
            if packet.track_id() != track_id {
                continue;
            }

            let decoded = match decoder.decode(&packet) {
                Ok(decoded) => decoded,
                Err(SymphoniaError::DecodeError(e)) => {
                    // Corrupt frame, keep going
                    warn!("Decode error in {}: {}", path.display(), e);
                    continue;
                }
                Err(e) => {
                    stream_ended(e, samples.len(), path)?;
                    break;
                }
            };

            let spec = *decoded.spec();
            let rate = *sample_rate.get_or_insert(spec.rate);
            let packet_channels = spec.channels.count();
            channels.get_or_insert(packet_channels);

            let needed = decoded.capacity() * packet_channels;
            if sample_buf.as_ref().map_or(true, |buf| buf.capacity() < needed) {
                sample_buf = Some(SampleBuffer::new(decoded.capacity() as u64, spec));
            }
            if let Some(buf) = sample_buf.as_mut() {
                buf.copy_interleaved_ref(decoded);
                downmix_into(&mut samples, buf.samples(), packet_channels);
            }

            check_duration(samples.len(), rate, max_duration_secs)?;
        }

        let sample_rate =
            sample_rate.ok_or_else(|| AudioError::Format("Sample rate not found".to_string()))?;
        let channels = channels.unwrap_or(1).max(1);

        if samples.is_empty() {
            return Err(AudioError::Empty);
        }

        debug!(
            "Decoded {} frames at {}Hz ({} channels)",
            samples.len(),
            sample_rate,
            channels
        );

        Ok(DecodedAudio {
            samples,
            sample_rate,
            channels: channels as u16,
        })
    }
}

/// Fails once `frames` at `sample_rate` runs past `max_duration_secs`
fn check_duration(frames: usize, sample_rate: u32, max_duration_secs: f64) -> Result<(), AudioError> {
    if sample_rate > 0 && frames as f64 > max_duration_secs * sample_rate as f64 {
        return Err(AudioError::TooLong {
            limit_secs: max_duration_secs,
        });
    }
    Ok(())
}

/// Decide how a read or decoder failure ends the stream
///
/// End of file is the normal exit. Any other failure before the first decoded
/// frame means the file is not usable audio. After that the stream is kept
/// up to the failure point.
fn stream_ended(err: SymphoniaError, frames_decoded: usize, path: &Path) -> Result<(), AudioError> {
    match err {
        SymphoniaError::IoError(ref e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
            debug!("Reached end of stream");
            Ok(())
        }
        e if frames_decoded == 0 => Err(AudioError::Format(format!(
            "Stream failed before any audio was decoded: {}",
            e
        ))),
        e => {
            warn!(
                "Stream of {} stopped after {} frames, keeping what was decoded: {}",
                path.display(),
                frames_decoded,
                e
            );
            Ok(())
        }
    }
}

/// Average interleaved channels into one, appending to `mono`
fn downmix_into(mono: &mut Vec<f32>, interleaved: &[f32], channels: usize) {
    if channels <= 1 {
        mono.extend_from_slice(interleaved);
        return;
    }
    mono.extend(
        interleaved
            .chunks_exact(channels)
            .map(|frame| frame.iter().sum::<f32>() / channels as f32),
    );
}

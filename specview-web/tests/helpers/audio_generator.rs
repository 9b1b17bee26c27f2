//! Audio Test Fixture Generator
//!
//! Sine-tone WAV files in memory or on disk

use std::io::Cursor;
use std::path::{Path, PathBuf};

/// Configuration for generated audio
#[derive(Debug, Clone)]
pub struct AudioConfig {
    pub duration_seconds: f64,
    pub sample_rate: u32,
    pub channels: u16,
    /// Tone frequency in Hz, 0 for silence
    pub frequency: f32,
    pub amplitude: f32,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            duration_seconds: 1.0,
            sample_rate: 22050,
            channels: 1,
            frequency: 440.0,
            amplitude: 0.3,
        }
    }
}

fn write_samples<W>(writer: &mut hound::WavWriter<W>, config: &AudioConfig) -> anyhow::Result<()>
where
    W: std::io::Write + std::io::Seek,
{
    let total_samples = (config.duration_seconds * config.sample_rate as f64) as usize;
    for i in 0..total_samples {
        let t = i as f32 / config.sample_rate as f32;
        let value = config.amplitude * (2.0 * std::f32::consts::PI * config.frequency * t).sin();
        let sample = (value * i16::MAX as f32) as i16;
        for _ in 0..config.channels {
            writer.write_sample(sample)?;
        }
    }
    Ok(())
}

fn spec(config: &AudioConfig) -> hound::WavSpec {
    hound::WavSpec {
        channels: config.channels,
        sample_rate: config.sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    }
}

/// 16-bit PCM WAV file contents
pub fn wav_bytes(config: &AudioConfig) -> Vec<u8> {
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer =
            hound::WavWriter::new(&mut cursor, spec(config)).expect("Failed to create WAV writer");
        write_samples(&mut writer, config).expect("Failed to write samples");
        writer.finalize().expect("Failed to finalize WAV");
    }
    cursor.into_inner()
}

/// Write a WAV file to `path`
pub fn generate_test_wav(path: &Path, config: &AudioConfig) -> anyhow::Result<PathBuf> {
    let mut writer = hound::WavWriter::create(path, spec(config))?;
    write_samples(&mut writer, config)?;
    writer.finalize()?;
    Ok(path.to_path_buf())
}

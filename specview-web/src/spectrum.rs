//! Short-time Fourier transform and decibel scaling
//!
//! Frames are centred: the signal is extended by `n_fft / 2` samples on both
//! sides by reflection about its first and last samples (numpy's `reflect`
//! mode, the edge sample is not repeated), each frame is multiplied by a periodic Hann window and transformed with
//! rustfft. Only the non-negative frequencies are kept, giving a matrix of
//! shape `(n_fft / 2 + 1, 1 + (len + 2 * (n_fft / 2) - n_fft) / hop_length)`.
//!
//! Magnitudes are converted to decibels in place relative to the matrix
//! maximum, so the loudest bin of every clip is exactly 0 dB.

use ndarray::Array2;
use rustfft::num_complex::Complex;
use rustfft::FftPlanner;
use thiserror::Error;
use tracing::debug;

use specview_common::config::SpectrogramConfig;

/// Smallest amplitude considered before taking the logarithm
pub const AMIN: f32 = 1e-5;

#[derive(Error, Debug, PartialEq)]
pub enum SpectrumError {
    #[error("Invalid parameter {name}: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    #[error("Signal is empty")]
    EmptySignal,
}

/// Periodic Hann window of length `n`
pub fn hann_window(n: usize) -> Vec<f32> {
    if n == 0 {
        return Vec::new();
    }
    if n == 1 {
        return vec![1.0];
    }
    let m = n as f32;
    (0..n)
        .map(|i| 0.5 - 0.5 * (2.0 * std::f32::consts::PI * i as f32 / m).cos())
        .collect()
}

/// Magnitude of the STFT, shape `(n_fft / 2 + 1, n_frames)`
pub fn stft_magnitude(
    samples: &[f32],
    n_fft: usize,
    hop_length: usize,
) -> Result<Array2<f32>, SpectrumError> {
    if n_fft == 0 {
        return Err(SpectrumError::InvalidParameter {
            name: "n_fft",
            reason: "must be > 0".to_string(),
        });
    }
    if hop_length == 0 {
        return Err(SpectrumError::InvalidParameter {
            name: "hop_length",
            reason: "must be > 0".to_string(),
        });
    }
    if samples.is_empty() {
        return Err(SpectrumError::EmptySignal);
    }

    let padded = reflect_pad(samples, n_fft / 2);

    let n_frames = if padded.len() < n_fft {
        0
    } else {
        (padded.len() - n_fft) / hop_length + 1
    };
    let n_freq = n_fft / 2 + 1;

    let window = hann_window(n_fft);
    let mut planner = FftPlanner::<f32>::new();
    let fft = planner.plan_fft_forward(n_fft);
    let mut buffer = vec![Complex::new(0.0f32, 0.0); n_fft];
    let mut scratch = vec![Complex::new(0.0f32, 0.0); fft.get_inplace_scratch_len()];

    let mut magnitude = Array2::<f32>::zeros((n_freq, n_frames));
    for frame in 0..n_frames {
        let start = frame * hop_length;
        for (i, slot) in buffer.iter_mut().enumerate() {
            let sample = padded.get(start + i).copied().unwrap_or(0.0);
            *slot = Complex::new(sample * window[i], 0.0);
        }
        fft.process_with_scratch(&mut buffer, &mut scratch);
        for (bin, value) in buffer.iter().take(n_freq).enumerate() {
            magnitude[(bin, frame)] = value.norm();
        }
    }

    debug!(
        "STFT: {} samples -> {} bins x {} frames (n_fft={}, hop={})",
        samples.len(),
        n_freq,
        n_frames,
        n_fft,
        hop_length
    );

    Ok(magnitude)
}

/// Extend `samples` by `pad` on both sides, mirrored about the end samples
///
/// `[1, 2, 3]` padded by 2 is `[3, 2, 1, 2, 3, 2, 1]`. Pads longer than the
/// signal keep reflecting back and forth; a single sample is repeated.
pub fn reflect_pad(samples: &[f32], pad: usize) -> Vec<f32> {
    let len = samples.len();
    if len == 0 {
        return Vec::new();
    }
    (0..len + 2 * pad)
        .map(|i| samples[reflect_index(i as isize - pad as isize, len)])
        .collect()
}

fn reflect_index(i: isize, len: usize) -> usize {
    if len == 1 {
        return 0;
    }
    let period = 2 * (len as isize - 1);
    let j = i.rem_euclid(period);
    if j >= len as isize {
        (period - j) as usize
    } else {
        j as usize
    }
}

/// Convert amplitudes to dB in place: `20 * log10(max(amin, S)) - 20 * log10(max(amin, reference))`
///
/// With `top_db`, values are clipped to `max_db - top_db`.
pub fn amplitude_to_db(
    mut amplitude: Array2<f32>,
    reference: f32,
    amin: f32,
    top_db: Option<f32>,
) -> Array2<f32> {
    let log_ref = 20.0 * reference.max(amin).log10();
    amplitude.mapv_inplace(|a| 20.0 * a.max(amin).log10() - log_ref);

    if let Some(top) = top_db {
        let max_db = amplitude.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        let floor = max_db - top;
        amplitude.mapv_inplace(|v| v.max(floor));
    }
    amplitude
}

/// Largest finite value of a matrix, 0 for an empty one
pub fn matrix_max(values: &Array2<f32>) -> f32 {
    values
        .iter()
        .copied()
        .filter(|v| v.is_finite())
        .fold(None, |acc: Option<f32>, v| Some(acc.map_or(v, |m| m.max(v))))
        .unwrap_or(0.0)
}

/// Power spectrogram in dB relative to its loudest bin
#[derive(Debug, Clone, PartialEq)]
pub struct Spectrogram {
    /// dB values, rows are frequency bins (0 Hz first), columns are frames
    pub db: Array2<f32>,
    pub sample_rate: u32,
    pub n_fft: usize,
    pub hop_length: usize,
}

impl Spectrogram {
    /// Compute the dB spectrogram of mono samples
    pub fn compute(
        samples: &[f32],
        sample_rate: u32,
        config: &SpectrogramConfig,
    ) -> Result<Self, SpectrumError> {
        if sample_rate == 0 {
            return Err(SpectrumError::InvalidParameter {
                name: "sample_rate",
                reason: "must be > 0".to_string(),
            });
        }
        let magnitude = stft_magnitude(samples, config.n_fft, config.hop_length)?;
        let reference = matrix_max(&magnitude);
        let db = amplitude_to_db(magnitude, reference, AMIN, config.top_db);

        Ok(Self {
            db,
            sample_rate,
            n_fft: config.n_fft,
            hop_length: config.hop_length,
        })
    }

    pub fn n_bins(&self) -> usize {
        self.db.nrows()
    }

    pub fn n_frames(&self) -> usize {
        self.db.ncols()
    }

    /// Centre frequency of `bin` in Hz
    pub fn bin_frequency(&self, bin: usize) -> f64 {
        bin as f64 * self.sample_rate as f64 / self.n_fft as f64
    }

    /// Nearest bin for a frequency, clamped to the matrix
    pub fn bin_for_frequency(&self, freq: f64) -> usize {
        let bin = (freq * self.n_fft as f64 / self.sample_rate as f64).round();
        (bin.max(0.0) as usize).min(self.n_bins().saturating_sub(1))
    }

    /// Nyquist frequency in Hz
    pub fn max_frequency(&self) -> f64 {
        self.sample_rate as f64 / 2.0
    }

    /// Start time of `frame` in seconds (frames are centred on `frame * hop`)
    pub fn frame_time(&self, frame: usize) -> f64 {
        (frame * self.hop_length) as f64 / self.sample_rate as f64
    }

    /// Time span covered by the frames
    pub fn duration_secs(&self) -> f64 {
        self.frame_time(self.n_frames())
    }

    /// (min, max) dB shown
    pub fn db_range(&self) -> (f32, f32) {
        let (min, max) = self
            .db
            .iter()
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| {
                (lo.min(v), hi.max(v))
            });
        if min.is_finite() && max.is_finite() {
            (min, max)
        } else {
            (0.0, 0.0)
        }
    }
}

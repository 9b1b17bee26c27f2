//! Configuration loading
//!
//! The service reads one optional TOML file. Every field has a compiled
//! default, so a partial file (or no file at all) yields a usable configuration.
//!
//! Config file resolution priority:
//! 1. Command-line argument (highest priority)
//! 2. `SPECVIEW_CONFIG` environment variable
//! 3. `./specview.toml` in the working directory
//! 4. `<user config dir>/specview/config.toml`
//! 5. Compiled defaults (fallback)
//!
//! A missing file is not fatal: a warning is logged and defaults are used.
//! A file that exists but cannot be read or parsed is a configuration error.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::filename::{AudioFormat, FilenamePolicy};
use crate::{Error, Result};

/// Environment variable naming the config file
pub const CONFIG_ENV_VAR: &str = "SPECVIEW_CONFIG";

/// Config file looked up in the working directory
pub const LOCAL_CONFIG_FILE: &str = "specview.toml";

/// Smallest image the renderer can lay out (plot area plus colour bar)
pub const MIN_IMAGE_WIDTH: u32 = 160;
pub const MIN_IMAGE_HEIGHT: u32 = 120;

/// Top-level service configuration
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServiceConfig {
    /// Interface to bind the HTTP server to
    pub bind_address: String,

    /// HTTP server port
    pub port: u16,

    /// Folder holding `uploads/` and `results/`
    pub static_root: PathBuf,

    /// Extensions accepted for upload (case-insensitive); each must be `wav` or `mp3`
    pub allowed_extensions: Vec<String>,

    /// Largest accepted request body for `/uploader`
    pub max_upload_bytes: usize,

    pub spectrogram: SpectrogramConfig,

    pub logging: LoggingConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1".to_string(),
            port: 5000,
            static_root: PathBuf::from("static"),
            allowed_extensions: vec!["wav".to_string(), "mp3".to_string()],
            max_upload_bytes: 64 * 1024 * 1024,
            spectrogram: SpectrogramConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Analysis and rendering parameters
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct SpectrogramConfig {
    /// Rate audio is resampled to before analysis; 0 keeps the file's native rate
    pub analysis_sample_rate: u32,

    /// FFT window length in samples
    pub n_fft: usize,

    /// Samples between successive frames
    pub hop_length: usize,

    /// Dynamic range shown below the loudest bin; `None` disables clipping
    pub top_db: Option<f32>,

    /// Longest stretch of audio analysed; longer files are refused while decoding
    pub max_duration_secs: f64,

    /// Rendered image width in pixels
    pub width: u32,

    /// Rendered image height in pixels
    pub height: u32,

    /// TrueType/OpenType font used for titles and axis labels
    ///
    /// When unset, a few well-known system font locations are tried. Without a
    /// font the image is rendered without text.
    pub label_font: Option<PathBuf>,
}

impl Default for SpectrogramConfig {
    fn default() -> Self {
        Self {
            analysis_sample_rate: 22050,
            n_fft: 2048,
            hop_length: 512,
            top_db: Some(80.0),
            max_duration_secs: 300.0,
            width: 1000,
            height: 600,
            label_font: None,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl ServiceConfig {
    /// Parse and validate TOML content
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a config file
    pub fn load_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
        Self::from_toml_str(&content)
    }

    /// Resolve the config file and load it, falling back to defaults when absent
    ///
    /// Returns the configuration and the file it came from, if any.
    pub fn load(cli_arg: Option<&Path>) -> Result<(Self, Option<PathBuf>)> {
        match resolve_config_path(cli_arg) {
            Some(path) if path.exists() => {
                let config = Self::load_file(&path)?;
                info!("Loaded configuration from {}", path.display());
                Ok((config, Some(path)))
            }
            Some(path) => {
                warn!(
                    "Config file {} not found, using compiled defaults",
                    path.display()
                );
                Ok((Self::default(), None))
            }
            None => {
                info!("No config file found, using compiled defaults");
                Ok((Self::default(), None))
            }
        }
    }

    /// Reject values the analysis or renderer cannot work with
    pub fn validate(&self) -> Result<()> {
        let policy = self.upload_policy();
        if policy.allowed_extensions().next().is_none() {
            return Err(Error::Config(
                "allowed_extensions must name at least one extension".to_string(),
            ));
        }
        if let Some(ext) = policy
            .allowed_extensions()
            .find(|ext| AudioFormat::from_extension(ext).is_none())
        {
            return Err(Error::Config(format!(
                "allowed_extensions entry '{}' is not a supported audio format (wav, mp3)",
                ext
            )));
        }
        if self.max_upload_bytes == 0 {
            return Err(Error::Config("max_upload_bytes must be > 0".to_string()));
        }

        let spec = &self.spectrogram;
        if spec.n_fft < 4 {
            return Err(Error::Config(format!(
                "spectrogram.n_fft must be >= 4 (got {})",
                spec.n_fft
            )));
        }
        if spec.hop_length == 0 {
            return Err(Error::Config(
                "spectrogram.hop_length must be > 0".to_string(),
            ));
        }
        if let Some(top_db) = spec.top_db {
            if !top_db.is_finite() || top_db < 0.0 {
                return Err(Error::Config(format!(
                    "spectrogram.top_db must be a non-negative number (got {})",
                    top_db
                )));
            }
        }
        if !spec.max_duration_secs.is_finite() || spec.max_duration_secs <= 0.0 {
            return Err(Error::Config(format!(
                "spectrogram.max_duration_secs must be > 0 (got {})",
                spec.max_duration_secs
            )));
        }
        if spec.width < MIN_IMAGE_WIDTH || spec.height < MIN_IMAGE_HEIGHT {
            return Err(Error::Config(format!(
                "spectrogram image must be at least {}x{} (got {}x{})",
                MIN_IMAGE_WIDTH, MIN_IMAGE_HEIGHT, spec.width, spec.height
            )));
        }
        Ok(())
    }

    /// Filename policy for the upload storage area
    pub fn upload_policy(&self) -> FilenamePolicy {
        FilenamePolicy::new(&self.allowed_extensions)
    }

    /// `host:port` string for binding
    pub fn listen_address(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }
}

/// Find the config file following the documented priority order
///
/// Explicit locations (CLI argument, environment variable) are returned even if
/// they do not exist so the caller can warn about them.
pub fn resolve_config_path(cli_arg: Option<&Path>) -> Option<PathBuf> {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    // Priority 3: Working directory
    let local = PathBuf::from(LOCAL_CONFIG_FILE);
    if local.exists() {
        return Some(local);
    }

    // Priority 4: User config directory
    dirs::config_dir()
        .map(|d| d.join("specview").join("config.toml"))
        .filter(|p| p.exists())
}
